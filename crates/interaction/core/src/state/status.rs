//! Lifecycle states and their transition tables.
//!
//! Both machines hold exactly one state at a time. A requested change is
//! accepted only when the `(from, to)` edge is listed in the table below;
//! every other request, including a self-transition, is a silent no-op.
//!
//! States without a direct edge are reached through [`InteractableState::route_to`]
//! and [`InteractorState::route_to`]. Every hop is a full transition with its
//! own `StateChanged` and arrival effects. In particular an interactable
//! returning from Active to Awake goes through Asleep: it is shut down (timers
//! canceled, interactor released, surfaces unbound) and then rebinds every
//! surface on reaching Awake.

/// Shortest chain of accepted transitions from `from` to `to`.
///
/// Intermediate hops are limited to `via`, tried in order. Cooldown, Completed
/// and Paused are never hops, but the hops that are used still apply their
/// arrival effects. The returned chain excludes `from` and ends with `to`; it
/// is empty when the two are equal.
fn route<S: Copy + Eq>(from: S, to: S, via: &[S], permits: fn(S, S) -> bool) -> Option<Vec<S>> {
    if from == to {
        return Some(Vec::new());
    }
    if permits(from, to) {
        return Some(vec![to]);
    }
    for &a in via {
        if a != from && permits(from, a) && permits(a, to) {
            return Some(vec![a, to]);
        }
    }
    for &a in via {
        if a == from || !permits(from, a) {
            continue;
        }
        for &b in via {
            if b != a && b != from && permits(a, b) && permits(b, to) {
                return Some(vec![a, b, to]);
            }
        }
    }
    None
}

/// Lifecycle state of an interactable.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InteractableState {
    /// Passively waiting to be discovered.
    #[default]
    Awake,
    /// Selected by an interactor, or interacting.
    Active,
    /// Interaction stopped with progress kept.
    Paused,
    /// Between two cycles of a cycled lifecycle.
    Cooldown,
    /// Terminal.
    Completed,
    Disabled,
    /// Held down by a dependency master.
    Suppressed,
    /// Dormant and ignored by arbitration.
    Asleep,
}

impl InteractableState {
    pub const ALL: [Self; 8] = [
        Self::Awake,
        Self::Active,
        Self::Paused,
        Self::Cooldown,
        Self::Completed,
        Self::Disabled,
        Self::Suppressed,
        Self::Asleep,
    ];

    /// Returns true if the transition table lists the edge `self -> to`.
    pub const fn permits(self, to: Self) -> bool {
        use InteractableState::*;

        match self {
            Awake => matches!(to, Active | Asleep | Cooldown | Disabled | Suppressed),
            Active => matches!(
                to,
                Asleep | Cooldown | Completed | Disabled | Suppressed | Paused
            ),
            Asleep => matches!(to, Awake | Disabled | Suppressed),
            Cooldown => matches!(to, Awake | Disabled | Suppressed),
            Completed => false,
            Disabled => matches!(to, Awake | Suppressed),
            Suppressed => matches!(to, Awake | Asleep | Cooldown | Disabled),
            Paused => matches!(to, Active),
        }
    }

    /// States an interactor may interact in, provided one is bound.
    pub const fn allows_interaction(self) -> bool {
        matches!(self, Self::Awake | Self::Active | Self::Paused)
    }

    /// States that must never own a running interaction timer.
    pub const fn forbids_interaction_timer(self) -> bool {
        matches!(
            self,
            Self::Suppressed | Self::Cooldown | Self::Completed | Self::Disabled
        )
    }

    /// Valid values for a configured default state.
    pub const fn is_valid_default(self) -> bool {
        matches!(
            self,
            Self::Awake | Self::Asleep | Self::Disabled | Self::Suppressed
        )
    }

    /// Chain of accepted transitions reaching `to`.
    pub fn route_to(self, to: Self) -> Option<Vec<Self>> {
        const VIA: [InteractableState; 4] = [
            InteractableState::Asleep,
            InteractableState::Active,
            InteractableState::Awake,
            InteractableState::Disabled,
        ];
        route(self, to, &VIA, Self::permits)
    }
}

/// Lifecycle state of an interactor.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InteractorState {
    #[default]
    Awake,
    Asleep,
    Suppressed,
    Active,
    Disabled,
}

impl InteractorState {
    pub const ALL: [Self; 5] = [
        Self::Awake,
        Self::Asleep,
        Self::Suppressed,
        Self::Active,
        Self::Disabled,
    ];

    /// Returns true if the transition table lists the edge `self -> to`.
    pub const fn permits(self, to: Self) -> bool {
        use InteractorState::*;

        match self {
            Awake => matches!(to, Asleep | Suppressed | Active | Disabled),
            Asleep => matches!(to, Awake | Disabled),
            Suppressed => matches!(to, Awake | Asleep | Active),
            Active => matches!(to, Awake | Asleep | Suppressed | Disabled),
            Disabled => matches!(to, Awake),
        }
    }

    /// States in which the interactor may start or stop interactions.
    pub const fn can_interact(self) -> bool {
        matches!(self, Self::Awake | Self::Active)
    }

    /// States in which candidates are evaluated at all.
    pub const fn can_evaluate(self) -> bool {
        !matches!(self, Self::Disabled | Self::Suppressed)
    }

    /// States in which the interactor counts as a valid sensor.
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Awake | Self::Asleep | Self::Active)
    }

    pub const fn is_valid_default(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Chain of accepted transitions reaching `to`.
    pub fn route_to(self, to: Self) -> Option<Vec<Self>> {
        const VIA: [InteractorState; 1] = [InteractorState::Awake];
        route(self, to, &VIA, Self::permits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_is_terminal() {
        for to in InteractableState::ALL {
            assert!(!InteractableState::Completed.permits(to));
        }
    }

    #[test]
    fn self_transitions_are_never_permitted() {
        for state in InteractableState::ALL {
            assert!(!state.permits(state), "{state} -> {state}");
        }
        for state in InteractorState::ALL {
            assert!(!state.permits(state), "{state} -> {state}");
        }
    }

    #[test]
    fn paused_only_resumes() {
        let targets: Vec<_> = InteractableState::ALL
            .into_iter()
            .filter(|to| InteractableState::Paused.permits(*to))
            .collect();
        assert_eq!(targets, vec![InteractableState::Active]);
    }

    #[test]
    fn routes_use_legal_hops() {
        use InteractableState::*;

        assert_eq!(Active.route_to(Awake), Some(vec![Asleep, Awake]));
        assert_eq!(Paused.route_to(Awake), Some(vec![Active, Asleep, Awake]));
        assert_eq!(Disabled.route_to(Asleep), Some(vec![Awake, Asleep]));
        assert_eq!(Suppressed.route_to(Awake), Some(vec![Awake]));
        assert_eq!(Completed.route_to(Awake), None);
        assert_eq!(
            InteractorState::Suppressed.route_to(InteractorState::Disabled),
            Some(vec![InteractorState::Awake, InteractorState::Disabled])
        );
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "COOLDOWN".parse::<InteractableState>().ok(),
            Some(InteractableState::Cooldown)
        );
        assert_eq!(InteractorState::Suppressed.as_ref(), "suppressed");
    }
}
