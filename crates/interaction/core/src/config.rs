//! Interaction configuration and the coercions applied when values are assigned.
//!
//! Every config value passes through a `coerce_*` function before it reaches an
//! entity. Out-of-range values are clamped to the nearest valid value and
//! reported with a warning; they never fault a running world.
use std::collections::BTreeSet;

use crate::env::{Ray, Vec3};
use crate::state::{Channel, InteractableState, InteractorState, SurfaceId};

/// Project-wide defaults handed to [`InteractionWorld::new`](crate::InteractionWorld::new).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InteractionSettings {
    /// Channel assigned to configs created through the settings helpers.
    pub default_channel: Channel,
    pub interactable: InteractableConfig,
    pub interactor: InteractorConfig,
    /// Maximum nesting of dependency processing before it is cut off.
    pub dependency_depth_limit: usize,
}

impl InteractionSettings {
    pub const DEFAULT_DEPENDENCY_DEPTH_LIMIT: usize = 16;

    pub fn new() -> Self {
        Self {
            default_channel: Channel::Interaction,
            interactable: InteractableConfig::default(),
            interactor: InteractorConfig::default(),
            dependency_depth_limit: Self::DEFAULT_DEPENDENCY_DEPTH_LIMIT,
        }
    }

    /// Interactable template carrying the project default channel.
    pub fn interactable_template(&self) -> InteractableConfig {
        self.interactable
            .clone()
            .with_response_channel(self.default_channel)
    }

    /// Interactor template carrying the project default channel.
    pub fn interactor_template(&self) -> InteractorConfig {
        self.interactor
            .clone()
            .with_response_channel(self.default_channel)
    }
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an interactable can be reused after its cooldown.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LifecycleMode {
    #[default]
    OnlyOnce,
    Cycled,
}

/// Settings of the mash style.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MashSettings {
    /// Presses required before the interaction timer elapses.
    pub min_presses: u32,
    /// Longest allowed gap between two presses, in seconds.
    pub keystroke_threshold: f32,
}

impl MashSettings {
    pub const DEFAULT_MIN_PRESSES: u32 = 5;
    pub const DEFAULT_KEYSTROKE_THRESHOLD: f32 = 1.0;
    pub const MIN_PRESSES_FLOOR: u32 = 2;
    pub const KEYSTROKE_THRESHOLD_FLOOR: f32 = 0.01;

    pub fn new(min_presses: u32, keystroke_threshold: f32) -> Self {
        Self {
            min_presses: coerce_min_presses(min_presses),
            keystroke_threshold: coerce_keystroke_threshold(keystroke_threshold),
        }
    }
}

impl Default for MashSettings {
    fn default() -> Self {
        Self {
            min_presses: Self::DEFAULT_MIN_PRESSES,
            keystroke_threshold: Self::DEFAULT_KEYSTROKE_THRESHOLD,
        }
    }
}

/// How an interaction is performed once an interactable is selected.
///
/// Behavior hooks for each style live in the engine; this is the data half.
#[derive(Clone, Copy, Debug, Default, PartialEq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum InteractionStyle {
    /// Completes as soon as it starts.
    #[default]
    Press,
    /// Completes after the interaction period elapses without a stop.
    Hold,
    /// Requires repeated presses within the interaction period.
    Mash(MashSettings),
    /// Starts on its own when selected.
    Automatic,
    /// Like hold, but only while one of its surfaces is hovered.
    Hover,
}

impl InteractionStyle {
    pub const fn default_period(&self) -> f32 {
        match self {
            Self::Press | Self::Hover => INSTANT_PERIOD,
            Self::Hold | Self::Mash(_) | Self::Automatic => 3.0,
        }
    }

    /// Smallest timed period accepted by this style.
    pub const fn min_period(&self) -> f32 {
        match self {
            Self::Hold | Self::Mash(_) => 0.1,
            Self::Press | Self::Automatic | Self::Hover => MIN_INTERACTION_PERIOD,
        }
    }

    /// Whether a `-1` period completes on start for this style.
    pub const fn allows_instant(&self) -> bool {
        !matches!(self, Self::Mash(_) | Self::Automatic)
    }
}

/// Progress persistence after a stop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Persistence {
    pub can_persist: bool,
    /// Seconds a paused interaction keeps its progress.
    pub expiration_period: f32,
}

impl Persistence {
    pub const fn persistent(expiration_period: f32) -> Self {
        Self {
            can_persist: true,
            expiration_period,
        }
    }
}

/// How a selected interactable is highlighted.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HighlightSetup {
    /// Custom depth stencil value read by a post-process pass.
    PostProcess { stencil: u8 },
    /// Overlay material asset name.
    Overlay { material: String },
}

impl HighlightSetup {
    pub const DEFAULT_STENCIL: u8 = 133;
}

impl Default for HighlightSetup {
    fn default() -> Self {
        Self::PostProcess {
            stencil: Self::DEFAULT_STENCIL,
        }
    }
}

pub const INSTANT_PERIOD: f32 = -1.0;
pub const MIN_INTERACTION_PERIOD: f32 = 0.01;
pub const MIN_COOLDOWN_PERIOD: f32 = 0.1;
pub const MIN_EXPIRATION_PERIOD: f32 = 0.01;
pub const INFINITE_LIFECYCLE: i32 = -1;

/// Configuration of a single interactable.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InteractableConfig {
    pub name: String,
    pub style: InteractionStyle,
    pub default_state: InteractableState,
    pub weight: i32,
    pub lifecycle_mode: LifecycleMode,
    /// `-1` is infinite, otherwise at least 2 in cycled mode.
    pub lifecycle_count: i32,
    pub cooldown_period: f32,
    /// `-1` is instant, otherwise at least the style minimum.
    pub interaction_period: f32,
    pub persistence: Persistence,
    pub response_channel: Channel,
    pub highlight: Option<HighlightSetup>,
    pub surfaces: Vec<SurfaceId>,
    /// Interactor tags allowed to select this interactable. Empty allows all.
    pub compatible_tags: BTreeSet<String>,
    pub ignored_interactor_tags: BTreeSet<String>,
}

impl InteractableConfig {
    pub const DEFAULT_WEIGHT: i32 = 1;
    pub const DEFAULT_LIFECYCLE_COUNT: i32 = 2;
    pub const DEFAULT_COOLDOWN_PERIOD: f32 = 3.0;

    pub fn new(style: InteractionStyle) -> Self {
        Self {
            name: String::new(),
            style,
            default_state: InteractableState::Awake,
            weight: Self::DEFAULT_WEIGHT,
            lifecycle_mode: LifecycleMode::OnlyOnce,
            lifecycle_count: Self::DEFAULT_LIFECYCLE_COUNT,
            cooldown_period: Self::DEFAULT_COOLDOWN_PERIOD,
            interaction_period: style.default_period(),
            persistence: Persistence::default(),
            response_channel: Channel::default(),
            highlight: Some(HighlightSetup::default()),
            surfaces: Vec::new(),
            compatible_tags: BTreeSet::new(),
            ignored_interactor_tags: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_default_state(mut self, state: InteractableState) -> Self {
        self.default_state = coerce_interactable_default(state);
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = coerce_weight(weight);
        self
    }

    /// Switches to cycled mode with the given number of cycles.
    pub fn cycled(mut self, count: i32, cooldown_period: f32) -> Self {
        self.lifecycle_mode = LifecycleMode::Cycled;
        self.lifecycle_count = coerce_lifecycle_count(count);
        self.cooldown_period = coerce_cooldown_period(cooldown_period);
        self
    }

    pub fn with_interaction_period(mut self, period: f32) -> Self {
        self.interaction_period = coerce_interaction_period(&self.style, period);
        self
    }

    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_response_channel(mut self, channel: Channel) -> Self {
        self.response_channel = channel;
        self
    }

    pub fn with_highlight(mut self, highlight: Option<HighlightSetup>) -> Self {
        self.highlight = highlight;
        self
    }

    pub fn with_surfaces(mut self, surfaces: impl IntoIterator<Item = SurfaceId>) -> Self {
        self.surfaces = surfaces.into_iter().collect();
        self
    }

    pub fn with_compatible_tag(mut self, tag: impl Into<String>) -> Self {
        self.compatible_tags.insert(tag.into());
        self
    }

    pub fn with_ignored_interactor_tag(mut self, tag: impl Into<String>) -> Self {
        self.ignored_interactor_tags.insert(tag.into());
        self
    }

    /// Re-runs every coercion. Used for configs that bypassed the builders,
    /// such as deserialized ones.
    pub fn coerced(mut self) -> Self {
        self.default_state = coerce_interactable_default(self.default_state);
        self.weight = coerce_weight(self.weight);
        if self.lifecycle_mode == LifecycleMode::Cycled {
            self.lifecycle_count = coerce_lifecycle_count(self.lifecycle_count);
        }
        self.cooldown_period = coerce_cooldown_period(self.cooldown_period);
        self.interaction_period = coerce_interaction_period(&self.style, self.interaction_period);
        if let InteractionStyle::Mash(settings) = self.style {
            self.style = InteractionStyle::Mash(MashSettings::new(
                settings.min_presses,
                settings.keystroke_threshold,
            ));
        }
        self
    }

    /// Number of cycles an entity starts with.
    pub fn initial_remaining(&self) -> i32 {
        match self.lifecycle_mode {
            LifecycleMode::OnlyOnce => 1,
            LifecycleMode::Cycled => self.lifecycle_count,
        }
    }
}

impl Default for InteractableConfig {
    fn default() -> Self {
        Self::new(InteractionStyle::default())
    }
}

/// Line or swept-box trace.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TraceKind {
    /// Single line.
    #[default]
    Precise,
    /// Box sweep with `half_extent`.
    Loose,
}

/// Polling trace settings of a trace interactor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TraceSettings {
    pub kind: TraceKind,
    pub interval: f32,
    pub range: f32,
    pub half_extent: f32,
    /// Overrides the owner's eye viewpoint.
    pub custom_origin: Option<Ray>,
}

impl TraceSettings {
    pub const DEFAULT_INTERVAL: f32 = 0.1;
    pub const DEFAULT_RANGE: f32 = 250.0;
    pub const DEFAULT_HALF_EXTENT: f32 = 5.0;

    pub fn new(kind: TraceKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: f32) -> Self {
        self.interval = coerce_min("trace interval", interval, 0.01);
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = coerce_min("trace range", range, 1.0);
        self
    }

    pub fn with_half_extent(mut self, half_extent: f32) -> Self {
        self.half_extent = coerce_min("trace half extent", half_extent, 0.1);
        self
    }

    pub fn with_custom_origin(mut self, origin: Option<Ray>) -> Self {
        self.custom_origin = origin;
        self
    }

    pub fn coerced(self) -> Self {
        let origin = self.custom_origin;
        self.with_interval(self.interval)
            .with_range(self.range)
            .with_half_extent(self.half_extent)
            .with_custom_origin(origin)
    }
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            kind: TraceKind::Precise,
            interval: Self::DEFAULT_INTERVAL,
            range: Self::DEFAULT_RANGE,
            half_extent: Self::DEFAULT_HALF_EXTENT,
            custom_origin: None,
        }
    }
}

/// One collision surface of an overlap interactor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSurface {
    pub id: SurfaceId,
    /// Channels this surface ignores.
    pub ignored_channels: BTreeSet<Channel>,
}

impl SensorSurface {
    pub fn new(id: SurfaceId) -> Self {
        Self {
            id,
            ignored_channels: BTreeSet::new(),
        }
    }

    pub fn responds_to(&self, channel: Channel) -> bool {
        !self.ignored_channels.contains(&channel)
    }
}

/// How an interactor discovers candidates.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Detection {
    /// Persistent contact reported by the host through begin/end overlap.
    Overlap { surfaces: Vec<SensorSurface> },
    /// Self-rescheduling polling query.
    Trace(TraceSettings),
}

impl Default for Detection {
    fn default() -> Self {
        Self::Overlap {
            surfaces: Vec::new(),
        }
    }
}

/// Origin of the line-of-sight check run before a candidate is accepted.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyTraceMode {
    /// No check; every candidate passes.
    #[default]
    None,
    /// Fixed world location.
    Location(Vec3),
    /// Named socket on the owning actor. Falls back to the actor location.
    Socket(String),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SafetyTrace {
    pub mode: SafetyTraceMode,
    pub validation_channel: Channel,
}

impl Default for SafetyTrace {
    fn default() -> Self {
        Self {
            mode: SafetyTraceMode::None,
            validation_channel: Channel::Camera,
        }
    }
}

/// Configuration of a single interactor.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InteractorConfig {
    pub name: String,
    pub default_state: InteractorState,
    pub response_channel: Channel,
    /// Matched against interactable compatible and ignored tags.
    pub tag: Option<String>,
    pub safety_trace: SafetyTrace,
    pub detection: Detection,
}

impl InteractorConfig {
    pub fn overlap(surfaces: impl IntoIterator<Item = SensorSurface>) -> Self {
        Self {
            detection: Detection::Overlap {
                surfaces: surfaces.into_iter().collect(),
            },
            ..Self::default()
        }
    }

    pub fn trace(settings: TraceSettings) -> Self {
        Self {
            detection: Detection::Trace(settings.coerced()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_default_state(mut self, state: InteractorState) -> Self {
        self.default_state = coerce_interactor_default(state);
        self
    }

    pub fn with_response_channel(mut self, channel: Channel) -> Self {
        self.response_channel = channel;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_safety_trace(mut self, safety_trace: SafetyTrace) -> Self {
        self.safety_trace = safety_trace;
        self
    }

    pub fn coerced(mut self) -> Self {
        self.default_state = coerce_interactor_default(self.default_state);
        if let Detection::Trace(settings) = self.detection {
            self.detection = Detection::Trace(settings.coerced());
        }
        self
    }
}

// ===== coercions =====

pub fn coerce_interactable_default(state: InteractableState) -> InteractableState {
    if state.is_valid_default() {
        return state;
    }
    let coerced = match state {
        InteractableState::Completed => InteractableState::Disabled,
        _ => InteractableState::Awake,
    };
    tracing::warn!(
        requested = %state,
        coerced = %coerced,
        "interactable default state not allowed"
    );
    coerced
}

pub fn coerce_interactor_default(state: InteractorState) -> InteractorState {
    if state.is_valid_default() {
        return state;
    }
    tracing::warn!(requested = %state, "interactor default state not allowed, using awake");
    InteractorState::Awake
}

pub fn coerce_weight(weight: i32) -> i32 {
    if weight < 0 {
        tracing::warn!(weight, "negative weight clamped to 0");
        return 0;
    }
    weight
}

/// Cycled lifecycle count: `-1` or at least 2.
pub fn coerce_lifecycle_count(count: i32) -> i32 {
    let coerced = match count {
        c if c < INFINITE_LIFECYCLE => INFINITE_LIFECYCLE,
        INFINITE_LIFECYCLE => INFINITE_LIFECYCLE,
        c if c < 2 => 2,
        c => c,
    };
    if coerced != count {
        tracing::warn!(requested = count, coerced, "lifecycle count coerced");
    }
    coerced
}

pub fn coerce_cooldown_period(period: f32) -> f32 {
    coerce_min("cooldown period", period, MIN_COOLDOWN_PERIOD)
}

/// General period coercion followed by the style minimum.
pub fn coerce_interaction_period(style: &InteractionStyle, period: f32) -> f32 {
    let general = if period <= INSTANT_PERIOD {
        INSTANT_PERIOD
    } else if period < MIN_INTERACTION_PERIOD {
        MIN_INTERACTION_PERIOD
    } else {
        period
    };

    let coerced = if general == INSTANT_PERIOD && style.allows_instant() {
        INSTANT_PERIOD
    } else {
        general.max(style.min_period())
    };

    if coerced != period {
        tracing::warn!(
            style = %style,
            requested = period,
            coerced,
            "interaction period coerced"
        );
    }
    coerced
}

pub fn coerce_min_presses(presses: u32) -> u32 {
    if presses < MashSettings::MIN_PRESSES_FLOOR {
        tracing::warn!(presses, "mash presses raised to the minimum");
        return MashSettings::MIN_PRESSES_FLOOR;
    }
    presses
}

pub fn coerce_keystroke_threshold(threshold: f32) -> f32 {
    coerce_min(
        "keystroke threshold",
        threshold,
        MashSettings::KEYSTROKE_THRESHOLD_FLOOR,
    )
}

fn coerce_min(what: &'static str, value: f32, min: f32) -> f32 {
    if value < min || value.is_nan() {
        tracing::warn!(what, value, min, "value raised to the minimum");
        return min;
    }
    value
}
