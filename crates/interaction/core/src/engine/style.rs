//! Per-style interaction hooks.
//!
//! The interactable machine owns states and bindings. Styles only decide how an
//! attempt progresses once it has started: instantly, on a timer, or by counting
//! key presses.

use crate::config::{InteractionStyle, MashSettings};
use crate::env::{TimerKind, TimerOwner};
use crate::event::InteractableEvent;
use crate::state::{InteractableId, InteractableState, InteractorId};

use super::InteractionWorld;

/// One hook invocation on one interactable.
pub(crate) struct StyleContext<'w> {
    pub(crate) world: &'w mut InteractionWorld,
    pub(crate) id: InteractableId,
    pub(crate) interactor: InteractorId,
    pub(crate) time: f32,
}

impl<'w> StyleContext<'w> {
    pub(crate) fn new(
        world: &'w mut InteractionWorld,
        id: InteractableId,
        interactor: InteractorId,
    ) -> Self {
        let time = world.now();
        Self {
            world,
            id,
            interactor,
            time,
        }
    }

    pub(crate) fn at(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    fn period(&self) -> f32 {
        self.world
            .interactable(self.id)
            .map_or(0.0, |entity| entity.config.interaction_period)
    }

    fn timer_active(&self, kind: TimerKind) -> bool {
        self.world
            .interactable(self.id)
            .is_some_and(|entity| entity.timers.is_active(self.world.timers(), kind))
    }

    /// Completes synchronously for instant periods, otherwise runs the timer.
    fn complete_or_progress(&mut self) {
        if self.world.is_instant(self.id) {
            self.world.finish_interaction(self.id, self.time);
        } else {
            let period = self.period();
            self.world.start_progress(self.id, period);
        }
    }

    fn mash_press(&mut self, settings: MashSettings) {
        let Some(entity) = self.world.interactables.get_mut(&self.id) else {
            return;
        };
        entity.mash_presses += 1;
        let presses = entity.mash_presses;
        entity.timers.start(
            self.world.timers.as_mut(),
            TimerOwner::Interactable(self.id),
            TimerKind::Keystroke,
            settings.keystroke_threshold,
        );
        self.world
            .emit_interactable(self.id, InteractableEvent::KeyMashed { presses });
    }

    /// Ends a mash attempt without completing it.
    pub(crate) fn fail(&mut self) {
        let id = self.id;
        let world = &mut *self.world;
        world.cancel_timer(id, TimerKind::Interaction);
        world.cancel_timer(id, TimerKind::Keystroke);
        if let Some(entity) = world.interactables.get_mut(&id) {
            entity.mash_presses = 0;
        }
        world.hide_progress(id);
        tracing::debug!(%id, "interaction failed");
        world.emit_interactable(id, InteractableEvent::InteractionFailed);

        if world.interactable(id).map(|entity| entity.state()) == Some(InteractableState::Paused) {
            world.transition_interactable(id, InteractableState::Active);
        }
    }
}

impl InteractionStyle {
    /// The interactable just became the interactor's active selection.
    pub(crate) fn on_selected(self, ctx: &mut StyleContext<'_>) {
        if let Self::Automatic = self {
            if ctx.timer_active(TimerKind::Interaction) {
                return;
            }
            ctx.world.emit_interactable(
                ctx.id,
                InteractableEvent::InteractionStarted {
                    time: ctx.time,
                    interactor: ctx.interactor,
                },
            );
            let period = ctx.period();
            ctx.world.start_progress(ctx.id, period);
        }
    }

    pub(crate) fn on_interaction_started(self, ctx: &mut StyleContext<'_>) {
        match self {
            Self::Press | Self::Hold | Self::Hover => ctx.complete_or_progress(),
            Self::Automatic => {
                if !ctx.timer_active(TimerKind::Interaction) {
                    let period = ctx.period();
                    ctx.world.start_progress(ctx.id, period);
                }
            }
            Self::Mash(settings) => {
                if !ctx.timer_active(TimerKind::Interaction) {
                    let period = ctx.period();
                    ctx.world.start_progress(ctx.id, period);
                }
                ctx.mash_press(settings);
            }
        }
    }

    pub(crate) fn on_timer_elapsed(self, ctx: &mut StyleContext<'_>) {
        let Self::Mash(settings) = self else {
            ctx.world.finish_interaction(ctx.id, ctx.time);
            return;
        };

        ctx.world.cancel_timer(ctx.id, TimerKind::Keystroke);
        let presses = ctx
            .world
            .interactables
            .get_mut(&ctx.id)
            .map_or(0, |entity| std::mem::take(&mut entity.mash_presses));
        if presses >= settings.min_presses {
            ctx.world.finish_interaction(ctx.id, ctx.time);
        } else {
            tracing::debug!(id = %ctx.id, presses, required = settings.min_presses, "not enough presses");
            ctx.fail();
        }
    }

    /// Whether a stop request may end the attempt.
    pub(crate) fn on_stop_requested(self, ctx: &mut StyleContext<'_>) -> bool {
        match self {
            Self::Automatic => false,
            Self::Mash(_) => !ctx.timer_active(TimerKind::Keystroke),
            Self::Press | Self::Hold | Self::Hover => true,
        }
    }
}
