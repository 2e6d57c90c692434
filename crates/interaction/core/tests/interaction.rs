mod common;

use common::*;
use interaction_core::{
    InteractableEvent, InteractableState, InteractionStyle, InteractorState, MashSettings,
    Persistence, Present, SurfaceId,
};

#[test]
fn press_completes_synchronously() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = selected(interactable(InteractionStyle::Press, "door", 10), &space);

    assert!(world.start_interaction(hand, 0.0).unwrap());

    let entity = world.interactable(door).unwrap();
    assert_eq!(entity.state(), InteractableState::Completed);
    assert_eq!(entity.interactor(), None);
    assert_eq!(entity.surfaces().count(), 0);

    let interactor = world.interactor(hand).unwrap();
    assert_eq!(interactor.active_interactable(), None);
    assert_eq!(interactor.state(), InteractorState::Awake);

    let events = interactable_events(&world.drain_events(), door);
    assert_eq!(
        events.last(),
        Some(&InteractableEvent::InteractionCompleted {
            time: 0.0,
            interactor: Some(hand),
        })
    );
}

#[test]
fn hold_completes_when_the_timer_elapses() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = selected(interactable(InteractionStyle::Hold, "lever", 10), &space);

    world.start_interaction(hand, 0.0).unwrap();
    world.advance(1.0, &space);

    let progress = world.interaction_progress(door).unwrap();
    assert!((progress - 1.0 / 3.0).abs() < 1e-4);
    assert!(world.drain_presentation().iter().any(|command| {
        matches!(command.command, Present::ShowProgress(fraction) if fraction > 0.3 && fraction < 0.34)
    }));

    world.advance(2.5, &space);

    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Completed);
    let events = interactable_events(&world.drain_events(), door);
    assert!(events.contains(&InteractableEvent::InteractionCompleted {
        time: 3.0,
        interactor: Some(hand),
    }));
}

#[test]
fn releasing_a_hold_cancels_progress() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = selected(interactable(InteractionStyle::Hold, "lever", 10), &space);

    world.start_interaction(hand, 0.0).unwrap();
    world.advance(1.0, &space);
    assert!(world.stop_interaction(hand, 1.0).unwrap());

    assert_eq!(world.interaction_progress(door), None);
    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Active);
    assert_eq!(world.interactor(hand).unwrap().state(), InteractorState::Awake);
    assert!(
        interactable_events(&world.drain_events(), door)
            .contains(&InteractableEvent::InteractionCanceled)
    );

    world.advance(5.0, &space);
    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Active);
}

#[test]
fn persisted_progress_resumes() {
    let space = ScriptedSpace::default();
    let config = interactable(InteractionStyle::Hold, "valve", 10)
        .with_persistence(Persistence::persistent(2.0));
    let (mut world, door, hand) = selected(config, &space);

    world.start_interaction(hand, 0.0).unwrap();
    world.advance(1.0, &space);
    world.stop_interaction(hand, 1.0).unwrap();
    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Paused);

    world.advance(0.5, &space);
    world.start_interaction(hand, 1.5).unwrap();
    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Active);

    world.advance(1.0, &space);
    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Active);

    world.advance(1.0, &space);
    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Completed);
}

#[test]
fn persisted_progress_expires() {
    let space = ScriptedSpace::default();
    let config = interactable(InteractionStyle::Hold, "valve", 10)
        .with_persistence(Persistence::persistent(2.0));
    let (mut world, door, hand) = selected(config, &space);

    world.start_interaction(hand, 0.0).unwrap();
    world.advance(1.0, &space);
    world.stop_interaction(hand, 1.0).unwrap();
    world.take_outbox();

    world.advance(2.5, &space);

    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Active);
    assert_eq!(world.interaction_progress(door), None);
    assert!(
        interactable_events(&world.drain_events(), door)
            .contains(&InteractableEvent::InteractionCanceled)
    );
}

#[test]
fn cycles_until_the_lifecycle_is_spent() {
    let space = ScriptedSpace::default();
    let config = interactable(InteractionStyle::Press, "button", 10).cycled(2, 1.0);
    let (mut world, button, hand) = selected(config, &space);

    world.start_interaction(hand, 0.0).unwrap();
    let entity = world.interactable(button).unwrap();
    assert_eq!(entity.state(), InteractableState::Cooldown);
    assert_eq!(entity.remaining_lifecycle(), 1);
    assert!(
        interactable_events(&world.drain_events(), button).contains(
            &InteractableEvent::CycleCompleted {
                time: 0.0,
                remaining: 1,
            }
        )
    );

    // Not interactable while cooling down
    world.start_interaction(hand, 0.5).unwrap();
    assert_eq!(world.interactable(button).unwrap().state(), InteractableState::Cooldown);

    world.advance(1.0, &space);
    assert_eq!(world.interactable(button).unwrap().state(), InteractableState::Awake);
    assert!(
        interactable_events(&world.drain_events(), button)
            .contains(&InteractableEvent::CooldownCompleted)
    );

    world.start_interaction(hand, 1.0).unwrap();
    let entity = world.interactable(button).unwrap();
    assert_eq!(entity.state(), InteractableState::Completed);
    assert_eq!(entity.remaining_lifecycle(), 0);
}

#[test]
fn mash_completes_with_enough_presses() {
    let space = ScriptedSpace::default();
    let config = interactable(InteractionStyle::Mash(MashSettings::new(3, 0.5)), "crate", 10);
    let (mut world, target, hand) = selected(config, &space);

    world.start_interaction(hand, 0.0).unwrap();
    for _ in 0..12 {
        world.advance(0.25, &space);
        let now = world.now();
        world.start_interaction(hand, now).unwrap();
    }

    assert_eq!(world.interactable(target).unwrap().state(), InteractableState::Completed);
    let events = interactable_events(&world.drain_events(), target);
    assert!(events.contains(&InteractableEvent::KeyMashed { presses: 12 }));
    assert!(events.contains(&InteractableEvent::InteractionCompleted {
        time: 3.0,
        interactor: Some(hand),
    }));
}

#[test]
fn mash_fails_when_presses_stall() {
    let space = ScriptedSpace::default();
    let config = interactable(InteractionStyle::Mash(MashSettings::new(3, 0.5)), "crate", 10);
    let (mut world, target, hand) = selected(config, &space);

    world.start_interaction(hand, 0.0).unwrap();
    // Release is ignored while the keystroke window is open
    assert!(!world.stop_interaction(hand, 0.0).unwrap());
    world.advance(1.0, &space);

    let entity = world.interactable(target).unwrap();
    assert_eq!(entity.state(), InteractableState::Active);
    assert_eq!(entity.mash_presses(), 0);
    assert_eq!(world.interaction_progress(target), None);
    assert!(
        interactable_events(&world.drain_events(), target)
            .contains(&InteractableEvent::InteractionFailed)
    );
}

#[test]
fn mash_fails_without_enough_presses() {
    let space = ScriptedSpace::default();
    let config = interactable(InteractionStyle::Mash(MashSettings::new(20, 0.5)), "crate", 10);
    let (mut world, target, hand) = selected(config, &space);

    world.start_interaction(hand, 0.0).unwrap();
    for _ in 0..12 {
        world.advance(0.25, &space);
        let now = world.now();
        world.start_interaction(hand, now).unwrap();
    }

    assert_eq!(world.interactable(target).unwrap().state(), InteractableState::Active);
    assert!(
        interactable_events(&world.drain_events(), target)
            .contains(&InteractableEvent::InteractionFailed)
    );
}

#[test]
fn automatic_starts_on_selection_and_ignores_stop() {
    let space = ScriptedSpace::default();
    let (mut world, target, hand) = selected(interactable(InteractionStyle::Automatic, "pad", 10), &space);

    assert!(world.interaction_progress(target).is_some());
    world.stop_interaction(hand, 0.5).unwrap();
    assert!(world.interaction_progress(target).is_some());

    world.advance(3.0, &space);
    assert_eq!(world.interactable(target).unwrap().state(), InteractableState::Completed);
}

#[test]
fn hover_requires_a_hovered_surface() {
    let space = ScriptedSpace::default();
    let (mut world, target, hand) = selected(interactable(InteractionStyle::Hover, "panel", 10), &space);

    assert!(!world.start_interaction(hand, 0.0).unwrap());
    assert_eq!(world.interactable(target).unwrap().state(), InteractableState::Active);

    world
        .set_hovered(target, SurfaceId(10), true)
        .unwrap();
    assert!(world.start_interaction(hand, 0.0).unwrap());
    assert_eq!(world.interactable(target).unwrap().state(), InteractableState::Completed);
}

#[test]
fn interactor_loss_cancels_the_attempt() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = selected(interactable(InteractionStyle::Hold, "lever", 10), &space);

    world.start_interaction(hand, 0.0).unwrap();
    world.advance(1.0, &space);
    world.end_overlap(hand, HAND, OWNER, &space).unwrap();

    let entity = world.interactable(door).unwrap();
    assert_eq!(entity.state(), InteractableState::Awake);
    assert_eq!(entity.interactor(), None);
    assert_eq!(world.interaction_progress(door), None);
    assert_eq!(world.interactor(hand).unwrap().state(), InteractorState::Awake);
}
