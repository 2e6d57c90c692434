mod common;

use common::*;
use interaction_core::{
    ActorId, Channel, InteractableConfig, InteractableEvent, InteractableState, InteractionStyle,
    InteractorEvent, InteractorState, Present, SafetyTrace, SafetyTraceMode, SurfaceCommand,
    SurfaceId, Vec3,
};

#[test]
fn overlap_selects_and_shows_widget() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = single(interactable(InteractionStyle::Press, "door", 10));

    assert!(world.begin_overlap(hand, HAND, OWNER, &space).unwrap());

    assert_eq!(world.interactor(hand).unwrap().active_interactable(), Some(door));
    let entity = world.interactable(door).unwrap();
    assert_eq!(entity.state(), InteractableState::Active);
    assert_eq!(entity.interactor(), Some(hand));
    assert!(entity.is_widget_visible());
    assert!(entity.is_highlighted());

    let events = world.drain_events();
    assert_eq!(
        interactor_events(&events, hand),
        vec![
            InteractorEvent::InteractableFound { interactable: door },
            InteractorEvent::InteractableUpdated { interactable: door },
        ]
    );
    assert_eq!(
        interactable_events(&events, door),
        vec![
            InteractableEvent::InteractorFound { interactor: hand },
            InteractableEvent::StateChanged {
                from: InteractableState::Awake,
                to: InteractableState::Active,
            },
            InteractableEvent::Selected { interactor: hand },
        ]
    );
    assert!(
        world
            .drain_presentation()
            .iter()
            .any(|command| command.target == door && command.command == Present::SetVisible(true))
    );
}

#[test]
fn reselecting_the_active_interactable_changes_nothing() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = selected(interactable(InteractionStyle::Press, "door", 10), &space);

    assert!(!world.begin_overlap(hand, HAND, OWNER, &space).unwrap());

    assert!(world.drain_events().is_empty());
    assert_eq!(world.interactor(hand).unwrap().active_interactable(), Some(door));
    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Active);
}

#[test]
fn equal_weight_keeps_the_incumbent() {
    let space = ScriptedSpace::default();
    let (mut world, first, hand) = selected(interactable(InteractionStyle::Press, "first", 10), &space);
    let second = world.spawn_interactable(OTHER_OWNER, interactable(InteractionStyle::Press, "second", 11));
    world.begin_all();
    world.take_outbox();

    assert!(!world.begin_overlap(hand, HAND, OTHER_OWNER, &space).unwrap());

    assert_eq!(world.interactor(hand).unwrap().active_interactable(), Some(first));
    let second = world.interactable(second).unwrap();
    assert_eq!(second.state(), InteractableState::Awake);
    assert_eq!(second.interactor(), None);
}

#[test]
fn heavier_candidate_replaces_the_incumbent() {
    let space = ScriptedSpace::default();
    let (mut world, first, hand) = selected(interactable(InteractionStyle::Press, "first", 10), &space);
    let second = world.spawn_interactable(
        OTHER_OWNER,
        interactable(InteractionStyle::Press, "second", 11).with_weight(5),
    );
    world.begin_all();
    world.take_outbox();

    assert!(world.begin_overlap(hand, HAND, OTHER_OWNER, &space).unwrap());

    assert_eq!(world.interactor(hand).unwrap().active_interactable(), Some(second));
    let first = world.interactable(first).unwrap();
    assert_eq!(first.state(), InteractableState::Awake);
    assert_eq!(first.interactor(), None);
    assert!(!first.is_widget_visible());
    assert_eq!(world.interactable(second).unwrap().state(), InteractableState::Active);
}

#[test]
fn zero_weight_is_accepted_without_an_incumbent() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = single(interactable(InteractionStyle::Press, "door", 10).with_weight(0));

    assert!(world.begin_overlap(hand, HAND, OWNER, &space).unwrap());
    assert_eq!(world.interactor(hand).unwrap().active_interactable(), Some(door));
}

#[test]
fn heaviest_of_one_actor_wins() {
    let space = ScriptedSpace::default();
    let mut world = world();
    let light = world.spawn_interactable(OWNER, interactable(InteractionStyle::Press, "light", 10));
    let heavy = world.spawn_interactable(
        OWNER,
        interactable(InteractionStyle::Press, "heavy", 11).with_weight(3),
    );
    let hand = world.spawn_interactor(PLAYER, hand());
    world.begin_all();

    assert!(world.begin_overlap(hand, HAND, OWNER, &space).unwrap());
    assert_eq!(world.interactor(hand).unwrap().active_interactable(), Some(heavy));
    assert_eq!(world.interactable(light).unwrap().state(), InteractableState::Awake);
}

#[test]
fn ignored_actor_is_never_selected() {
    let space = ScriptedSpace::default();
    let (mut world, _, hand) = single(interactable(InteractionStyle::Press, "door", 10));

    assert!(world.add_ignored_actor(hand, OWNER).unwrap());
    assert!(!world.add_ignored_actor(hand, OWNER).unwrap());
    assert!(!world.begin_overlap(hand, HAND, OWNER, &space).unwrap());

    assert!(world.remove_ignored_actor(hand, OWNER).unwrap());
    assert!(world.begin_overlap(hand, HAND, OWNER, &space).unwrap());
}

#[test]
fn tag_filters_apply() {
    let space = ScriptedSpace::default();
    let mut world = world();
    let door = world.spawn_interactable(
        OWNER,
        interactable(InteractionStyle::Press, "door", 10).with_compatible_tag("player"),
    );
    let npc = world.spawn_interactor(PLAYER, hand().with_tag("npc"));
    let player = world.spawn_interactor(PLAYER, hand().with_tag("player"));
    world.begin_all();

    assert!(!world.begin_overlap(npc, HAND, OWNER, &space).unwrap());
    assert!(world.begin_overlap(player, HAND, OWNER, &space).unwrap());
    assert_eq!(world.interactable(door).unwrap().interactor(), Some(player));
}

#[test]
fn channel_mismatch_is_ignored() {
    let space = ScriptedSpace::default();
    let (mut world, _, hand) = single(
        interactable(InteractionStyle::Press, "door", 10).with_response_channel(Channel::Custom(4)),
    );

    assert!(!world.begin_overlap(hand, HAND, OWNER, &space).unwrap());
    world.set_response_channel(hand, Channel::Custom(4)).unwrap();
    assert!(world.begin_overlap(hand, HAND, OWNER, &space).unwrap());
}

#[test]
fn safety_trace_blocked_by_a_wall() {
    let wall = ActorId(99);
    let mut space = ScriptedSpace::default();
    space.locations.insert(OWNER, Vec3::new(10.0, 0.0, 0.0));
    space.hit(Channel::Camera, wall, SurfaceId(900));
    space.hit(Channel::Camera, OWNER, SurfaceId(10));

    let (mut world, door, hand) = single(interactable(InteractionStyle::Press, "door", 10));
    world
        .set_safety_trace(
            hand,
            SafetyTrace {
                mode: SafetyTraceMode::Location(Vec3::ZERO),
                validation_channel: Channel::Camera,
            },
        )
        .unwrap();

    assert!(!world.begin_overlap(hand, HAND, OWNER, &space).unwrap());
    assert_eq!(world.interactable(door).unwrap().interactor(), None);

    // Wall removed
    space.hits.get_mut(&Channel::Camera).unwrap().remove(0);
    assert!(world.begin_overlap(hand, HAND, OWNER, &space).unwrap());
    assert_eq!(world.interactable(door).unwrap().interactor(), Some(hand));
}

/// Heavy interactable on [`OWNER`] behind a wall, light one on
/// [`OTHER_OWNER`] in plain sight.
fn walled_pair() -> ScriptedSpace {
    let (behind, clear) = (Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 10.0, 0.0));
    let mut space = ScriptedSpace::default();
    space.locations.insert(OWNER, behind);
    space.locations.insert(OTHER_OWNER, clear);
    space.hit_towards(behind, ActorId(99), SurfaceId(900));
    space.hit_towards(behind, OWNER, SurfaceId(10));
    space.hit_towards(clear, OTHER_OWNER, SurfaceId(11));
    space
}

#[test]
fn safety_trace_hands_the_selection_to_the_visible_candidate() {
    let space = walled_pair();

    for heavy_first in [true, false] {
        let mut world = world();
        let heavy = world.spawn_interactable(
            OWNER,
            interactable(InteractionStyle::Press, "heavy", 10).with_weight(5),
        );
        let light = world.spawn_interactable(
            OTHER_OWNER,
            interactable(InteractionStyle::Press, "light", 11).with_weight(1),
        );
        let hand = world.spawn_interactor(
            PLAYER,
            hand().with_safety_trace(SafetyTrace {
                mode: SafetyTraceMode::Location(Vec3::ZERO),
                validation_channel: Channel::Camera,
            }),
        );
        world.begin_all();

        let order = if heavy_first {
            [OWNER, OTHER_OWNER]
        } else {
            [OTHER_OWNER, OWNER]
        };
        for actor in order {
            world.begin_overlap(hand, HAND, actor, &space).unwrap();
        }

        assert_eq!(
            world.interactor(hand).unwrap().active_interactable(),
            Some(light),
            "heavy first: {heavy_first}"
        );
        assert_eq!(world.interactable(heavy).unwrap().state(), InteractableState::Awake);
        assert_eq!(world.interactable(light).unwrap().state(), InteractableState::Active);
    }
}

#[test]
fn end_overlap_releases_unless_still_touching() {
    let mut space = ScriptedSpace::default();
    let (mut world, door, hand) = selected(interactable(InteractionStyle::Press, "door", 10), &space);

    space.overlapping.insert((HAND, SurfaceId(10)));
    assert!(!world.end_overlap(hand, HAND, OWNER, &space).unwrap());
    assert_eq!(world.interactor(hand).unwrap().active_interactable(), Some(door));

    space.overlapping.clear();
    assert!(world.end_overlap(hand, HAND, OWNER, &space).unwrap());
    assert_eq!(world.interactor(hand).unwrap().active_interactable(), None);
    let door = world.interactable(door).unwrap();
    assert_eq!(door.state(), InteractableState::Awake);
    assert_eq!(door.interactor(), None);
}

#[test]
fn losing_the_interactor_returns_through_asleep() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = selected(interactable(InteractionStyle::Press, "door", 10), &space);

    assert!(world.end_overlap(hand, HAND, OWNER, &space).unwrap());
    let outbox = world.take_outbox();

    let changes: Vec<_> = interactable_events(&outbox.events, door)
        .into_iter()
        .filter(|event| matches!(event, InteractableEvent::StateChanged { .. }))
        .collect();
    assert_eq!(
        changes,
        vec![
            InteractableEvent::StateChanged {
                from: InteractableState::Active,
                to: InteractableState::Asleep,
            },
            InteractableEvent::StateChanged {
                from: InteractableState::Asleep,
                to: InteractableState::Awake,
            },
        ]
    );
    assert_eq!(
        outbox.surfaces,
        vec![
            SurfaceCommand::Unbind(SurfaceId(10)),
            SurfaceCommand::Bind(SurfaceId(10)),
        ]
    );
}

#[test]
fn suppressed_interactor_does_not_select() {
    let space = ScriptedSpace::default();
    let (mut world, _, hand) = single(interactable(InteractionStyle::Press, "door", 10));

    world.suppress_interactor(hand).unwrap();
    assert_eq!(world.interactor(hand).unwrap().state(), InteractorState::Suppressed);
    assert!(!world.begin_overlap(hand, HAND, OWNER, &space).unwrap());
}

#[test]
fn despawning_the_selection_frees_the_interactor() {
    let space = ScriptedSpace::default();
    let (mut world, door, hand) = selected(InteractableConfig::new(InteractionStyle::Hold), &space);

    world.despawn_interactable(door).unwrap();

    assert!(world.interactable(door).is_none());
    assert_eq!(world.interactor(hand).unwrap().active_interactable(), None);
    assert_eq!(world.interactor(hand).unwrap().state(), InteractorState::Awake);
}
