use interaction_core::{
    Detection, InteractableConfig, InteractableEvent, InteractableState, InteractionEvent,
    InteractionStyle, InteractorConfig, InteractorState, TraceKind, TraceSettings, Vec3,
};
use interaction_runtime::{
    ActorSpec, FileEventLog, InMemoryEventLog, InteractableOp, InteractableSpec, InteractorSpec,
    LogEntry, LogRecord, RuntimeError, Scenario, ScriptStep, Session, Side, Step, SurfaceSpec,
    WallSpec, read_all,
};

fn actor(id: u32, x: f32, y: f32) -> ActorSpec {
    ActorSpec {
        id,
        location: Vec3::new(x, y, 0.0),
        facing: None,
        sockets: Default::default(),
    }
}

fn surface(id: u32) -> SurfaceSpec {
    SurfaceSpec {
        id,
        offset: Vec3::ZERO,
        radius: 1.0,
        channels: Default::default(),
    }
}

/// Player (actor 1) far from a two second hold door (actor 2).
fn door_scenario() -> Scenario {
    let mut door = InteractableConfig::new(InteractionStyle::Hold);
    door.interaction_period = 2.0;

    Scenario {
        name: "door".into(),
        actors: vec![actor(1, -5.0, 0.0), actor(2, 5.0, 0.0)],
        interactables: vec![InteractableSpec {
            key: "door".into(),
            owner: 2,
            config: door,
            surfaces: vec![surface(10)],
        }],
        interactors: vec![InteractorSpec {
            key: "hand".into(),
            owner: 1,
            config: InteractorConfig::default(),
            sensors: vec![surface(20)],
        }],
        ..Scenario::default()
    }
}

fn walk_up() -> ScriptStep {
    ScriptStep::now(Step::MoveActor {
        actor: 1,
        to: Vec3::new(4.0, 0.0, 0.0),
    })
}

fn interactable_events(records: &[LogRecord], side: Side) -> Vec<InteractableEvent> {
    records
        .iter()
        .filter(|record| record.side == side)
        .filter_map(|record| match record.event() {
            Some(InteractionEvent::Interactable { event, .. }) => Some(event.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn movement_selects_and_hold_completes() {
    let log = InMemoryEventLog::new();
    let scenario = door_scenario();
    let mut session = Session::new(&scenario, Box::new(log.clone())).unwrap();
    let door = session.interactable_id("door").unwrap();
    let hand = session.interactor_id("hand").unwrap();

    session.run(&[walk_up()]).unwrap();
    assert_eq!(
        session.authority().interactable(door).unwrap().interactor(),
        Some(hand)
    );

    let summary = session
        .run(&[
            ScriptStep::at(1.0, Step::StartInteraction("hand".into())),
            ScriptStep::at(3.5, Step::Advance(0.0)),
        ])
        .unwrap();
    assert_eq!(summary.steps, 2);
    assert_eq!(summary.end_time, 3.5);

    let entity = session.authority().interactable(door).unwrap();
    assert_eq!(entity.state(), InteractableState::Completed);
    assert_eq!(
        session.authority().interactor(hand).unwrap().state(),
        InteractorState::Awake
    );

    let events = interactable_events(&log.get_all().unwrap(), Side::Authority);
    assert!(events.contains(&InteractableEvent::InteractionCompleted {
        time: 3.0,
        interactor: Some(hand),
    }));
}

#[test]
fn walking_away_releases_the_selection() {
    let log = InMemoryEventLog::new();
    let mut session = Session::new(&door_scenario(), Box::new(log)).unwrap();
    let door = session.interactable_id("door").unwrap();

    session
        .run(&[
            walk_up(),
            ScriptStep::now(Step::MoveActor {
                actor: 1,
                to: Vec3::new(-5.0, 0.0, 0.0),
            }),
        ])
        .unwrap();

    let entity = session.authority().interactable(door).unwrap();
    assert_eq!(entity.state(), InteractableState::Awake);
    assert_eq!(entity.interactor(), None);
}

#[test]
fn replica_requests_round_trip_through_the_authority() {
    let log = InMemoryEventLog::new();
    let mut scenario = door_scenario();
    scenario.replicate = true;
    let mut session = Session::new(&scenario, Box::new(log.clone())).unwrap();
    let door = session.interactable_id("door").unwrap();

    session
        .run(&[ScriptStep::now(Step::Interactable {
            key: "door".into(),
            op: InteractableOp::Deactivate,
        })
        .on_replica()])
        .unwrap();

    assert_eq!(
        session.authority().interactable(door).unwrap().state(),
        InteractableState::Disabled
    );
    assert_eq!(
        session.replica().unwrap().interactable(door).unwrap().state(),
        InteractableState::Disabled
    );

    let records = log.get_all().unwrap();
    assert!(records.iter().any(|record| matches!(record.entry, LogEntry::Forwarded(_))));
    assert!(records.iter().any(|record| matches!(record.entry, LogEntry::Replicated(_))));
    assert!(
        interactable_events(&records, Side::Replica).contains(&InteractableEvent::StateChanged {
            from: InteractableState::Awake,
            to: InteractableState::Disabled,
        })
    );
}

#[test]
fn selection_mirrors_onto_the_replica() {
    let mut scenario = door_scenario();
    scenario.replicate = true;
    let mut session = Session::new(&scenario, Box::new(InMemoryEventLog::new())).unwrap();
    let door = session.interactable_id("door").unwrap();
    let hand = session.interactor_id("hand").unwrap();

    session.run(&[walk_up()]).unwrap();

    let replica = session.replica().unwrap();
    assert_eq!(replica.interactable(door).unwrap().state(), InteractableState::Active);
    assert_eq!(replica.interactor(hand).unwrap().active_interactable(), Some(door));
    assert!(replica.interactable(door).unwrap().is_widget_visible());
}

#[test]
fn convenience_reasons_are_logged() {
    let log = InMemoryEventLog::new();
    let mut session = Session::new(&door_scenario(), Box::new(log.clone())).unwrap();

    session
        .run(&[
            ScriptStep::now(Step::Interactable {
                key: "door".into(),
                op: InteractableOp::Sleep,
            }),
            ScriptStep::now(Step::Interactable {
                key: "door".into(),
                op: InteractableOp::Sleep,
            }),
        ])
        .unwrap();

    let reasons: Vec<_> = log
        .get_all()
        .unwrap()
        .into_iter()
        .filter_map(|record| match record.entry {
            LogEntry::Reason { accepted, text } => Some((accepted, text)),
            _ => None,
        })
        .collect();
    assert_eq!(
        reasons,
        vec![
            (true, "door has been put to sleep".to_string()),
            (false, "door is already asleep".to_string()),
        ]
    );
}

#[test]
fn trace_detection_is_blocked_by_walls() {
    let mut scenario = door_scenario();
    scenario.actors[0].location = Vec3::ZERO;
    scenario.actors[0].facing = Some(Vec3::new(1.0, 0.0, 0.0));
    scenario.interactors[0].sensors.clear();
    scenario.interactors[0].config.detection = Detection::Trace(TraceSettings {
        kind: TraceKind::Precise,
        interval: 0.1,
        range: 20.0,
        ..TraceSettings::default()
    });

    let mut open = Session::new(&scenario, Box::new(InMemoryEventLog::new())).unwrap();
    open.run(&[ScriptStep::at(0.25, Step::Advance(0.0))]).unwrap();
    let door = open.interactable_id("door").unwrap();
    assert_eq!(
        open.authority().interactable(door).unwrap().state(),
        InteractableState::Active
    );

    scenario.walls.push(WallSpec {
        id: 900,
        actor: 99,
        min: Vec3::new(2.0, -2.0, -2.0),
        max: Vec3::new(3.0, 2.0, 2.0),
    });
    let mut walled = Session::new(&scenario, Box::new(InMemoryEventLog::new())).unwrap();
    walled.run(&[ScriptStep::at(0.25, Step::Advance(0.0))]).unwrap();
    assert_eq!(
        walled.authority().interactable(door).unwrap().state(),
        InteractableState::Awake
    );
}

#[test]
fn steps_cannot_go_back_in_time() {
    let mut session = Session::new(&door_scenario(), Box::new(InMemoryEventLog::new())).unwrap();

    let error = session
        .run(&[
            ScriptStep::at(2.0, Step::Advance(0.0)),
            ScriptStep::at(1.0, Step::Advance(0.0)),
        ])
        .unwrap_err();
    assert!(matches!(error, RuntimeError::StepInPast { index: 1, .. }));
}

#[test]
fn file_log_captures_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = FileEventLog::create(dir.path(), "events.jsonl").unwrap();
    let mut session = Session::new(&door_scenario(), Box::new(log)).unwrap();

    let summary = session
        .run(&[walk_up(), ScriptStep::at(0.5, Step::StartInteraction("hand".into()))])
        .unwrap();

    let records = read_all(dir.path().join("events.jsonl")).unwrap();
    assert_eq!(records.len() as u64, summary.records);
    assert!(records.iter().all(|record| record.side == Side::Authority));
    assert!(
        interactable_events(&records, Side::Authority)
            .iter()
            .any(|event| matches!(event, InteractableEvent::InteractionStarted { .. }))
    );
}

#[test]
fn bundled_vault_scenario_runs() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/vault.ron");
    let scenario = Scenario::load_from_file(&path).unwrap();
    let log = InMemoryEventLog::new();
    let mut session = Session::new(&scenario, Box::new(log.clone())).unwrap();

    session.run(&scenario.script).unwrap();

    let world = session.authority();
    let door = session.interactable_id("door").unwrap();
    let chest = session.interactable_id("chest").unwrap();
    assert_eq!(world.interactable(door).unwrap().state(), InteractableState::Completed);
    let entity = world.interactable(chest).unwrap();
    assert_eq!(entity.state(), InteractableState::Asleep);
    assert_eq!(entity.remaining_lifecycle(), 1);
    assert_eq!(
        session.replica().unwrap().interactable(chest).unwrap().state(),
        InteractableState::Asleep
    );

    let events = interactable_events(&log.get_all().unwrap(), Side::Authority);
    assert!(events.contains(&InteractableEvent::CycleCompleted {
        time: 5.0,
        remaining: 1,
    }));
    assert!(events.contains(&InteractableEvent::CooldownCompleted));
}
