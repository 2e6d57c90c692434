//! Scenario files describing a scene and a timed script.
//!
//! Scenarios separate the static scene (actors, walls, surfaces) from the
//! entities the core simulates and from the script that drives them. The same
//! scene can be replayed with different scripts, and a scenario can request a
//! mirrored replica to exercise the authority boundary.
//!
//! ```ron
//! Scenario(
//!     name: "door",
//!     actors: [(id: 1, location: (x: 0.0, y: 0.0, z: 0.0))],
//!     interactables: [(key: "door", owner: 2, surfaces: [(id: 10, radius: 1.0)])],
//!     script: [(at: Some(0.5), step: StartInteraction("hand"))],
//! )
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use interaction_core::{
    Channel, InteractableConfig, InteractableState, InteractionSettings, InteractorConfig,
    InteractorState, Vec3,
};
use serde::{Deserialize, Serialize};

use crate::api::{ReferenceKind, Result, RuntimeError};
use crate::repository::Side;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub settings: InteractionSettings,
    /// Mirror every spawn on a replica world and route traffic through it.
    pub replicate: bool,
    pub actors: Vec<ActorSpec>,
    pub walls: Vec<WallSpec>,
    pub interactables: Vec<InteractableSpec>,
    pub interactors: Vec<InteractorSpec>,
    pub script: Vec<ScriptStep>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorSpec {
    pub id: u32,
    pub location: Vec3,
    #[serde(default)]
    pub facing: Option<Vec3>,
    #[serde(default)]
    pub sockets: BTreeMap<String, Vec3>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WallSpec {
    pub id: u32,
    /// Walls belong to no simulated actor unless stated.
    #[serde(default)]
    pub actor: u32,
    pub min: Vec3,
    pub max: Vec3,
}

/// Sphere surface attached to the owning actor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSpec {
    pub id: u32,
    #[serde(default)]
    pub offset: Vec3,
    pub radius: f32,
    #[serde(default)]
    pub channels: BTreeSet<Channel>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractableSpec {
    pub key: String,
    pub owner: u32,
    #[serde(default)]
    pub config: InteractableConfig,
    #[serde(default)]
    pub surfaces: Vec<SurfaceSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractorSpec {
    pub key: String,
    pub owner: u32,
    #[serde(default)]
    pub config: InteractorConfig,
    /// Sensor spheres. Added to the overlap detection surfaces.
    #[serde(default)]
    pub sensors: Vec<SurfaceSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Absolute world time to run at. Steps without one run immediately.
    #[serde(default)]
    pub at: Option<f32>,
    #[serde(default)]
    pub side: Side,
    pub step: Step,
}

impl ScriptStep {
    pub fn now(step: Step) -> Self {
        Self {
            at: None,
            side: Side::Authority,
            step,
        }
    }

    pub fn at(at: f32, step: Step) -> Self {
        Self {
            at: Some(at),
            side: Side::Authority,
            step,
        }
    }

    pub fn on_replica(mut self) -> Self {
        self.side = Side::Replica;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Advance the clock by a relative amount.
    Advance(f32),
    /// Move an actor and report the overlaps it starts and ends.
    MoveActor { actor: u32, to: Vec3 },
    FaceActor { actor: u32, direction: Vec3 },
    BeginOverlap {
        interactor: String,
        sensor: u32,
        other: u32,
    },
    EndOverlap {
        interactor: String,
        sensor: u32,
        other: u32,
    },
    StartInteraction(String),
    StopInteraction(String),
    SetInteractableState {
        interactable: String,
        state: InteractableState,
    },
    SetInteractorState {
        interactor: String,
        state: InteractorState,
    },
    Interactable { key: String, op: InteractableOp },
    Interactor { key: String, op: InteractorOp },
    SetWeight { interactable: String, weight: i32 },
    SetHovered {
        interactable: String,
        surface: u32,
        hovered: bool,
    },
    AddDependency { master: String, dependent: String },
    RemoveDependency { master: String, dependent: String },
    AddInteractorDependency { master: String, dependent: String },
    RemoveInteractorDependency { master: String, dependent: String },
    IgnoreActor { interactor: String, actor: u32 },
    UnignoreActor { interactor: String, actor: u32 },
    DespawnInteractable(String),
    DespawnInteractor(String),
}

/// Convenience requests on an interactable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractableOp {
    Activate,
    WakeUp,
    Complete,
    Deactivate,
    Suppress,
    Sleep,
    TriggerCooldown,
}

/// Convenience requests on an interactor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractorOp {
    Activate,
    WakeUp,
    Suppress,
    Deactivate,
    Sleep,
    EnableTracing,
    DisableTracing,
    PauseTracing,
    ResumeTracing,
}

impl Scenario {
    /// Load scenario from a RON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RuntimeError::ReadScenario {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = Self::from_ron(&content)?;
        tracing::info!(
            path = %path.display(),
            name = %scenario.name,
            steps = scenario.script.len(),
            "loaded scenario"
        );
        Ok(scenario)
    }

    pub fn from_ron(content: &str) -> Result<Self> {
        let scenario: Scenario = ron::from_str(content).map_err(RuntimeError::ParseScenario)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Checks keys are unique and every script reference resolves.
    pub fn validate(&self) -> Result<()> {
        let interactables = unique_keys(
            self.interactables.iter().map(|spec| spec.key.as_str()),
            ReferenceKind::Interactable,
        )?;
        let interactors = unique_keys(
            self.interactors.iter().map(|spec| spec.key.as_str()),
            ReferenceKind::Interactor,
        )?;
        let actors: BTreeSet<u32> = self.actors.iter().map(|actor| actor.id).collect();

        let known = |kind: ReferenceKind, key: &str| -> Result<()> {
            let found = match kind {
                ReferenceKind::Interactable => interactables.contains(key),
                ReferenceKind::Interactor => interactors.contains(key),
                ReferenceKind::Actor => key.parse::<u32>().is_ok_and(|id| actors.contains(&id)),
            };
            if found {
                Ok(())
            } else {
                Err(RuntimeError::UnknownReference {
                    kind,
                    key: key.to_string(),
                })
            }
        };

        for spec in &self.interactables {
            known(ReferenceKind::Actor, &spec.owner.to_string())?;
        }
        for spec in &self.interactors {
            known(ReferenceKind::Actor, &spec.owner.to_string())?;
        }
        for step in &self.script {
            for (kind, key) in step.step.references() {
                known(kind, &key)?;
            }
        }
        Ok(())
    }
}

impl Step {
    /// Named entities this step refers to.
    pub fn references(&self) -> Vec<(ReferenceKind, String)> {
        use ReferenceKind::{Actor, Interactable, Interactor};

        match self {
            Self::Advance(_) => Vec::new(),
            Self::MoveActor { actor, .. } | Self::FaceActor { actor, .. } => {
                vec![(Actor, actor.to_string())]
            }
            Self::BeginOverlap { interactor, .. } | Self::EndOverlap { interactor, .. } => {
                vec![(Interactor, interactor.clone())]
            }
            Self::StartInteraction(key)
            | Self::StopInteraction(key)
            | Self::DespawnInteractor(key)
            | Self::Interactor { key, .. } => vec![(Interactor, key.clone())],
            Self::SetInteractorState { interactor, .. }
            | Self::IgnoreActor { interactor, .. }
            | Self::UnignoreActor { interactor, .. } => vec![(Interactor, interactor.clone())],
            Self::Interactable { key, .. } | Self::DespawnInteractable(key) => {
                vec![(Interactable, key.clone())]
            }
            Self::SetInteractableState { interactable, .. }
            | Self::SetWeight { interactable, .. }
            | Self::SetHovered { interactable, .. } => vec![(Interactable, interactable.clone())],
            Self::AddDependency { master, dependent }
            | Self::RemoveDependency { master, dependent } => vec![
                (Interactable, master.clone()),
                (Interactable, dependent.clone()),
            ],
            Self::AddInteractorDependency { master, dependent }
            | Self::RemoveInteractorDependency { master, dependent } => vec![
                (Interactor, master.clone()),
                (Interactor, dependent.clone()),
            ],
        }
    }
}

fn unique_keys<'a>(
    keys: impl Iterator<Item = &'a str>,
    kind: ReferenceKind,
) -> Result<BTreeSet<&'a str>> {
    let mut seen = BTreeSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(RuntimeError::DuplicateKey {
                kind,
                key: key.to_string(),
            });
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use interaction_core::InteractionStyle;

    use super::*;

    const DOOR: &str = r#"
        Scenario(
            name: "door",
            actors: [
                (id: 1, location: (x: 0.0, y: 0.0, z: 0.0)),
                (id: 2, location: (x: 5.0, y: 0.0, z: 0.0)),
            ],
            interactables: [
                (
                    key: "door",
                    owner: 2,
                    config: (name: "door", style: Hold, interaction_period: 2.0),
                    surfaces: [(id: 10, radius: 1.0)],
                ),
            ],
            interactors: [
                (key: "hand", owner: 1, sensors: [(id: 20, radius: 1.0)]),
            ],
            script: [
                (step: MoveActor(actor: 1, to: (x: 4.0, y: 0.0, z: 0.0))),
                (at: Some(1.0), step: StartInteraction("hand")),
                (at: Some(2.0), side: replica, step: Interactable(key: "door", op: Sleep)),
            ],
        )
    "#;

    #[test]
    fn parses_ron() {
        let scenario = Scenario::from_ron(DOOR).unwrap();

        assert_eq!(scenario.name, "door");
        assert!(!scenario.replicate);
        assert_eq!(scenario.interactables[0].config.style, InteractionStyle::Hold);
        assert_eq!(scenario.interactables[0].config.interaction_period, 2.0);
        assert_eq!(scenario.script.len(), 3);
        assert_eq!(scenario.script[1].at, Some(1.0));
        assert_eq!(scenario.script[2].side, Side::Replica);
    }

    #[test]
    fn rejects_unknown_references() {
        let broken = DOOR.replace(r#"StartInteraction("hand")"#, r#"StartInteraction("foot")"#);

        let error = Scenario::from_ron(&broken).unwrap_err();
        assert!(matches!(
            error,
            RuntimeError::UnknownReference {
                kind: ReferenceKind::Interactor,
                ..
            }
        ));
        assert_eq!(error.to_string(), "scenario refers to unknown interactor 'foot'");
    }

    #[test]
    fn rejects_duplicate_keys() {
        let mut scenario = Scenario::from_ron(DOOR).unwrap();
        scenario.interactors.push(scenario.interactors[0].clone());

        assert!(matches!(
            scenario.validate(),
            Err(RuntimeError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn reports_parse_errors() {
        assert!(matches!(
            Scenario::from_ron("Scenario(name: )"),
            Err(RuntimeError::ParseScenario(_))
        ));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("door.ron");
        std::fs::write(&path, DOOR).unwrap();

        assert_eq!(Scenario::load_from_file(&path).unwrap().name, "door");
        assert!(matches!(
            Scenario::load_from_file(&dir.path().join("missing.ron")),
            Err(RuntimeError::ReadScenario { .. })
        ));
    }
}
