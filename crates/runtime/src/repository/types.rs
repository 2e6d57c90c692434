use interaction_core::{
    InteractionEvent, PresentCommand, ReplicatedUpdate, Request, SurfaceCommand,
};
use serde::{Deserialize, Serialize};

/// Which world of a session produced a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Side {
    #[default]
    Authority,
    Replica,
}

/// One line of the event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// World clock when the record was produced.
    pub time: f32,
    pub side: Side,
    pub entry: LogEntry,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum LogEntry {
    Event(InteractionEvent),
    Present(PresentCommand),
    Surface(SurfaceCommand),
    /// Outcome of a convenience request, with the user facing reason.
    Reason { accepted: bool, text: String },
    /// Mutation a replica sent to the authority.
    Forwarded(Request),
    /// Snapshot the authority sent to the replica.
    Replicated(ReplicatedUpdate),
}

impl LogRecord {
    pub fn new(time: f32, side: Side, entry: LogEntry) -> Self {
        Self { time, side, entry }
    }

    pub fn event(&self) -> Option<&InteractionEvent> {
        match &self.entry {
            LogEntry::Event(event) => Some(event),
            _ => None,
        }
    }
}
