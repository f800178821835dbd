//! Status publication to the controlling client.
//!
//! The controller calls [`StatusPublisher::publish`] whenever the light
//! group or park status changes. Two sinks ship with the crate: a tracing
//! logger and a JSON-lines writer.

use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

use crate::state::motion::ParkStatus;
use crate::status::{RoofState, StatusSnapshot};

/// Receives status changes.
pub trait StatusPublisher: Send {
    fn publish(&mut self, snapshot: &StatusSnapshot, park: ParkStatus);
}

/// Logs every change at info level.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl StatusPublisher for LogPublisher {
    fn publish(&mut self, snapshot: &StatusSnapshot, park: ParkStatus) {
        let l = &snapshot.lights;
        info!(
            state = ?snapshot.roof_state(),
            park = ?park,
            opened = ?l.opened,
            closed = ?l.closed,
            moving = ?l.moving,
            locked = ?l.locked,
            auxiliary = ?l.auxiliary,
            overall = ?l.overall,
            "Roof status"
        );
    }
}

/// One JSON line per change.
#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    pub state: RoofState,
    pub park: ParkStatus,
    #[serde(flatten)]
    pub snapshot: &'a StatusSnapshot,
}

impl<'a> StatusReport<'a> {
    pub fn new(snapshot: &'a StatusSnapshot, park: ParkStatus) -> Self {
        Self {
            state: snapshot.roof_state(),
            park,
            snapshot,
        }
    }
}

/// Writes [`StatusReport`] lines to any writer.
pub struct JsonPublisher<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> StatusPublisher for JsonPublisher<W> {
    fn publish(&mut self, snapshot: &StatusSnapshot, park: ParkStatus) {
        let report = StatusReport::new(snapshot, park);
        let result = serde_json::to_writer(&mut self.out, &report)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            warn!("Failed to publish roof status: {e}");
        }
    }
}
