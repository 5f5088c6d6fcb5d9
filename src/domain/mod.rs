//! Domain models - interaction events and the shared event log
//!
//! - `Event` - a single tracked interaction (page view, click, form submit, ...)
//! - `EventType` - the event's type tag, open-ended via `Custom`
//! - `EventLog` - append-only log owned by the tracking side
//! - `LogSnapshot` - immutable generation of the log read by the feed

pub mod event;
pub mod event_log;

pub use event::{epoch_ms, Event, EventType, Position, SessionId, Target};
pub use event_log::{EventLog, LogSnapshot};
