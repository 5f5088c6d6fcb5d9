//! IO modules - external system interfaces
//!
//! - `collector` - HTTP endpoint receiving tracking events
//! - `replay` - JSONL event files fed into the log

pub mod collector;
pub mod replay;

pub use collector::start_collector;
