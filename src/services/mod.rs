//! Services - feed projection and state machines
//!
//! - `time_format` - elapsed and relative time strings
//! - `classifier` - event type to icon, style class and label
//! - `window` - bounded display window and new-event watermark
//! - `stats` - per-type counts over the full log
//! - `display` - hidden / collapsed / expanded state and responsive policy
//! - `ticker` - continuous ticker scroll with wraparound
//! - `clock` - shared time-on-page counter and cached now
//! - `feed` - engine tying the above into a renderable view
//! - `runtime` - async loop driving one engine into a sink

pub mod classifier;
pub mod clock;
pub mod display;
pub mod feed;
pub mod runtime;
pub mod stats;
pub mod ticker;
pub mod time_format;
pub mod window;

pub use clock::{ClockSnapshot, SessionClock};
pub use feed::{Action, FeedEngine, FeedOptions, FeedView, Refresh};
pub use runtime::{FeedRuntime, FeedSink};
