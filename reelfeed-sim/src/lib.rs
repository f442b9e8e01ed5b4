//! Scripted scroll-session replay for the reelfeed playback coordinator.
//!
//! A session generates a synthetic feed, wires the orchestrator to
//! simulated players that load after a fixed latency, and replays a TOML
//! script of host callbacks in virtual time. Nothing sleeps; timers and
//! player completions fire as the manual clock is advanced.
#![allow(missing_docs)]

pub mod analytics;
pub mod feed;
pub mod player;
pub mod script;
pub mod session;

pub use analytics::CountingSink;
pub use feed::{FeedShape, synthetic_feed};
pub use player::{EventQueue, SimPlayer, SimPlayerFactory};
pub use script::{FailureKind, Script, Step, Visible};
pub use session::{Session, SessionOptions, SessionReport};
