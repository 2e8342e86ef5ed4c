//! Client-side session lifecycle with inactivity expiry.
//!
//! This module provides:
//! - `TokenStore`: bearer token and last-activity persistence over a
//!   pluggable `KeyValueStore` (memory, JSON file, OS keychain)
//! - `ActivityWatcher`: refreshes activity on user interaction events
//! - `ExpiryClock`: the ACTIVE / WARNING / EXPIRED state machine
//! - `PollTimer`: periodic tick source driving the clock
//! - `SessionController`: warning prompt, expiry and sign-out handling
//!
//! By default sessions expire after 30 minutes of inactivity, with a
//! warning 5 minutes before.

pub mod clock;
pub mod controller;
pub mod expiry;
pub mod policy;
pub mod store;
pub mod timer;
pub mod token_store;
pub mod watcher;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Navigator, Route, RouteQueue, SessionController, SignInReason, WarningPrompt};
pub use expiry::{ExpiryClock, SessionPhase, Signal};
pub use policy::{PolicyError, TimeoutPolicy};
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreError};
pub use timer::{PollTimer, Tick};
pub use token_store::{Session, TokenStore};
pub use watcher::{ActivityBus, ActivityKind, ActivityWatcher};
