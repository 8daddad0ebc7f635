//! Wire types shared by the smoke suite.
//!
//! Two families live here:
//! - [`cdp`]: envelopes for the Chrome DevTools Protocol websocket
//! - [`cookie`]: cookies and the persisted [`StorageState`] session artifact
//!
//! Types are pure data. Behavior beyond (de)serialization and cookie matching
//! belongs in `rhombus-runtime` and `rhombus-smoke`.

pub mod cdp;
pub mod cookie;

pub use cdp::{ErrorPayload, EvaluateResult, Event, ExceptionDetails, Message, RemoteObject, Request, Response, VersionInfo};
pub use cookie::*;
