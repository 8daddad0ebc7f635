//! Browser runtime for the smoke suite.
//!
//! Low-level plumbing between the test code and a Chromium process:
//!
//! - **Launcher**: locating and starting Chromium with remote debugging
//! - **Transport**: the DevTools websocket, split into read and write halves
//! - **Connection**: command/response correlation and event fan-out
//! - **Channel**: typed commands scoped to the browser or one page session
//!
//! ```text
//! ┌──────────────┐
//! │ rhombus-smoke│  Browser, Page, Locator, session bootstrap
//! └──────┬───────┘
//!        │ Channel
//! ┌──────▼───────┐
//! │   runtime    │  Connection ─ Transport ─ Launcher
//! └──────────────┘
//! ```

pub mod channel;
pub mod connection;
pub mod error;
pub mod launcher;
pub mod transport;

pub use channel::Channel;
pub use connection::Connection;
pub use error::{Error, Result};
pub use launcher::{BrowserProcess, LaunchOptions, fetch_version, find_chromium, resolve_endpoint};
pub use transport::{Transport, TransportParts, TransportReceiver, WebSocketTransport};
