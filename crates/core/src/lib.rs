//! End-to-end smoke suite for the Rhombus AI web app.
//!
//! The suite logs in once through a real Chromium, persists the session, and
//! reuses it for everything else:
//!
//! - [`session`]: credentials, the login/project workflow, and the shared
//!   [`AuthenticatedSession`] fixture
//! - [`api`]: HTTP contract checks replaying the session's cookies
//! - [`validation`]: offline checks on a downloaded, transformed CSV
//! - [`Browser`], [`Page`], [`Locator`]: a small DevTools-driven browser API
//!
//! # Example
//!
//! ```ignore
//! use rhombus::{AuthenticatedSession, api};
//!
//! let session = AuthenticatedSession::shared().await?;
//! let client = session.api_client()?;
//! let me = api::check_authenticated(&client, &session.config().api.me).await?;
//! ```

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod harness;
mod js;
pub mod locator;
pub mod page;
pub mod selector;
pub mod session;
pub mod steps;
pub mod testing;
pub mod validation;

pub use api::{ApiClient, ApiResponse};
pub use browser::{Browser, BrowserContext, BrowserOptions};
pub use config::{ApiEndpoints, BrowserSettings, RetryPolicy, SuiteConfig, Timeouts};
pub use error::{Error, Result};
pub use locator::Locator;
pub use page::{Page, WaitUntil};
pub use rhombus_protocol::{Cookie, StorageState};
pub use selector::{Selector, TextMatcher, WaitState};
pub use session::{AuthenticatedSession, Credentials, SessionArtifact, SessionBootstrap, WorkflowReport, project_name};
pub use steps::best_effort;
