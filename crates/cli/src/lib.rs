//! Command-line runner for the Rhombus smoke suite.
//!
//! Each subcommand resolves a [`rhombus::SuiteConfig`] from the environment
//! plus global flags, then runs its checks under the suite's retry policy.

pub mod cli;
pub mod commands;
pub mod logging;
