//! Skill Dispatch - context-aware skill routing for Claude Code prompt hooks
//!
//! Classifies a prompt against configured rules in two layers:
//! - Layer 1: keyword (+1) and regex (+2) scoring with per-rule thresholds
//! - Layer 1.5: boosts from the working directory, file types present,
//!   project marker files, and the recent skill sequence
//!
//! The engine is synchronous and bounded. It never calls a model and never
//! fails a routing call; unreadable probes and malformed patterns simply
//! contribute nothing.

pub mod cache;
pub mod context;
pub mod error;
pub mod history;
pub mod output;
pub mod router;
pub mod rules;
pub mod scoring;
pub mod settings;

pub use error::{DispatchError, Result};
pub use output::{format_dry_run, format_output, HookOutput};
pub use router::{dry_run, route, route_with_probe, RouteOptions};
pub use rules::{load_ruleset, Enforcement, Rule, RuleSet};
pub use scoring::RuleMatch;
