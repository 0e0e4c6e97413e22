//! Layer 1.5 context signals.
//!
//! Four independent probes look at the environment (working directory,
//! file types present, project marker files, recent skill history) and
//! produce score adjustments. Each probe sits behind [`ContextProbe`] so
//! tests can replace any of them with fixed data.

pub mod probes;
pub mod scorer;

use std::path::Path;

use crate::rules::{Boosts, RuleSet};

pub use probes::FilesystemProbe;
pub use scorer::{apply_context_signals, rank_and_truncate};

/// Boosts and penalties from project markers, kept apart for the trace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerBoosts {
    pub boosts: Boosts,
    pub penalties: Boosts,
}

/// Resolved output of all four probes for one routing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSignals {
    /// category -> boost
    pub directory: Boosts,
    /// category -> boost
    pub files: Boosts,
    pub markers: MarkerBoosts,
    /// command -> boost
    pub sequence: Boosts,
}

/// Capability interface for the context probes
pub trait ContextProbe {
    fn directory_boosts(&self, cwd: &str, ruleset: &RuleSet) -> Boosts;
    fn file_type_boosts(&self, cwd: &str, ruleset: &RuleSet) -> Boosts;
    fn marker_boosts(&self, cwd: &str, ruleset: &RuleSet) -> MarkerBoosts;
    fn sequence_boosts(&self, ruleset: &RuleSet) -> Boosts;
}

/// Fixed values that replace individual probes
#[derive(Debug, Clone, Default)]
pub struct SignalOverrides {
    pub directory: Option<Boosts>,
    pub files: Option<Boosts>,
    pub markers: Option<MarkerBoosts>,
    pub sequence: Option<Boosts>,
}

impl SignalOverrides {
    /// Wrap `inner`, answering from the overrides where set
    pub fn over<'a, P: ContextProbe + ?Sized>(&'a self, inner: &'a P) -> Overridden<'a, P> {
        Overridden {
            overrides: self,
            inner,
        }
    }
}

/// A probe where some answers come from [`SignalOverrides`]
pub struct Overridden<'a, P: ?Sized> {
    overrides: &'a SignalOverrides,
    inner: &'a P,
}

impl<P: ContextProbe + ?Sized> ContextProbe for Overridden<'_, P> {
    fn directory_boosts(&self, cwd: &str, ruleset: &RuleSet) -> Boosts {
        match &self.overrides.directory {
            Some(boosts) => boosts.clone(),
            None => self.inner.directory_boosts(cwd, ruleset),
        }
    }

    fn file_type_boosts(&self, cwd: &str, ruleset: &RuleSet) -> Boosts {
        match &self.overrides.files {
            Some(boosts) => boosts.clone(),
            None => self.inner.file_type_boosts(cwd, ruleset),
        }
    }

    fn marker_boosts(&self, cwd: &str, ruleset: &RuleSet) -> MarkerBoosts {
        match &self.overrides.markers {
            Some(markers) => markers.clone(),
            None => self.inner.marker_boosts(cwd, ruleset),
        }
    }

    fn sequence_boosts(&self, ruleset: &RuleSet) -> Boosts {
        match &self.overrides.sequence {
            Some(boosts) => boosts.clone(),
            None => self.inner.sequence_boosts(ruleset),
        }
    }
}

/// Run every probe once
pub fn resolve_signals<P: ContextProbe + ?Sized>(
    probe: &P,
    cwd: &Path,
    ruleset: &RuleSet,
) -> ResolvedSignals {
    let cwd = cwd.to_string_lossy();
    ResolvedSignals {
        directory: probe.directory_boosts(&cwd, ruleset),
        files: probe.file_type_boosts(&cwd, ruleset),
        markers: probe.marker_boosts(&cwd, ruleset),
        sequence: probe.sequence_boosts(ruleset),
    }
}
