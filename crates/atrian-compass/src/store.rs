//! The rule store: a rules file on disk and the `RuleSet` last read from it.
//!
//! Rules are static after load. The only way to pick up edits is an explicit
//! `reload()`.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::rule::RuleSet;

#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
    rules: RuleSet,
}

impl RuleStore {
    /// Load rules from `path`.
    ///
    /// A missing or unreadable file logs a warning and yields an empty rule
    /// set; this never fails.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let rules = read_rules(&path);
        Self { path, rules }
    }

    /// Build a store from in-memory YAML, e.g. an `include_str!` default.
    /// `reload()` on such a store reads from `origin`.
    pub fn from_yaml_str(origin: impl AsRef<Path>, source: &str) -> Self {
        Self {
            path: origin.as_ref().to_path_buf(),
            rules: RuleSet::from_yaml_str(source),
        }
    }

    /// Re-read the rules file, replacing the current rule set.
    pub fn reload(&mut self) -> &RuleSet {
        self.rules = read_rules(&self.path);
        &self.rules
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_rules(path: &Path) -> RuleSet {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let rules = RuleSet::from_yaml_str(&contents);
            info!(
                path = %path.display(),
                ethics = rules.ethics.len(),
                trust_rules = rules.trust_baselines.len(),
                "loaded rules"
            );
            rules
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "could not read rules file; using empty rule set"
            );
            RuleSet::default()
        }
    }
}
