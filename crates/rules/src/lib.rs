mod columns;
mod parse;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use parley_core::RuleSet;
use thiserror::Error;
use tracing::{info, warn};

pub use parse::parse_rules;

pub const RULES_PATH_ENV: &str = "PARLEY_RULES_PATH";

/// Well-known locations, tried relative to the working directory and then to
/// the executable's directory.
pub const DEFAULT_RULE_PATHS: &[&str] = &[
    "rules.csv",
    "data/rules.csv",
    "config/rules.csv",
    "../data/rules.csv",
    "../../data/rules.csv",
];

#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("no rule source found; tried: {}", display_paths(.tried))]
    NotFound { tried: Vec<PathBuf> },
    #[error("failed reading rule source {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct LoadedRules {
    pub path: PathBuf,
    pub rules: RuleSet,
}

/// Locates the rule source and parses it. Only a missing or unreadable source
/// is an error; bad rows inside a readable source are skipped.
pub fn load_rules(explicit: Option<&Path>) -> Result<LoadedRules, RuleLoadError> {
    let candidates = candidate_paths(explicit);
    let path = locate_rule_source(&candidates)?;
    let rules = load_rules_from(&path)?;

    Ok(LoadedRules { path, rules })
}

pub fn load_rules_from(path: impl AsRef<Path>) -> Result<RuleSet, RuleLoadError> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(|source| RuleLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let rules = RuleSet::new(parse_rules(&raw));
    if rules.skipped_patterns() > 0 {
        warn!(
            path = %path.display(),
            skipped = rules.skipped_patterns(),
            "some patterns could not be prepared and will never match"
        );
    }
    info!(
        path = %path.display(),
        rules = rules.len(),
        patterns = rules.pattern_count(),
        "rule set loaded"
    );

    Ok(rules)
}

/// Ordered candidate list: the explicit path, then `PARLEY_RULES_PATH`, then
/// the well-known locations.
pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }

    if let Some(path) = env::var_os(RULES_PATH_ENV).filter(|value| !value.is_empty()) {
        candidates.push(PathBuf::from(path));
    }

    candidates.extend(DEFAULT_RULE_PATHS.iter().map(PathBuf::from));

    if let Some(exe_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.extend(DEFAULT_RULE_PATHS.iter().map(|rel| exe_dir.join(rel)));
    }

    let mut seen = Vec::with_capacity(candidates.len());
    candidates.retain(|path| {
        if seen.contains(path) {
            false
        } else {
            seen.push(path.clone());
            true
        }
    });

    candidates
}

pub fn locate_rule_source(candidates: &[PathBuf]) -> Result<PathBuf, RuleLoadError> {
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| RuleLoadError::NotFound {
            tried: candidates.to_vec(),
        })
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(no candidates)".to_string();
    }

    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
