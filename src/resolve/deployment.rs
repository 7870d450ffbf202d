//! Deployment home discovery and `deployment.properties`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Entries in the run directory must contain this to count as a deployment.
pub const DEPLOYMENT_MARKER: &str = "Deployment";

pub const PROPERTIES_FILE: &str = "deployment.properties";

/// Find the single deployment directory under `run_dir`.
///
/// Zero or several candidates is an error: installing into the wrong
/// deployment is worse than not installing.
pub fn find_deployment_home(run_dir: &Path) -> Result<PathBuf> {
    if !run_dir.is_dir() {
        return Err(Error::EnvironmentUnresolvable(format!(
            "run directory {} not found, deployment home cannot be determined",
            run_dir.display()
        )));
    }

    let mut candidates: Vec<PathBuf> = WalkDir::new(run_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .contains(DEPLOYMENT_MARKER)
        })
        .map(|entry| entry.into_path())
        .collect();
    candidates.sort();

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(Error::EnvironmentUnresolvable(format!(
            "no '{}' entry in {}, deployment home cannot be determined",
            DEPLOYMENT_MARKER,
            run_dir.display()
        ))),
        _ => Err(Error::EnvironmentUnresolvable(format!(
            "ambiguous deployment home in {}: {}",
            run_dir.display(),
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Key/value pairs from `deployment.properties`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentProperties {
    entries: BTreeMap<String, String>,
}

impl DeploymentProperties {
    /// Parse `name=value` lines. Comments, lines without `=`, and entries with
    /// a blank name or value are skipped.
    pub fn parse(content: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                continue;
            }
            entries.insert(name.to_string(), value.to_string());
        }
        Self { entries }
    }

    /// Load from `<deployment_home>/deployment.properties`. A missing file is
    /// an empty set.
    pub fn load(deployment_home: &Path) -> Result<Self> {
        let path = deployment_home.join(PROPERTIES_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::io(format!("failed to read {}", path.display()), e)),
        }
    }

    /// Find the property whose name matches `pattern`.
    ///
    /// One match wins outright. Several matches only resolve if one of them
    /// is exactly `pattern`. An invalid pattern matches nothing.
    pub fn lookup(&self, pattern: &str) -> Option<(&str, &str)> {
        let regex = Regex::new(pattern).ok()?;
        let matched: Vec<(&String, &String)> = self
            .entries
            .iter()
            .filter(|(name, _)| regex.is_match(name))
            .collect();

        match matched.as_slice() {
            [(name, value)] => Some((name.as_str(), value.as_str())),
            [] => None,
            many => many
                .iter()
                .find(|(name, _)| name.as_str() == pattern)
                .map(|(name, value)| (name.as_str(), value.as_str())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
