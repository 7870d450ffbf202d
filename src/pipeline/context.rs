//! Outputs accumulated by earlier stages.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};

/// Well-known context keys written by the default stages.
pub mod keys {
    /// Output of `<interpreter> --version`.
    pub const INTERPRETER_VERSION: &str = "interpreter_version";
    /// Which strategy provided the package installer: `latest`, `pinned` or `preinstalled`.
    pub const PACKAGE_INSTALLER: &str = "package_installer";
    pub const SOURCE_DIR: &str = "source_dir";
    pub const ENV_FILE: &str = "env_file";
    pub const INSTALLER: &str = "installer";
}

/// Key/value outputs. A key is written at most once; writing the same value
/// again is a no-op, writing a different one is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunContext {
    values: BTreeMap<String, String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        match self.values.get(key) {
            Some(existing) if *existing == value => Ok(()),
            Some(existing) => Err(Error::ContextConflict {
                key: key.to_string(),
                existing: existing.clone(),
                attempted: value,
            }),
            None => {
                self.values.insert(key.to_string(), value);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
