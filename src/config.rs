//! Builder configuration.
//!
//! Controls the reserved member names the facade intercepts and the label
//! used in its inspection string. Defaults mirror the usual thenable query
//! builder surface.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for a [`FakeBuilder`](crate::FakeBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Label shown by the inspection string (default: `FakeBuilder`)
    pub label: String,
    /// Member that materializes the deferred computation (default: `then`)
    pub then_member: String,
    /// Member that surfaces the failure branch (default: `catch`)
    pub catch_member: String,
    /// Member that returns the inspection string (default: `inspect`)
    pub inspect_member: String,
    /// Terminal conversion member (default: `toSQL`)
    pub convert_member: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            label: "FakeBuilder".to_string(),
            then_member: "then".to_string(),
            catch_member: "catch".to_string(),
            inspect_member: "inspect".to_string(),
            convert_member: "toSQL".to_string(),
        }
    }
}

impl BuilderConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inspection label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the execution member name.
    pub fn with_then_member(mut self, name: impl Into<String>) -> Self {
        self.then_member = name.into();
        self
    }

    /// Set the failure-branch member name.
    pub fn with_catch_member(mut self, name: impl Into<String>) -> Self {
        self.catch_member = name.into();
        self
    }

    /// Set the inspection member name.
    pub fn with_inspect_member(mut self, name: impl Into<String>) -> Self {
        self.inspect_member = name.into();
        self
    }

    /// Set the terminal conversion member name.
    pub fn with_convert_member(mut self, name: impl Into<String>) -> Self {
        self.convert_member = name.into();
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Reserved member names in dispatch order.
    pub fn reserved_members(&self) -> [&str; 4] {
        [
            self.then_member.as_str(),
            self.catch_member.as_str(),
            self.inspect_member.as_str(),
            self.convert_member.as_str(),
        ]
    }

    /// Whether `name` is one of the reserved members.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_members().contains(&name)
    }

    /// Reject empty or colliding reserved member names.
    pub fn validate(&self) -> Result<()> {
        let reserved = self.reserved_members();
        for (i, name) in reserved.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::config("reserved member names must not be empty"));
            }
            if reserved[..i].contains(name) {
                return Err(Error::config(format!(
                    "reserved member `{}` is configured more than once",
                    name
                )));
            }
        }
        Ok(())
    }
}
