//! Expansion options
//!
//! Options are plain serde data so hosts can keep them in YAML or JSON
//! configuration. Loading from text lives here; reading files is left to the
//! caller (the core performs no I/O).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lexer::LexOptions;

/// Default ceiling on nested macro invocations
pub const DEFAULT_MAX_DEPTH: usize = 100;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid options YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("max_depth must be at least 1")]
    InvalidMaxDepth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpandOptions {
    /// Drop `//` and `/* */` comments instead of copying them through
    pub strip_comments: bool,
    /// Remove output lines that contain only whitespace
    pub collapse_empty_lines: bool,
    pub generate_source_map: bool,
    /// Nested invocation ceiling; the hard termination guarantee
    pub max_depth: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            strip_comments: true,
            collapse_empty_lines: false,
            generate_source_map: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ExpandOptions {
    pub fn from_yaml_str(text: &str) -> Result<Self, OptionsError> {
        let options: Self = serde_yaml::from_str(text)?;
        options.validate()
    }

    pub fn from_json_str(text: &str) -> Result<Self, OptionsError> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()
    }

    pub fn validate(self) -> Result<Self, OptionsError> {
        if self.max_depth == 0 {
            return Err(OptionsError::InvalidMaxDepth);
        }
        Ok(self)
    }

    pub fn with_source_map(mut self, enabled: bool) -> Self {
        self.generate_source_map = enabled;
        self
    }

    pub fn with_collapse_empty_lines(mut self, enabled: bool) -> Self {
        self.collapse_empty_lines = enabled;
        self
    }

    pub fn with_strip_comments(mut self, enabled: bool) -> Self {
        self.strip_comments = enabled;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Lexer settings for a full expansion run
    pub fn lex_options(&self) -> LexOptions {
        LexOptions {
            keep_comments: !self.strip_comments,
            keep_whitespace: true,
        }
    }
}
