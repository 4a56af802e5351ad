//! Print Configuration
//!
//! Options that control how trees are rendered as text.
use crate::constants::{DEFAULT_INDENT, DEFAULT_MAX_WIDTH};
use crate::errors::TreeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_align() -> bool {
    false
}
fn default_relative() -> bool {
    false
}
fn default_max_width() -> usize {
    DEFAULT_MAX_WIDTH
}
fn default_indent() -> usize {
    DEFAULT_INDENT
}

/// Layout options for the tree printer.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct PrintOptions {
    /// Pad the branch labels of a node to a common width.
    #[serde(default = "default_align")]
    pub align: bool,
    /// Print the relative frequency of each class next to its count.
    #[serde(default = "default_relative")]
    pub relative: bool,
    /// Break lines before tokens that would pass this column.
    #[serde(default = "default_max_width")]
    pub max_width: usize,
    /// Indentation of branches relative to the opening brace.
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            align: default_align(),
            relative: default_relative(),
            max_width: default_max_width(),
            indent: default_indent(),
        }
    }
}

impl PrintOptions {
    pub fn aligned(mut self, align: bool) -> Self {
        self.align = align;
        self
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    pub fn with_max_width(mut self, max_width: usize) -> Self {
        self.max_width = max_width;
        self
    }

    /// Read options from a JSON document, missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        serde_json::from_str::<PrintOptions>(json).map_err(|e| TreeError::UnableToRead(e.to_string()))
    }

    /// Read options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TreeError> {
        let json = fs::read_to_string(path).map_err(|e| TreeError::UnableToRead(e.to_string()))?;
        Self::from_json(&json)
    }
}
