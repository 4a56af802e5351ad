// Modules
pub mod attributes;
pub mod config;
pub mod constants;
pub mod errors;
pub mod format;
pub mod node;
pub mod rules;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use attributes::{Attribute, AttributeSet, AttributeType, Value};
pub use config::PrintOptions;
pub use errors::{ParseError, ParseErrorKind, TreeError};
pub use format::{parse, ParseOutcome, Scanner};
pub use node::{Branch, Prediction};
pub use rules::{Condition, Rule, RuleSet, RuleSink};
pub use tree::{Inference, Target, Tree};

#[cfg(test)]
mod testing;
