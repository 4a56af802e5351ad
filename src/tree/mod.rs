pub mod aggregate;
pub mod predict;
pub mod tree;

pub use predict::Inference;
pub use tree::{Target, Tree};
