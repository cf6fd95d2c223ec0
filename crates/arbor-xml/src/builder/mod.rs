//! Tree construction from a token stream.

/// Tree builder implementation.
pub mod core;

pub use self::core::{Forest, TreeBuilder};
