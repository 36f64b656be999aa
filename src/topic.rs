//! Topic handling module
//!
//! Parsing and validation of topic patterns, and the segment trie used to
//! resolve which patterns match a published topic.

// Submodules
pub mod matcher;
pub mod pattern;


// Re-export commonly used types for convenience
pub use matcher::{IsEmpty, MatcherError, MatcherNode};
pub use pattern::{matches, PatternError, PatternItem, TopicPattern};
