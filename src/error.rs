//! Error types and utilities for the bus
//!
//! Composite error type plus per-module Result aliases. Individual error
//! enums live next to the code that raises them; this module only
//! aggregates them for callers that want a single error type.

use thiserror::Error;

use crate::bus::SubscriptionError;
use crate::topic::{MatcherError, PatternError};

/// Comprehensive error type for all bus operations
///
/// Note that most of the public surface deliberately does not return
/// errors: absence of subscribers or handlers, and request timeouts, are
/// sentinel values by contract. What remains is pattern validation and
/// registry consistency.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
	/// Topic pattern parsing or validation error
	#[error("Topic pattern error: {0}")]
	Pattern(#[from] PatternError),

	/// Matcher tree operation error
	#[error("Topic matcher error: {0}")]
	Matcher(#[from] MatcherError),

	/// Subscription registry operation error
	#[error("Subscription error: {0}")]
	Subscription(#[from] SubscriptionError),
}

/// Convenient Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Convenient Result type for pattern operations
pub type PatternResult<T> = Result<T, PatternError>;

/// Convenient Result type for matcher operations
pub type MatcherResult<T> = Result<T, MatcherError>;
