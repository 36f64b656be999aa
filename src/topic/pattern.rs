use std::slice::Iter;

use arcstr::{ArcStr, Substr};
use thiserror::Error;

/// One segment of a parsed topic pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternItem {
	/// Literal segment, matches only an identical topic segment
	Literal(Substr),
	/// `*`, matches exactly one arbitrary segment
	Single,
	/// `**`, matches the remainder of the topic (zero or more segments);
	/// only valid as the final pattern segment
	Multi,
}

/// Error types for topic pattern parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
	/// Empty or all-whitespace pattern
	#[error("Topic pattern cannot be empty")]
	Empty,

	/// `**` used somewhere other than the final segment
	#[error(
		"Invalid topic pattern '{pattern}': ** wildcard can only be the \
		 last segment"
	)]
	MultiPosition { pattern: String },

	/// `*` or `**` embedded inside a literal segment
	#[error("Invalid wildcard usage in segment '{segment}'")]
	WildcardUsage { segment: String },
}

impl PatternError {
	/// Creates a new MultiPosition error
	pub fn multi_position(pattern: impl Into<String>) -> Self {
		Self::MultiPosition {
			pattern: pattern.into(),
		}
	}

	/// Creates a new WildcardUsage error
	pub fn wildcard_usage(segment: impl Into<String>) -> Self {
		Self::WildcardUsage {
			segment: segment.into(),
		}
	}
}

impl PatternItem {
	/// The segment as it appears in the pattern string.
	pub fn as_str(&self) -> &str {
		match self {
			| PatternItem::Literal(s) => s,
			| PatternItem::Single => "*",
			| PatternItem::Multi => "**",
		}
	}
}

impl std::fmt::Display for PatternItem {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl TryFrom<Substr> for PatternItem {
	type Error = PatternError;

	fn try_from(item: Substr) -> Result<Self, Self::Error> {
		let res = match item.as_str() {
			| "*" => PatternItem::Single,
			| "**" => PatternItem::Multi,
			| _ if item.contains('*') => {
				return Err(PatternError::wildcard_usage(item.as_str()));
			}
			| _ => PatternItem::Literal(item),
		};
		Ok(res)
	}
}

/// A validated, parsed topic pattern.
///
/// Patterns are `/`-separated segments, each a literal, `*` (exactly one
/// segment) or `**` (the rest of the topic, final position only). Matching
/// is case-sensitive with no normalization; a pattern without wildcards
/// matches only the identical topic string.
#[derive(Debug, Clone)]
pub struct TopicPattern {
	pattern: ArcStr,
	segments: Vec<PatternItem>,
}

impl TopicPattern {
	/// Parses and validates a pattern string.
	///
	/// Rejects empty patterns, `**` anywhere but the final segment, and
	/// wildcards embedded inside a literal segment (`a*b`).
	pub fn parse(pattern: impl Into<ArcStr>) -> Result<Self, PatternError> {
		let pattern = pattern.into();
		if pattern.is_empty() || pattern.trim().is_empty() {
			return Err(PatternError::Empty);
		}

		let segments: Result<Vec<_>, _> = pattern
			.split('/')
			.map(|s| pattern.substr_from(s))
			.map(PatternItem::try_from)
			.collect();
		let segments = segments?;

		if let Some(multi_pos) = segments
			.iter()
			.position(|s| matches!(*s, PatternItem::Multi))
		{
			if multi_pos != segments.len() - 1 {
				return Err(PatternError::multi_position(pattern.as_str()));
			}
		}

		Ok(Self { pattern, segments })
	}

	/// The original pattern string.
	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// Parsed segments in pattern order.
	pub fn slice(&self) -> &[PatternItem] {
		&self.segments
	}

	/// Iterator over the parsed segments.
	pub fn iter(&self) -> Iter<'_, PatternItem> {
		self.segments.iter()
	}

	/// Number of pattern segments.
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	/// True for patterns with no segments (never produced by `parse`).
	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Tests whether a concrete topic satisfies this pattern.
	///
	/// Walks both segment lists in lockstep; `**` accepts the remainder of
	/// the topic, including an empty remainder, so `a/**` matches `a`.
	pub fn matches(&self, topic: &str) -> bool {
		let mut topic_segments = topic.split('/');
		for item in &self.segments {
			match item {
				| PatternItem::Literal(expected) => {
					match topic_segments.next() {
						| Some(found) if found == expected.as_str() => {}
						| _ => return false,
					}
				}
				| PatternItem::Single => {
					if topic_segments.next().is_none() {
						return false;
					}
				}
				| PatternItem::Multi => return true,
			}
		}
		topic_segments.next().is_none()
	}
}

impl std::fmt::Display for TopicPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.pattern)
	}
}

/// Tests a topic against a pattern string in one call.
///
/// Invalid patterns (empty, misplaced `**`, embedded wildcard) match
/// nothing.
pub fn matches(topic: &str, pattern: &str) -> bool {
	match TopicPattern::parse(pattern) {
		| Ok(parsed) => parsed.matches(topic),
		| Err(_) => false,
	}
}
