use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::pattern::{PatternItem, TopicPattern};

/// Errors that can occur while updating the matcher tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
	/// A pattern path led to a branch that does not exist
	#[error("No matcher entry under segment '{segment}'")]
	PathNotFound { segment: String },
}

impl MatcherError {
	/// Creates a new PathNotFound error
	pub fn path_not_found(segment: impl Into<String>) -> Self {
		Self::PathNotFound {
			segment: segment.into(),
		}
	}
}

/// Payloads the matcher can prune once they hold nothing.
pub trait IsEmpty {
	/// True when the payload holds no entries
	fn is_empty(&self) -> bool;
}

impl<T> IsEmpty for HashSet<T> {
	fn is_empty(&self) -> bool {
		self.is_empty()
	}
}

impl<K, V> IsEmpty for HashMap<K, V> {
	fn is_empty(&self) -> bool {
		self.is_empty()
	}
}

/// Node in the pattern matching tree, one per pattern segment position.
///
/// Each node can carry a payload for patterns ending here (`exact_data`),
/// a payload for a trailing `**` (`multi_data`, terminal by pattern
/// validation), and children for the next segment: one per literal plus a
/// single shared `*` child.
#[derive(Debug)]
pub struct MatcherNode<T> {
	/// Payload for patterns whose final segment lands on this node
	exact_data: Option<T>,

	/// Children for literal next segments
	literal_children: HashMap<String, MatcherNode<T>>,

	/// Child for a `*` next segment
	single_child: Option<Box<MatcherNode<T>>>,

	/// Payload for a trailing `**` at this position
	multi_data: Option<T>,
}

impl<T: Default + IsEmpty> Default for MatcherNode<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Default + IsEmpty> MatcherNode<T> {
	/// Creates a new empty matcher node
	pub fn new() -> Self {
		Self {
			exact_data: None,
			literal_children: HashMap::new(),
			single_child: None,
			multi_data: None,
		}
	}

	/// True once no payload and no children remain anywhere below.
	pub fn is_empty(&self) -> bool {
		self.exact_data.as_ref().is_none_or(T::is_empty)
			&& self.literal_children.is_empty()
			&& self.single_child.is_none()
			&& self.multi_data.as_ref().is_none_or(T::is_empty)
	}

	/// Finds or creates the payload slot for the given pattern.
	pub fn insert(&mut self, pattern: &TopicPattern) -> &mut T {
		let mut current = self;

		for segment in pattern.iter() {
			match segment {
				| PatternItem::Literal(s) => {
					current = current
						.literal_children
						.entry(s.to_string())
						.or_insert_with(MatcherNode::new)
				}
				| PatternItem::Single => {
					current = current
						.single_child
						.get_or_insert_with(|| Box::new(MatcherNode::new()))
				}
				| PatternItem::Multi => {
					// ** is the last segment by validation, so this slot is it
					return current.multi_data.get_or_insert_with(T::default);
				}
			}
		}
		current.exact_data.get_or_insert_with(T::default)
	}

	/// Applies `f` to the payload stored under the given pattern path,
	/// pruning branches that end up empty. Returns whether this subtree
	/// emptied as a result.
	pub fn update<F>(
		&mut self,
		pattern_items: &[PatternItem],
		mut f: F,
	) -> Result<bool, MatcherError>
	where
		F: FnMut(&mut T),
	{
		if pattern_items.is_empty() {
			let data = self
				.exact_data
				.as_mut()
				.ok_or_else(|| MatcherError::path_not_found("<end>"))?;
			f(data);
			if data.is_empty() {
				self.exact_data = None
			}
			return Ok(self.is_empty());
		}
		let current_segment = &pattern_items[0];
		let rest_segments = &pattern_items[1 ..];

		match current_segment {
			| PatternItem::Literal(s) => {
				let child =
					self.literal_children.get_mut(s.as_str()).ok_or_else(
						|| MatcherError::path_not_found(s.as_str()),
					)?;
				if child.update(rest_segments, f)? {
					self.literal_children.remove(s.as_str());
					return Ok(self.is_empty());
				}
			}
			| PatternItem::Single => {
				let child = self
					.single_child
					.as_mut()
					.ok_or_else(|| MatcherError::path_not_found("*"))?;
				if child.update(rest_segments, f)? {
					self.single_child = None;
					return Ok(self.is_empty());
				}
			}
			| PatternItem::Multi => {
				let data = self
					.multi_data
					.as_mut()
					.ok_or_else(|| MatcherError::path_not_found("**"))?;
				f(data);
				if data.is_empty() {
					self.multi_data = None;
					return Ok(self.is_empty());
				}
			}
		}
		Ok(false)
	}

	/// Recursively collects payloads of every pattern matching the topic
	/// segments
	fn collect_matching<'a>(
		&'a self,
		topic_segments: &[&str],
		matching: &mut Vec<&'a T>,
	) {
		match topic_segments {
			| [] => {
				// End of topic: patterns ending here and trailing ** both
				// match (** accepts an empty remainder)
				self.exact_data.iter().for_each(|data| matching.push(data));
				self.multi_data.iter().for_each(|data| matching.push(data))
			}
			| [segment, remaining @ ..] => {
				if let Some(child) = self.literal_children.get(*segment) {
					child.collect_matching(remaining, matching);
				}
				self.single_child.iter().for_each(|child| {
					child.collect_matching(remaining, matching)
				});
				// ** swallows the rest of the topic
				self.multi_data.iter().for_each(|data| matching.push(data));
			}
		}
	}

	/// Collects the payloads of all patterns matching the given topic.
	pub fn find_matching<'a>(&'a self, topic: &str) -> Vec<&'a T> {
		let topic_segments: Vec<&str> = topic.split('/').collect();
		let mut matching = Vec::new();
		self.collect_matching(&topic_segments, &mut matching);
		matching
	}
}
