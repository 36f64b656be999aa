use std::collections::HashMap;

use arcstr::ArcStr;

/// Stored counters for one exact topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TopicCounters {
	/// Publishes to this exact topic so far
	pub event_count: u64,
	/// Timestamp of the most recent publish, ms since the Unix epoch
	pub last_event_time_ms: i64,
}

/// Per-exact-topic publish counters.
///
/// Entries are created lazily on the first publish to a topic and live
/// until the bus is dropped. Queries never create entries. Wildcard
/// matches do not count: only the exact topic of a publish call is
/// recorded.
pub(crate) struct StatsRegistry {
	counters: HashMap<ArcStr, TopicCounters>,
}

impl StatsRegistry {
	pub fn new() -> Self {
		Self {
			counters: HashMap::new(),
		}
	}

	/// Records one publish to `topic` at `timestamp_ms`.
	pub fn record(&mut self, topic: &ArcStr, timestamp_ms: i64) {
		let entry = self.counters.entry(topic.clone()).or_default();
		entry.event_count += 1;
		entry.last_event_time_ms = timestamp_ms;
	}

	/// Counters for `topic`, if it has ever been published to.
	pub fn counters(&self, topic: &str) -> Option<TopicCounters> {
		self.counters.get(topic).copied()
	}

	/// Every topic with a recorded entry, sorted for deterministic
	/// listings.
	pub fn topics(&self) -> Vec<String> {
		let mut topics: Vec<String> =
			self.counters.keys().map(|t| t.to_string()).collect();
		topics.sort_unstable();
		topics
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_entries_appear_on_first_record() {
		let mut stats = StatsRegistry::new();
		assert!(stats.counters("orders/created").is_none());

		stats.record(&ArcStr::from("orders/created"), 100);
		stats.record(&ArcStr::from("orders/created"), 200);

		let counters = stats.counters("orders/created").unwrap();
		assert_eq!(counters.event_count, 2);
		assert_eq!(counters.last_event_time_ms, 200);
	}

	#[test]
	fn test_queries_do_not_create_entries() {
		let mut stats = StatsRegistry::new();
		assert!(stats.counters("never/published").is_none());
		assert!(stats.topics().is_empty());

		stats.record(&ArcStr::from("b"), 1);
		stats.record(&ArcStr::from("a"), 2);
		assert_eq!(stats.topics(), vec!["a".to_string(), "b".to_string()]);
	}
}
