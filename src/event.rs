//! Event payload and subscription option types
//!
//! Everything a handler sees crosses this module: the [`Event`] envelope,
//! the untyped [`EventData`] payload, and the per-subscription delivery
//! options. Events are transient: built once per dispatch, handed to
//! handlers by reference, never stored by the bus.

use std::time::{SystemTime, UNIX_EPOCH};

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

/// Untyped key-value event payload.
///
/// A mapping from string keys to JSON-like variant values (null, bool,
/// number, string, list, nested map). The bus never inspects or validates
/// payload contents.
pub type EventData = serde_json::Map<String, serde_json::Value>;

/// A single event travelling through the bus.
///
/// Created per `publish`/`request` call with the current timestamp.
/// Callers and handlers only ever see copies or references; the bus keeps
/// no event history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
	/// Topic the event was published to (exact, no wildcards)
	pub topic: ArcStr,
	/// Identity of the publishing plugin; may be empty
	pub sender_id: ArcStr,
	/// Event payload
	pub data: EventData,
	/// Milliseconds since the Unix epoch, set at creation
	pub timestamp_ms: i64,
}

impl Event {
	/// Builds an event stamped with the current wall-clock time.
	pub fn new(
		topic: impl Into<ArcStr>,
		sender_id: impl Into<ArcStr>,
		data: EventData,
	) -> Self {
		Self {
			topic: topic.into(),
			sender_id: sender_id.into(),
			data,
			timestamp_ms: now_ms(),
		}
	}
}

/// How a subscription's handler is invoked during `publish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeliveryMode {
	/// Scheduled on the delivery pool; `publish` does not wait for it
	#[default]
	Background,
	/// Invoked on the publisher's thread before `publish` returns
	Inline,
}

/// Per-subscription delivery options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeOptions {
	/// Background (default) or inline invocation
	pub mode: DeliveryMode,
	/// Higher priority handlers are delivered first
	pub priority: i32,
	/// Deliver events whose sender equals this subscription's owner
	pub receive_own_events: bool,
}

impl Default for SubscribeOptions {
	fn default() -> Self {
		Self {
			mode: DeliveryMode::Background,
			priority: 0,
			receive_own_events: false,
		}
	}
}

impl SubscribeOptions {
	/// Options for inline (synchronous) delivery at default priority.
	pub fn inline() -> Self {
		Self {
			mode: DeliveryMode::Inline,
			..Self::default()
		}
	}

	/// Sets the delivery priority.
	pub fn with_priority(mut self, priority: i32) -> Self {
		self.priority = priority;
		self
	}

	/// Also deliver the subscriber's own events back to it.
	pub fn with_own_events(mut self) -> Self {
		self.receive_own_events = true;
		self
	}
}

/// Point-in-time statistics for one exact topic.
///
/// `subscriber_count` is recomputed at query time from the current
/// subscription set; the event counters accumulate from the first publish
/// to this exact topic until the bus is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicStats {
	/// The exact topic these stats describe
	pub topic: String,
	/// Subscriptions whose pattern currently matches the topic
	pub subscriber_count: usize,
	/// Number of `publish`/`publish_sync` calls with this exact topic
	pub event_count: u64,
	/// Timestamp of the most recent such call, ms since the Unix epoch
	pub last_event_time_ms: i64,
}

pub(crate) fn now_ms() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as i64)
		.unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_event_carries_current_timestamp() {
		let before = now_ms();
		let event = Event::new("orders/created", "orders-plugin", EventData::new());
		let after = now_ms();
		assert!(event.timestamp_ms >= before && event.timestamp_ms <= after);
		assert_eq!(event.topic, "orders/created");
		assert_eq!(event.sender_id, "orders-plugin");
		assert!(event.data.is_empty());
	}

	#[test]
	fn test_default_options_match_contract() {
		let options = SubscribeOptions::default();
		assert_eq!(options.mode, DeliveryMode::Background);
		assert_eq!(options.priority, 0);
		assert!(!options.receive_own_events);
	}

	#[test]
	fn test_event_round_trips_through_serde() {
		let mut data = EventData::new();
		data.insert("count".into(), serde_json::json!(3));
		data.insert("tags".into(), serde_json::json!(["a", "b"]));
		let event = Event::new("orders/created", "", data);

		let json = serde_json::to_string(&event).unwrap();
		let back: Event = serde_json::from_str(&json).unwrap();
		assert_eq!(back.topic, event.topic);
		assert_eq!(back.data, event.data);
		assert_eq!(back.timestamp_ms, event.timestamp_ms);
	}
}
