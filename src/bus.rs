//! The event bus capability surface and its dispatch engine
//!
//! [`EventBus`] is the fixed contract plugins program against;
//! [`PluginBus`] is the one engine behind it. Hosts construct a
//! `PluginBus`, check [`API_VERSION`], and hand the instance to each
//! plugin at initialization.

use std::sync::Arc;
use std::time::Duration;

// Submodules
pub mod plugin_bus;
pub mod requests;
pub mod stats;
pub mod subscriptions;
pub mod worker;

pub use plugin_bus::PluginBus;
pub use subscriptions::{SubscriptionError, SubscriptionId};

use crate::event::{Event, EventData, SubscribeOptions, TopicStats};
use crate::topic::PatternError;

/// Version of the bus contract.
///
/// A host verifies this value before relying on the interface and treats
/// a mismatch as a load-time error.
pub const API_VERSION: u32 = 3;

/// Callback invoked with each delivered pub/sub event.
///
/// Stored by the bus for the subscription's lifetime and possibly invoked
/// from a delivery worker thread, hence `Send + Sync`.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Callback serving a request; its return value is the response.
pub type RequestHandler = Arc<dyn Fn(&Event) -> EventData + Send + Sync>;

/// Inter-plugin communication over topics.
///
/// Three interaction modes: fire-and-forget publish/subscribe with
/// wildcard patterns, request/response with at most one handler per exact
/// topic, and introspection queries. Expected absence (no subscribers, no
/// handler, timeout) is always a sentinel return, never an error; handler
/// failures are isolated at the dispatch boundary and reported through
/// `tracing`.
pub trait EventBus: Send + Sync {
	/// Broadcasts an event; background subscriptions are scheduled
	/// without waiting for them. Returns the number of subscriptions
	/// notified, not the number of handlers that have completed.
	fn publish(&self, topic: &str, data: EventData, sender_id: &str)
		-> usize;

	/// Broadcasts an event and blocks until every matched handler has
	/// run (or failed), in priority order, regardless of each
	/// subscription's delivery mode. Same count semantics as `publish`.
	fn publish_sync(
		&self,
		topic: &str,
		data: EventData,
		sender_id: &str,
	) -> usize;

	/// Registers a handler for a topic pattern. Always succeeds for a
	/// valid pattern (duplicates allowed); invalid patterns are rejected
	/// here, before they reach the registry.
	fn subscribe(
		&self,
		pattern: &str,
		subscriber_id: &str,
		handler: EventHandler,
		options: SubscribeOptions,
	) -> Result<SubscriptionId, PatternError>;

	/// Removes one subscription. False if the id is unknown or already
	/// removed; a delivery already underway is not retracted.
	fn unsubscribe(&self, id: SubscriptionId) -> bool;

	/// Removes every subscription owned by `subscriber_id`.
	fn unsubscribe_all(&self, subscriber_id: &str);

	/// Binds a request handler to an exact topic (no wildcards). False
	/// if the topic is already bound; the existing entry is untouched.
	fn register_handler(
		&self,
		topic: &str,
		handler_id: &str,
		handler: RequestHandler,
	) -> bool;

	/// Unbinds the request handler for a topic. False if none was bound.
	fn unregister_handler(&self, topic: &str) -> bool;

	/// Unbinds every request handler owned by `handler_id`.
	fn unregister_all_handlers(&self, handler_id: &str);

	/// Sends a request to the exact topic's handler and waits for its
	/// response.
	///
	/// `None` timeout waits without bound. With a bound, the caller's
	/// wait is limited to that duration: on expiry the call returns
	/// `None` and any eventually-produced result is discarded; the
	/// handler itself is never interrupted. `None` is also the answer
	/// when no handler is registered or the handler fails.
	fn request(
		&self,
		topic: &str,
		data: EventData,
		sender_id: &str,
		timeout: Option<Duration>,
	) -> Option<EventData>;

	/// Whether a request handler is bound to the exact topic.
	fn has_handler(&self, topic: &str) -> bool;

	/// Number of subscriptions whose pattern currently matches `topic`.
	fn subscriber_count(&self, topic: &str) -> usize;

	/// Distinct exact topics published at least once on this bus, in
	/// sorted order. Subscription patterns do not appear here.
	fn active_topics(&self) -> Vec<String>;

	/// Stored counters for the exact topic plus a live subscriber count.
	/// Topics never published return zeroed stats without creating an
	/// entry.
	fn topic_stats(&self, topic: &str) -> TopicStats;

	/// Subscription ids owned by `subscriber_id`, in creation order.
	fn subscriptions_for(&self, subscriber_id: &str) -> Vec<SubscriptionId>;

	/// Exposes the topic matcher directly: does `topic` satisfy
	/// `pattern`? Invalid patterns match nothing.
	fn matches_topic(&self, topic: &str, pattern: &str) -> bool;

	/// The bus contract version this implementation exposes.
	fn api_version(&self) -> u32 {
		API_VERSION
	}
}
