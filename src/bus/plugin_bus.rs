use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use arcstr::ArcStr;
use lru::LruCache;
use tracing::{debug, error, warn};

use super::requests::{RequestFailure, RequestRegistry};
use super::stats::StatsRegistry;
use super::subscriptions::{
	SubscriptionError, SubscriptionId, SubscriptionRegistry,
};
use super::worker::DeliveryPool;
use super::{EventBus, EventHandler, RequestHandler};
use crate::config::BusConfig;
use crate::event::{
	DeliveryMode, Event, EventData, SubscribeOptions, TopicStats,
};
use crate::topic::{PatternError, TopicPattern};

/// The event-dispatch engine: the one concrete [`EventBus`].
///
/// A single `PluginBus` is constructed by the host and handed to each
/// plugin by reference (typically as `Arc<PluginBus>` or
/// `Arc<dyn EventBus>`); the crate never installs a global instance.
///
/// All registries live behind their own locks, and no lock is ever held
/// across a handler invocation: dispatch snapshots the matching
/// subscriptions, releases the lock, then invokes. A slow handler can
/// therefore never stall subscribe/unsubscribe traffic from other
/// plugins.
pub struct PluginBus {
	subscriptions: RwLock<SubscriptionRegistry>,
	requests: RwLock<RequestRegistry>,
	stats: Mutex<StatsRegistry>,
	/// Parsed patterns for `matches_topic`, keyed by pattern string.
	/// Parse failures are cached too so a misspelled pattern polled in a
	/// loop does not re-parse every call.
	pattern_cache: Mutex<LruCache<String, Option<TopicPattern>>>,
	pool: DeliveryPool,
}

impl PluginBus {
	/// Creates a bus with default configuration.
	pub fn new() -> Self {
		Self::with_config(BusConfig::default())
	}

	/// Creates a bus with explicit configuration.
	pub fn with_config(config: BusConfig) -> Self {
		let cache_size = NonZeroUsize::new(config.pattern_cache_size.max(1))
			.expect("cache size is clamped to at least 1");
		Self {
			subscriptions: RwLock::new(SubscriptionRegistry::new()),
			requests: RwLock::new(RequestRegistry::new()),
			stats: Mutex::new(StatsRegistry::new()),
			pattern_cache: Mutex::new(LruCache::new(cache_size)),
			pool: DeliveryPool::spawn(config.delivery_workers),
		}
	}

	/// Selection, exclusion, ordering and invocation shared by `publish`
	/// and `publish_sync`.
	fn dispatch(
		&self,
		topic: &str,
		data: EventData,
		sender_id: &str,
		force_inline: bool,
	) -> usize {
		let event = std::sync::Arc::new(Event::new(topic, sender_id, data));

		let mut selected = {
			let registry = self.subscriptions.read().unwrap();
			registry.snapshot_for(topic)
			// Lock released here; unsubscribes from now on cannot retract
			// the deliveries below
		};

		selected.retain(|sub| {
			sub.options.receive_own_events
				|| sub.subscriber_id != event.sender_id
		});

		// Highest priority first; ties go to the earlier subscription
		selected.sort_by(|a, b| {
			b.options
				.priority
				.cmp(&a.options.priority)
				.then(a.id.cmp(&b.id))
		});

		let notified = selected.len();
		debug!(
			topic = %event.topic,
			notified,
			sync = force_inline,
			"Dispatching event"
		);

		for sub in selected {
			if !force_inline && sub.options.mode == DeliveryMode::Background
			{
				let event = std::sync::Arc::clone(&event);
				let handler = sub.handler;
				let id = sub.id;
				self.pool.submit(Box::new(move || {
					invoke_event_handler(&handler, &event, id);
				}));
			} else {
				invoke_event_handler(&sub.handler, &event, sub.id);
			}
		}

		self.stats
			.lock()
			.unwrap()
			.record(&event.topic, event.timestamp_ms);

		notified
	}
}

impl Default for PluginBus {
	fn default() -> Self {
		Self::new()
	}
}

/// Invokes a pub/sub handler with panic isolation.
///
/// A panicking handler is reported and forgotten; it never reaches the
/// publisher and never blocks delivery to the handlers after it.
fn invoke_event_handler(
	handler: &EventHandler,
	event: &Event,
	id: SubscriptionId,
) {
	if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
		error!(
			subscription_id = %id,
			topic = %event.topic,
			"Event handler panicked"
		);
	}
}

impl EventBus for PluginBus {
	fn publish(
		&self,
		topic: &str,
		data: EventData,
		sender_id: &str,
	) -> usize {
		self.dispatch(topic, data, sender_id, false)
	}

	fn publish_sync(
		&self,
		topic: &str,
		data: EventData,
		sender_id: &str,
	) -> usize {
		self.dispatch(topic, data, sender_id, true)
	}

	fn subscribe(
		&self,
		pattern: &str,
		subscriber_id: &str,
		handler: EventHandler,
		options: SubscribeOptions,
	) -> Result<SubscriptionId, PatternError> {
		let pattern = TopicPattern::parse(pattern)?;
		let id = self.subscriptions.write().unwrap().subscribe(
			pattern,
			ArcStr::from(subscriber_id),
			handler,
			options,
		);
		debug!(subscription_id = %id, subscriber = %subscriber_id, "Subscribed");
		Ok(id)
	}

	fn unsubscribe(&self, id: SubscriptionId) -> bool {
		match self.subscriptions.write().unwrap().unsubscribe(id) {
			| Ok(()) => true,
			| Err(SubscriptionError::NotFound { .. }) => false,
			| Err(err) => {
				warn!(subscription_id = %id, error = %err, "Unsubscribe failed");
				false
			}
		}
	}

	fn unsubscribe_all(&self, subscriber_id: &str) {
		let removed = self
			.subscriptions
			.write()
			.unwrap()
			.unsubscribe_all(subscriber_id);
		if removed > 0 {
			debug!(subscriber = %subscriber_id, removed, "Unsubscribed all");
		}
	}

	fn register_handler(
		&self,
		topic: &str,
		handler_id: &str,
		handler: RequestHandler,
	) -> bool {
		self.requests.write().unwrap().register(
			topic,
			ArcStr::from(handler_id),
			handler,
		)
	}

	fn unregister_handler(&self, topic: &str) -> bool {
		self.requests.write().unwrap().unregister(topic)
	}

	fn unregister_all_handlers(&self, handler_id: &str) {
		let removed =
			self.requests.write().unwrap().unregister_all(handler_id);
		if removed > 0 {
			debug!(owner = %handler_id, removed, "Unregistered all handlers");
		}
	}

	fn request(
		&self,
		topic: &str,
		data: EventData,
		sender_id: &str,
		timeout: Option<Duration>,
	) -> Option<EventData> {
		let handler = {
			let registry = self.requests.read().unwrap();
			registry.get(topic)
		};
		let Some(handler) = handler else {
			debug!(
				failure = %RequestFailure::NoHandler { topic: ArcStr::from(topic) },
				"Request not delivered"
			);
			return None;
		};

		let event = Event::new(topic, sender_id, data);
		match timeout {
			| None => invoke_request_handler(&handler, &event),
			| Some(bound) => {
				request_with_deadline(handler, event, bound)
			}
		}
	}

	fn has_handler(&self, topic: &str) -> bool {
		self.requests.read().unwrap().contains(topic)
	}

	fn subscriber_count(&self, topic: &str) -> usize {
		self.subscriptions.read().unwrap().count_matching(topic)
	}

	fn active_topics(&self) -> Vec<String> {
		self.stats.lock().unwrap().topics()
	}

	fn topic_stats(&self, topic: &str) -> TopicStats {
		let counters =
			self.stats.lock().unwrap().counters(topic).unwrap_or_default();
		TopicStats {
			topic: topic.to_string(),
			subscriber_count: self.subscriber_count(topic),
			event_count: counters.event_count,
			last_event_time_ms: counters.last_event_time_ms,
		}
	}

	fn subscriptions_for(&self, subscriber_id: &str) -> Vec<SubscriptionId> {
		self.subscriptions.read().unwrap().ids_for(subscriber_id)
	}

	fn matches_topic(&self, topic: &str, pattern: &str) -> bool {
		let mut cache = self.pattern_cache.lock().unwrap();
		if let Some(cached) = cache.get(pattern) {
			return cached
				.as_ref()
				.is_some_and(|parsed| parsed.matches(topic));
		}
		let parsed = TopicPattern::parse(pattern).ok();
		let matched =
			parsed.as_ref().is_some_and(|parsed| parsed.matches(topic));
		cache.put(pattern.to_string(), parsed);
		matched
	}
}

/// Runs a request handler on the caller's thread, panic-isolated.
fn invoke_request_handler(
	handler: &RequestHandler,
	event: &Event,
) -> Option<EventData> {
	match catch_unwind(AssertUnwindSafe(|| handler(event))) {
		| Ok(result) => Some(result),
		| Err(_) => {
			error!(
				failure = %RequestFailure::HandlerPanic {
					topic: event.topic.clone()
				},
				"Request not delivered"
			);
			None
		}
	}
}

/// Runs a request handler on a dedicated thread and waits at most
/// `bound` for its result.
///
/// On timeout the caller stops waiting and the thread detaches: the
/// handler keeps running to completion, and its late result is dropped
/// with the reply channel. The handler is never forcibly interrupted.
fn request_with_deadline(
	handler: RequestHandler,
	event: Event,
	bound: Duration,
) -> Option<EventData> {
	let (reply_tx, reply_rx) = sync_channel(1);
	let topic = event.topic.clone();

	let spawned = std::thread::Builder::new()
		.name("plugbus-request".to_string())
		.spawn(move || {
			match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
				| Ok(result) => {
					// The requester may have timed out and dropped the
					// receiving end; that is its way of discarding us
					let _ = reply_tx.send(result);
				}
				| Err(_) => {
					error!(
						failure = %RequestFailure::HandlerPanic {
							topic: event.topic.clone()
						},
						"Request not delivered"
					);
				}
			}
		});
	if let Err(err) = spawned {
		error!(topic = %topic, error = %err, "Failed to spawn request thread");
		return None;
	}

	match reply_rx.recv_timeout(bound) {
		| Ok(result) => Some(result),
		| Err(RecvTimeoutError::Timeout) => {
			warn!(
				failure = %RequestFailure::Timeout {
					topic,
					waited: bound
				},
				"Request not delivered"
			);
			None
		}
		// The handler panicked and the sender was dropped
		| Err(RecvTimeoutError::Disconnected) => None,
	}
}
