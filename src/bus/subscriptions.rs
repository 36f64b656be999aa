#![allow(clippy::missing_docs_in_private_items)]
use std::collections::HashMap;

use arcstr::ArcStr;
use thiserror::Error;

use crate::bus::EventHandler;
use crate::event::SubscribeOptions;
use crate::topic::{MatcherError, MatcherNode, TopicPattern};

/// Errors that can occur during subscription registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
	/// Subscription with the given ID was not found
	#[error("Subscription {id} not found")]
	NotFound { id: SubscriptionId },

	/// The id table and the matcher tree disagree about a subscription
	#[error("Subscription registry out of sync: {0}")]
	OutOfSync(#[from] MatcherError),
}

impl SubscriptionError {
	/// Creates a new NotFound error
	pub fn not_found(id: SubscriptionId) -> Self {
		Self::NotFound { id }
	}
}

/// A subscription identifier.
///
/// Generated from a monotonic counter, so ascending id order equals
/// creation order. Unique among the subscriptions of one bus instance.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "sub-{}", self.0)
	}
}

/// A stored subscription: everything dispatch needs to deliver one event.
struct StoredSubscription {
	subscriber_id: ArcStr,
	handler: EventHandler,
	options: SubscribeOptions,
}

/// What dispatch clones out of the registry before releasing the lock.
///
/// Holding only `Arc` handles, so the registry can mutate freely while
/// these deliveries run.
#[derive(Clone)]
pub(crate) struct DeliverySnapshot {
	pub id: SubscriptionId,
	pub subscriber_id: ArcStr,
	pub handler: EventHandler,
	pub options: SubscribeOptions,
}

type SubscriptionTable = HashMap<SubscriptionId, StoredSubscription>;

/// Record kept outside the matcher tree, for id- and owner-based lookups.
struct SubscriptionRecord {
	pattern: TopicPattern,
	subscriber_id: ArcStr,
}

/// The pub/sub subscription store: a pattern trie of handler tables plus
/// an id side table.
///
/// Not synchronized itself; the bus wraps it in an `RwLock` and never
/// holds that lock across a handler invocation.
pub(crate) struct SubscriptionRegistry {
	matcher: MatcherNode<SubscriptionTable>,
	records: HashMap<SubscriptionId, SubscriptionRecord>,
	next_id: u64,
}

impl SubscriptionRegistry {
	pub fn new() -> Self {
		Self {
			matcher: MatcherNode::new(),
			records: HashMap::new(),
			next_id: 0,
		}
	}

	/// Stores a subscription under its pattern and returns the fresh id.
	/// Duplicate patterns are allowed; every call creates a new entry.
	pub fn subscribe(
		&mut self,
		pattern: TopicPattern,
		subscriber_id: ArcStr,
		handler: EventHandler,
		options: SubscribeOptions,
	) -> SubscriptionId {
		let id = SubscriptionId(self.next_id);
		self.next_id = self.next_id.wrapping_add(1);

		self.matcher.insert(&pattern).insert(
			id,
			StoredSubscription {
				subscriber_id: subscriber_id.clone(),
				handler,
				options,
			},
		);
		self.records.insert(
			id,
			SubscriptionRecord {
				pattern,
				subscriber_id,
			},
		);
		id
	}

	/// Removes a subscription. `NotFound` for unknown (or already
	/// removed) ids.
	pub fn unsubscribe(
		&mut self,
		id: SubscriptionId,
	) -> Result<(), SubscriptionError> {
		let record = self
			.records
			.remove(&id)
			.ok_or_else(|| SubscriptionError::not_found(id))?;
		self.matcher.update(record.pattern.slice(), |table| {
			table.remove(&id);
		})?;
		Ok(())
	}

	/// Removes every subscription owned by `subscriber_id`; returns how
	/// many were removed.
	pub fn unsubscribe_all(&mut self, subscriber_id: &str) -> usize {
		let ids = self.ids_for(subscriber_id);
		let mut removed = 0;
		for id in ids {
			match self.unsubscribe(id) {
				| Ok(()) => removed += 1,
				| Err(err) => {
					tracing::warn!(
						subscription_id = %id,
						error = %err,
						"Inconsistent entry while removing subscriber"
					);
				}
			}
		}
		removed
	}

	/// Clones out every subscription whose pattern matches `topic`.
	pub fn snapshot_for(&self, topic: &str) -> Vec<DeliverySnapshot> {
		self.matcher
			.find_matching(topic)
			.into_iter()
			.flat_map(|table| table.iter())
			.map(|(id, stored)| DeliverySnapshot {
				id: *id,
				subscriber_id: stored.subscriber_id.clone(),
				handler: stored.handler.clone(),
				options: stored.options,
			})
			.collect()
	}

	/// Number of subscriptions whose pattern matches `topic`.
	pub fn count_matching(&self, topic: &str) -> usize {
		self.matcher
			.find_matching(topic)
			.into_iter()
			.map(|table| table.len())
			.sum()
	}

	/// Ids owned by `subscriber_id`, in subscription creation order.
	pub fn ids_for(&self, subscriber_id: &str) -> Vec<SubscriptionId> {
		let mut ids: Vec<SubscriptionId> = self
			.records
			.iter()
			.filter(|(_, record)| record.subscriber_id == subscriber_id)
			.map(|(id, _)| *id)
			.collect();
		ids.sort_unstable();
		ids
	}
}
