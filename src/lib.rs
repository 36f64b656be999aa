//! # plugbus
//!
//! An in-process event bus for plugin hosts: decoupled communication
//! between independently loaded plugins over slash-segmented topics.
//!
//! ## Features
//!
//! - **Publish/Subscribe**: fire-and-forget broadcast with wildcard
//!   patterns (`*` one segment, `**` the rest)
//! - **Request/Response**: one handler per exact topic, optional wait
//!   bound, late results discarded
//! - **Priority delivery**: higher-priority subscriptions are invoked
//!   first, ties in registration order
//! - **Background or inline handlers**: per-subscription choice between
//!   worker-thread and publisher-thread invocation
//! - **Failure isolation**: a panicking handler is reported via
//!   `tracing` and never reaches the publisher or its sibling handlers
//! - **Introspection**: subscriber counts, per-topic publish statistics
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use plugbus::{EventBus, EventData, PluginBus, SubscribeOptions};
//!
//! let bus = Arc::new(PluginBus::new());
//! assert_eq!(bus.api_version(), plugbus::API_VERSION);
//!
//! // A plugin subscribes to every order event, delivered inline
//! let id = bus
//! 	.subscribe(
//! 		"orders/**",
//! 		"audit-plugin",
//! 		Arc::new(|event| {
//! 			println!("audit: {} at {}", event.topic, event.timestamp_ms);
//! 		}),
//! 		SubscribeOptions::inline(),
//! 	)
//! 	.unwrap();
//!
//! // Another plugin publishes; one subscriber is notified
//! let mut data = EventData::new();
//! data.insert("order_id".into(), serde_json::json!(17));
//! assert_eq!(bus.publish_sync("orders/created", data, "orders-plugin"), 1);
//!
//! bus.unsubscribe(id);
//! ```
//!
//! ## Pattern Matching
//!
//! Topics and patterns are `/`-segmented. A pattern segment is a literal,
//! `*` (exactly one arbitrary segment) or a trailing `**` (zero or more
//! segments). `orders/**` matches `orders`, `orders/created` and
//! `orders/created/urgent`; `orders/*` matches only the middle one.
//!
//! ## Ownership
//!
//! The host constructs one [`PluginBus`] and passes it to each plugin as
//! a shared handle; there is no hidden global. Dropping the bus discards
//! every registration without invoking any handler.

#![warn(missing_docs)]

// Core modules
pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod navigation;
pub mod topic;

// === Core Public API ===
// The capability surface and its engine
pub use bus::{
	EventBus, EventHandler, PluginBus, RequestHandler, SubscriptionId,
	API_VERSION,
};
// Event and option types handlers interact with
pub use event::{
	DeliveryMode, Event, EventData, SubscribeOptions, TopicStats,
};

// Construction settings
pub use config::BusConfig;

// Route-table collaborator
pub use navigation::RouteRegistry;

// Pattern handling (for manual pattern work)
pub use topic::{PatternError, TopicPattern};

/// Result type alias for operations that may fail with [`BusError`]
pub type Result<T> = std::result::Result<T, error::BusError>;

/// Prelude module for convenient imports
///
/// ```rust
/// use plugbus::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for typical bus usage

	pub use crate::{
		EventBus, EventData, PluginBus, SubscribeOptions, SubscriptionId,
	};
}

/// Error types used throughout the library
///
/// Re-exports all error types in one convenient location for error
/// handling.
pub mod errors {
	//! All error types used in the library

	pub use crate::bus::SubscriptionError;
	pub use crate::error::{BusError, BusResult, MatcherResult, PatternResult};
	pub use crate::topic::{MatcherError, PatternError};
}
