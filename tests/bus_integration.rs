//! End-to-end bus behavior across threads
//!
//! Covers the contract points that only show up with a real bus instance:
//! delivery ordering, registration visibility, request timeouts, publish
//! statistics and registry consistency under concurrent mutation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use plugbus::{
	BusConfig, EventBus, EventData, PluginBus, SubscribeOptions,
};

/// Opt-in test logging: RUST_LOG=debug cargo test -- --nocapture
fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "warn".into()),
		)
		.with_test_writer()
		.try_init();
}

fn empty() -> EventData {
	EventData::new()
}

#[test]
fn test_background_delivery_preserves_priority_order() {
	init_tracing();
	// Single delivery worker: background jobs run in scheduling order
	let bus = PluginBus::with_config(BusConfig::with_workers(1));
	let (tx, rx) = mpsc::channel();

	for (name, priority) in [("low", 1), ("high", 10), ("mid", 5)] {
		let tx = tx.clone();
		bus.subscribe(
			"orders/*",
			name,
			Arc::new(move |_event| {
				tx.send(name).unwrap();
			}),
			SubscribeOptions::default().with_priority(priority),
		)
		.unwrap();
	}

	assert_eq!(bus.publish("orders/created", empty(), ""), 3);

	let order: Vec<&str> = (0 .. 3)
		.map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
		.collect();
	assert_eq!(order, vec!["high", "mid", "low"]);
}

#[test]
fn test_publish_does_not_wait_for_background_handlers() {
	init_tracing();
	let bus = PluginBus::new();
	let gate = Arc::new(AtomicBool::new(false));
	let done = Arc::new(AtomicBool::new(false));

	{
		let gate = Arc::clone(&gate);
		let done = Arc::clone(&done);
		bus.subscribe(
			"jobs/slow",
			"slow-plugin",
			Arc::new(move |_event| {
				while !gate.load(Ordering::SeqCst) {
					thread::sleep(Duration::from_millis(1));
				}
				done.store(true, Ordering::SeqCst);
			}),
			SubscribeOptions::default(),
		)
		.unwrap();
	}

	// Returns although the handler is still parked on the gate
	assert_eq!(bus.publish("jobs/slow", empty(), ""), 1);
	assert!(!done.load(Ordering::SeqCst));

	gate.store(true, Ordering::SeqCst);
	let deadline = std::time::Instant::now() + Duration::from_secs(2);
	while !done.load(Ordering::SeqCst) {
		assert!(std::time::Instant::now() < deadline, "handler never ran");
		thread::sleep(Duration::from_millis(1));
	}
}

#[test]
fn test_unsubscribe_takes_effect_immediately() {
	init_tracing();
	let bus = PluginBus::new();
	let calls = Arc::new(AtomicUsize::new(0));

	let id = {
		let calls = Arc::clone(&calls);
		bus.subscribe(
			"orders/*",
			"p1",
			Arc::new(move |_event| {
				calls.fetch_add(1, Ordering::SeqCst);
			}),
			SubscribeOptions::inline(),
		)
		.unwrap()
	};

	bus.publish_sync("orders/created", empty(), "");
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(bus.subscriptions_for("p1"), vec![id]);

	assert!(bus.unsubscribe(id));
	assert!(!bus.unsubscribe(id)); // Second removal reports false

	assert_eq!(bus.publish_sync("orders/created", empty(), ""), 0);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(bus.subscriptions_for("p1").is_empty());
}

#[test]
fn test_unsubscribe_all_silences_one_owner() {
	init_tracing();
	let bus = PluginBus::new();
	let calls = Arc::new(AtomicUsize::new(0));

	for pattern in ["orders/*", "orders/**", "billing/*"] {
		let calls = Arc::clone(&calls);
		bus.subscribe(
			pattern,
			"p1",
			Arc::new(move |_event| {
				calls.fetch_add(1, Ordering::SeqCst);
			}),
			SubscribeOptions::inline(),
		)
		.unwrap();
	}
	{
		let calls = Arc::clone(&calls);
		bus.subscribe(
			"orders/*",
			"p2",
			Arc::new(move |_event| {
				calls.fetch_add(1, Ordering::SeqCst);
			}),
			SubscribeOptions::inline(),
		)
		.unwrap();
	}

	bus.unsubscribe_all("p1");
	assert!(bus.subscriptions_for("p1").is_empty());
	assert_eq!(bus.subscriptions_for("p2").len(), 1);

	// Only p2's subscription still matches
	assert_eq!(bus.publish_sync("orders/created", empty(), ""), 1);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_request_handler_lifecycle() {
	init_tracing();
	let bus = PluginBus::new();

	assert!(!bus.has_handler("config/get"));
	assert!(bus.register_handler(
		"config/get",
		"h1",
		Arc::new(|_event| {
			let mut result = EventData::new();
			result.insert("value".into(), serde_json::json!("dark"));
			result
		})
	));
	// Second owner is refused while the topic is bound
	assert!(!bus.register_handler(
		"config/get",
		"h2",
		Arc::new(|_event| EventData::new())
	));
	assert!(bus.has_handler("config/get"));

	let result = bus.request("config/get", empty(), "", None).unwrap();
	assert_eq!(result.get("value"), Some(&serde_json::json!("dark")));

	assert!(bus.unregister_handler("config/get"));
	assert!(bus.register_handler(
		"config/get",
		"h2",
		Arc::new(|_event| EventData::new())
	));
}

#[test]
fn test_request_timeout_discards_late_result() {
	init_tracing();
	let bus = PluginBus::new();
	let completed = Arc::new(AtomicBool::new(false));

	{
		let completed = Arc::clone(&completed);
		bus.register_handler(
			"reports/build",
			"reports-plugin",
			Arc::new(move |_event| {
				thread::sleep(Duration::from_millis(200));
				completed.store(true, Ordering::SeqCst);
				EventData::new()
			}),
		);
	}

	// The bound is far below the handler latency: empty result
	let result = bus.request(
		"reports/build",
		empty(),
		"",
		Some(Duration::from_millis(20)),
	);
	assert!(result.is_none());
	assert!(!completed.load(Ordering::SeqCst));

	// The handler still runs to completion afterwards
	let deadline = std::time::Instant::now() + Duration::from_secs(2);
	while !completed.load(Ordering::SeqCst) {
		assert!(
			std::time::Instant::now() < deadline,
			"handler was interrupted"
		);
		thread::sleep(Duration::from_millis(5));
	}

	// And a generous bound gets the real result
	let result = bus.request(
		"reports/build",
		empty(),
		"",
		Some(Duration::from_secs(5)),
	);
	assert!(result.is_some());
}

#[test]
fn test_topic_stats_count_exact_publishes() {
	init_tracing();
	let bus = PluginBus::new();
	let last_seen = Arc::new(Mutex::new(0_i64));

	{
		let last_seen = Arc::clone(&last_seen);
		bus.subscribe(
			"metrics/**",
			"collector",
			Arc::new(move |event| {
				*last_seen.lock().unwrap() = event.timestamp_ms;
			}),
			SubscribeOptions::inline(),
		)
		.unwrap();
	}

	for _ in 0 .. 5 {
		bus.publish_sync("metrics/cpu", empty(), "");
	}

	let stats = bus.topic_stats("metrics/cpu");
	assert_eq!(stats.event_count, 5);
	assert_eq!(stats.subscriber_count, 1);
	// publish_sync completed, so the handler saw the last event already
	assert_eq!(stats.last_event_time_ms, *last_seen.lock().unwrap());

	// A wildcard match of another topic must not touch metrics/cpu stats
	bus.publish_sync("metrics/mem", empty(), "");
	assert_eq!(bus.topic_stats("metrics/cpu").event_count, 5);

	assert_eq!(
		bus.active_topics(),
		vec!["metrics/cpu".to_string(), "metrics/mem".to_string()]
	);

	// Querying an unpublished topic returns defaults, creates nothing
	let unpublished = bus.topic_stats("metrics/disk");
	assert_eq!(unpublished.event_count, 0);
	assert_eq!(unpublished.subscriber_count, 1); // metrics/** still matches
	assert_eq!(bus.active_topics().len(), 2);
}

#[test]
fn test_matcher_surface_agrees_with_contract() {
	init_tracing();
	let bus = PluginBus::new();
	assert!(bus.matches_topic("orders/created", "orders/*"));
	assert!(!bus.matches_topic("orders/created/urgent", "orders/*"));
	assert!(bus.matches_topic("orders/created/urgent", "orders/**"));
	assert!(bus.matches_topic("orders", "orders/**"));
}

#[test]
fn test_concurrent_churn_leaves_a_consistent_registry() {
	init_tracing();
	let bus = Arc::new(PluginBus::new());
	let writers = 4;
	let rounds = 50;

	let mut handles = Vec::new();
	for writer in 0 .. writers {
		let bus = Arc::clone(&bus);
		handles.push(thread::spawn(move || {
			let owner = format!("plugin-{writer}");
			let mut kept = 0_usize;
			for round in 0 .. rounds {
				let id = bus
					.subscribe(
						"stress/*",
						&owner,
						Arc::new(|_event| {}),
						SubscribeOptions::default(),
					)
					.unwrap();
				// Keep every third subscription, drop the rest
				if round % 3 == 0 {
					kept += 1;
				} else {
					assert!(bus.unsubscribe(id));
				}
			}
			kept
		}));
	}
	// Publishers run against the same topic while the registry churns
	for _ in 0 .. 2 {
		let bus = Arc::clone(&bus);
		handles.push(thread::spawn(move || {
			for _ in 0 .. rounds {
				bus.publish("stress/event", EventData::new(), "");
			}
			0
		}));
	}

	let kept_total: usize =
		handles.into_iter().map(|h| h.join().unwrap()).sum();

	assert_eq!(bus.subscriber_count("stress/event"), kept_total);
	let per_owner: usize = (0 .. writers)
		.map(|w| bus.subscriptions_for(&format!("plugin-{w}")).len())
		.sum();
	assert_eq!(per_owner, kept_total);
	assert_eq!(bus.topic_stats("stress/event").event_count, 2 * rounds as u64);
}
