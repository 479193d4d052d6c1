//! Dispatch semantics of `EventBus`.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_events::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Message(&'static str);
impl Event for Message {}

/// Wraps a `Message` but is a distinct event type.
struct Envelope(Message);
impl Event for Envelope {}

impl From<Envelope> for Message {
    fn from(envelope: Envelope) -> Self {
        envelope.0
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn recorder(log: &Log, tag: &'static str) -> impl Fn(&Message) + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |message: &Message| log.lock().push(format!("{tag}:{}", message.0))
}

#[test]
fn callbacks_run_in_subscription_order() {
    let bus = EventBus::new();
    let log = log();
    bus.subscribe("x", recorder(&log, "c1"));
    bus.subscribe("x", recorder(&log, "c2"));

    assert_eq!(bus.post(&Message("hi")).unwrap(), 2);
    assert_eq!(*log.lock(), ["c1:hi", "c2:hi"]);
}

#[test]
fn identities_run_in_first_subscription_order() {
    let bus = EventBus::new();
    let log = log();
    bus.subscribe("b", recorder(&log, "b1"));
    bus.subscribe("a", recorder(&log, "a1"));
    bus.subscribe("b", recorder(&log, "b2"));

    bus.post(&Message("m")).unwrap();
    assert_eq!(*log.lock(), ["b1:m", "b2:m", "a1:m"]);
    assert_eq!(
        bus.subscribers(),
        [SubscriberId::named("b"), SubscriberId::named("a")]
    );
}

#[test]
fn posting_without_subscribers_is_a_noop() {
    let bus = EventBus::new();
    assert_eq!(bus.post(&Message("nobody")).unwrap(), 0);
}

#[test]
fn dispatch_matches_exact_type_only() {
    let bus = EventBus::new();
    let log = log();
    bus.subscribe("x", recorder(&log, "msg"));

    assert_eq!(bus.post(&Envelope(Message("wrapped"))).unwrap(), 0);
    assert!(log.lock().is_empty());

    let unwrapped: Message = Envelope(Message("unwrapped")).into();
    assert_eq!(bus.post(&unwrapped).unwrap(), 1);
    assert_eq!(*log.lock(), ["msg:unwrapped"]);
}

#[test]
fn unsubscribe_all_silences_identity() {
    let bus = EventBus::new();
    let log = log();
    bus.subscribe("x", recorder(&log, "x"));
    bus.subscribe("y", recorder(&log, "y"));
    let x = SubscriberId::named("x");

    assert_eq!(bus.unsubscribe(&x, None).unwrap(), 1);
    assert!(!bus.is_subscribed(&x, None));

    bus.post(&Message("after")).unwrap();
    assert_eq!(*log.lock(), ["y:after"]);
}

#[test]
fn unsubscribe_one_type_keeps_the_others() {
    let bus = EventBus::new();
    let log = log();
    let x = SubscriberId::named("x");
    bus.subscribe(x.clone(), recorder(&log, "msg"));
    let envelopes = Arc::clone(&log);
    bus.subscribe(x.clone(), move |_: &Envelope| {
        envelopes.lock().push("envelope".into());
    });

    bus.unsubscribe(&x, Some(EventTypeId::of::<Message>()))
        .unwrap();
    assert!(bus.is_subscribed(&x, Some(EventTypeId::of::<Envelope>())));
    assert!(!bus.is_subscribed(&x, Some(EventTypeId::of::<Message>())));

    bus.post(&Message("dropped")).unwrap();
    bus.post(&Envelope(Message("kept"))).unwrap();
    assert_eq!(*log.lock(), ["envelope"]);
}

#[test]
fn unsubscribing_unknown_identity_is_silent() {
    let bus = EventBus::new();
    bus.declare::<Message>();
    let ghost = SubscriberId::named("ghost");

    assert_eq!(bus.unsubscribe(&ghost, None).unwrap(), 0);
    assert_eq!(
        bus.unsubscribe(&ghost, Some(EventTypeId::of::<Message>()))
            .unwrap(),
        0
    );
}

#[test]
fn two_argument_callback_receives_its_identity() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    bus.subscribe("inst", move |id: &SubscriberId, message: &Message| {
        *sink.lock() = Some((id.clone(), message.clone()));
    });

    bus.post(&Message("payload")).unwrap();
    assert_eq!(
        *seen.lock(),
        Some((SubscriberId::named("inst"), Message("payload")))
    );
}

#[test]
fn zero_argument_callback_runs_without_the_event() {
    let bus = EventBus::new();
    let log = log();
    let sink = Arc::clone(&log);
    bus.subscribe::<Message, _>("x", move || sink.lock().push("signal".into()));

    bus.post(&Message("ignored")).unwrap();
    assert_eq!(*log.lock(), ["signal"]);
}

#[test]
fn duplicate_subscription_runs_twice() {
    let bus = EventBus::new();
    let log = log();
    let callback = recorder(&log, "dup");
    let callback = Arc::new(callback);
    let (a, b) = (Arc::clone(&callback), Arc::clone(&callback));
    bus.subscribe("x", move |m: &Message| a(m));
    bus.subscribe("x", move |m: &Message| b(m));

    assert_eq!(bus.post(&Message("m")).unwrap(), 2);
    assert_eq!(bus.subscription_count(), 2);
}

#[test]
fn first_failure_stops_dispatch() {
    let bus = EventBus::new();
    let log = log();
    bus.subscribe("a", recorder(&log, "before"));
    bus.subscribe("b", |_: &Message| -> Result<(), String> { Err("boom".into()) });
    bus.subscribe("c", recorder(&log, "after"));

    let err = bus.post(&Message("m")).unwrap_err();
    let EventError::CallbackFailed {
        subscriber, source, ..
    } = &err
    else {
        panic!("expected callback failure, got {err:?}");
    };
    assert_eq!(*subscriber, SubscriberId::named("b"));
    assert_eq!(source.to_string(), "boom");
    assert_eq!(*log.lock(), ["before:m"]);
    assert!(err.to_string().contains("failed for subscriber b"));
}

#[test]
fn callbacks_may_reenter_the_bus() {
    let bus = Arc::new(EventBus::new());
    let log = log();

    // Weak, so the callback stored in the bus does not keep the bus alive.
    let inner_bus = Arc::downgrade(&bus);
    let inner_log = Arc::clone(&log);
    bus.subscribe("outer", move |message: &Message| {
        let Some(inner_bus) = inner_bus.upgrade() else {
            return;
        };
        if message.0 == "first" {
            inner_bus.subscribe("late", recorder(&inner_log, "late"));
            inner_bus.post(&Message("nested")).unwrap();
            inner_bus.unsubscribe_all(&SubscriberId::named("outer"));
        }
    });

    assert_eq!(bus.post(&Message("first")).unwrap(), 1);
    assert_eq!(*log.lock(), ["late:nested"]);
    assert!(!bus.is_subscribed(&SubscriberId::named("outer"), None));

    assert_eq!(bus.post(&Message("second")).unwrap(), 1);
    assert_eq!(*log.lock(), ["late:nested", "late:second"]);

    let weak = Arc::downgrade(&bus);
    drop(bus);
    assert!(weak.upgrade().is_none());
}
