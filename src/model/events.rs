//! Typed in-process event bus for playback notifications
//!
//! Delivery is synchronous and in registration order. Handlers are snapshotted
//! before delivery starts, so a handler subscribed while an event is being
//! delivered only sees later events. Handlers may subscribe or unsubscribe from
//! inside a callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::types::Track;

#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    TrackChanged(Track),
    PlayStateChanged(bool),
}

impl PlaybackEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlaybackEvent::TrackChanged(_) => EventKind::TrackChanged,
            PlaybackEvent::PlayStateChanged(_) => EventKind::PlayStateChanged,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    TrackChanged,
    PlayStateChanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&PlaybackEvent) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&PlaybackEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                kind,
                handler: Arc::new(handler),
            });
        tracing::trace!(subscription = id.0, ?kind, "Subscribed");
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn publish(&self, event: PlaybackEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.handler.clone())
            .collect();

        tracing::trace!(?kind, receivers = handlers.len(), "Publishing event");
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::sample_track;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&PlaybackEvent) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for_factory = log.clone();
        let factory = move |name: &str| {
            let log = log_for_factory.clone();
            let name = name.to_string();
            Box::new(move |event: &PlaybackEvent| {
                log.lock().unwrap().push(format!("{name}:{event:?}"));
            }) as Box<dyn Fn(&PlaybackEvent) + Send + Sync>
        };
        (log, factory)
    }

    #[test]
    fn delivers_in_registration_order_to_matching_kind() {
        let bus = EventBus::new();
        let (log, handler) = recorder();
        bus.subscribe(EventKind::PlayStateChanged, handler("mini"));
        bus.subscribe(EventKind::TrackChanged, handler("tabs"));
        bus.subscribe(EventKind::PlayStateChanged, handler("full"));

        bus.publish(PlaybackEvent::PlayStateChanged(true));

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                "mini:PlayStateChanged(true)".to_string(),
                "full:PlayStateChanged(true)".to_string()
            ]
        );
    }

    #[test]
    fn unsubscribed_handler_stops_receiving() {
        let bus = EventBus::new();
        let (log, handler) = recorder();
        let id = bus.subscribe(EventKind::TrackChanged, handler("a"));

        bus.publish(PlaybackEvent::TrackChanged(sample_track(1)));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(PlaybackEvent::TrackChanged(sample_track(2)));

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn subscribing_during_delivery_does_not_deadlock() {
        let bus = EventBus::new();
        let inner_calls = Arc::new(AtomicU64::new(0));

        let bus_for_handler = bus.clone();
        let calls = inner_calls.clone();
        bus.subscribe(EventKind::PlayStateChanged, move |_| {
            let calls = calls.clone();
            bus_for_handler.subscribe(EventKind::PlayStateChanged, move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.publish(PlaybackEvent::PlayStateChanged(false));
        assert_eq!(inner_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(PlaybackEvent::PlayStateChanged(true));
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
    }
}
