//! User interaction tracking.
//!
//! The host UI feeds its input events into an [`ActivityBus`]. While a
//! session exists, an [`ActivityWatcher`] keeps one shared handler registered
//! for every [`ActivityKind`] and refreshes the last-activity timestamp.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::token_store::TokenStore;

/// Interaction signals treated as liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 6] = [
        ActivityKind::PointerDown,
        ActivityKind::PointerMove,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
        ActivityKind::Click,
    ];

    pub fn event_name(&self) -> &'static str {
        match self {
            ActivityKind::PointerDown => "pointerdown",
            ActivityKind::PointerMove => "pointermove",
            ActivityKind::KeyPress => "keypress",
            ActivityKind::Scroll => "scroll",
            ActivityKind::TouchStart => "touchstart",
            ActivityKind::Click => "click",
        }
    }
}

pub type ListenerId = u64;

pub type ActivityHandler = Arc<dyn Fn(ActivityKind) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: ListenerId,
    listeners: HashMap<ActivityKind, Vec<(ListenerId, ActivityHandler)>>,
}

/// Listener registry for interaction events. Clones share listeners.
#[derive(Clone, Default)]
pub struct ActivityBus {
    inner: Arc<Mutex<BusInner>>,
}

impl ActivityBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, kind: ActivityKind, handler: ActivityHandler) -> ListenerId {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.entry(kind).or_default().push((id, handler));
        id
    }

    pub fn remove_listener(&self, kind: ActivityKind, id: ListenerId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = inner.listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(listener_id, _)| *listener_id != id);
        before != list.len()
    }

    /// Deliver an event. Returns how many listeners ran.
    pub fn dispatch(&self, kind: ActivityKind) -> usize {
        // Handlers run outside the lock so they may touch the bus themselves
        let handlers: Vec<ActivityHandler> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner
                .listeners
                .get(&kind)
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        for handler in &handlers {
            handler(kind);
        }
        handlers.len()
    }

    pub fn listener_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.listeners.values().map(Vec::len).sum()
    }
}

/// Registration of the activity handler on a bus.
///
/// Listeners are removed by [`ActivityWatcher::detach`] or on drop.
pub struct ActivityWatcher {
    bus: ActivityBus,
    registrations: Vec<(ActivityKind, ListenerId)>,
}

impl ActivityWatcher {
    /// Attach to `bus` if the store holds a token; otherwise `None`.
    pub fn attach(bus: &ActivityBus, store: &TokenStore) -> Option<Self> {
        if !store.has_token() {
            debug!("No session token, activity watcher not attached");
            return None;
        }

        let touch_store = store.clone();
        let handler: ActivityHandler = Arc::new(move |_kind| touch_store.touch_activity());

        let registrations = ActivityKind::ALL
            .iter()
            .map(|&kind| (kind, bus.add_listener(kind, Arc::clone(&handler))))
            .collect();

        debug!("Activity watcher attached");
        Some(Self {
            bus: bus.clone(),
            registrations,
        })
    }

    pub fn is_attached(&self) -> bool {
        !self.registrations.is_empty()
    }

    pub fn detach(mut self) {
        self.remove_all();
    }

    fn remove_all(&mut self) {
        if self.registrations.is_empty() {
            return;
        }
        for (kind, id) in self.registrations.drain(..) {
            self.bus.remove_listener(kind, id);
        }
        debug!("Activity watcher detached");
    }
}

impl Drop for ActivityWatcher {
    fn drop(&mut self) {
        self.remove_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::{Clock, ManualClock};
    use crate::session::store::MemoryStore;
    use chrono::{Duration, Utc};

    fn store_with_clock() -> (TokenStore, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let store = TokenStore::new(Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
        (store, clock)
    }

    #[test]
    fn test_event_names() {
        let names: Vec<&str> = ActivityKind::ALL.iter().map(|k| k.event_name()).collect();
        assert_eq!(
            names,
            ["pointerdown", "pointermove", "keypress", "scroll", "touchstart", "click"]
        );
    }

    #[test]
    fn test_attach_requires_token() {
        let (store, _) = store_with_clock();
        let bus = ActivityBus::new();

        assert!(ActivityWatcher::attach(&bus, &store).is_none());
        assert_eq!(bus.listener_count(), 0);

        store.set_token("abc");
        let watcher = ActivityWatcher::attach(&bus, &store).unwrap();
        assert!(watcher.is_attached());
        assert_eq!(bus.listener_count(), ActivityKind::ALL.len());
    }

    #[test]
    fn test_events_refresh_activity() {
        let (store, clock) = store_with_clock();
        store.set_token("abc");
        let bus = ActivityBus::new();
        let _watcher = ActivityWatcher::attach(&bus, &store).unwrap();

        clock.advance(Duration::minutes(20));
        assert_eq!(bus.dispatch(ActivityKind::Click), 1);
        assert_eq!(store.get_last_activity(), Some(clock.now()));

        clock.advance(Duration::seconds(5));
        bus.dispatch(ActivityKind::Scroll);
        assert_eq!(store.get_last_activity(), Some(clock.now()));
    }

    #[test]
    fn test_detach_removes_every_listener() {
        let (store, clock) = store_with_clock();
        store.set_token("abc");
        let bus = ActivityBus::new();

        let watcher = ActivityWatcher::attach(&bus, &store).unwrap();
        watcher.detach();
        assert_eq!(bus.listener_count(), 0);

        clock.advance(Duration::minutes(1));
        assert_eq!(bus.dispatch(ActivityKind::KeyPress), 0);
        assert_eq!(store.get_last_activity(), None);
    }

    #[test]
    fn test_drop_detaches_and_cycles_do_not_leak() {
        let (store, _) = store_with_clock();
        store.set_token("abc");
        let bus = ActivityBus::new();

        for _ in 0..3 {
            let watcher = ActivityWatcher::attach(&bus, &store);
            assert_eq!(bus.listener_count(), ActivityKind::ALL.len());
            drop(watcher);
        }
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_remove_unknown_listener() {
        let bus = ActivityBus::new();
        assert!(!bus.remove_listener(ActivityKind::Click, 42));

        let id = bus.add_listener(ActivityKind::Click, Arc::new(|_| {}));
        assert!(!bus.remove_listener(ActivityKind::Scroll, id));
        assert!(bus.remove_listener(ActivityKind::Click, id));
    }
}
