//! Host signal dispatch with explicit detachment
//!
//! The host page owns an [`EventBus`] and feeds it scroll, resize, frame and
//! preference signals. Components install handlers with [`EventBus::listen`]
//! and get back a [`Subscription`]; dropping the animation graph means
//! calling [`Subscription::detach`] on every one of them.
//!
//! Dispatch is single-threaded and serialized: handlers for one kind run in
//! registration order, and a handler may attach or detach listeners while a
//! dispatch is in flight. A handler detached mid-dispatch does not run for
//! the remainder of that dispatch.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::page::{ElementId, Page};

/// Kinds of host signal a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Load,
    Scroll,
    Resize,
    OrientationChange,
    Frame,
    MotionPreference,
    Click,
}

/// A host signal
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Page finished loading
    Load,
    /// Scroll position changed (read the new value from the page)
    Scroll,
    /// Viewport resized
    Resize,
    OrientationChange,
    /// Animation frame callback with the frame timestamp
    Frame { now: f64 },
    /// The reduced-motion preference changed
    MotionPreference { reduced: bool },
    /// The user activated an element (anchor link, back-to-top control)
    Click { target: ElementId },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Load => EventKind::Load,
            Event::Scroll => EventKind::Scroll,
            Event::Resize => EventKind::Resize,
            Event::OrientationChange => EventKind::OrientationChange,
            Event::Frame { .. } => EventKind::Frame,
            Event::MotionPreference { .. } => EventKind::MotionPreference,
            Event::Click { .. } => EventKind::Click,
        }
    }
}

type Handler = dyn FnMut(&Event, &mut dyn Page);

struct Slot {
    id: u64,
    kind: EventKind,
    active: Rc<Cell<bool>>,
    handler: Rc<RefCell<Box<Handler>>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    slots: Vec<Slot>,
}

/// Registry of host-signal listeners
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler for one event kind
    pub fn listen<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: FnMut(&Event, &mut dyn Page) + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;

        let active = Rc::new(Cell::new(true));
        registry.slots.push(Slot {
            id,
            kind,
            active: active.clone(),
            handler: Rc::new(RefCell::new(Box::new(handler))),
        });

        Subscription {
            registry: Rc::downgrade(&self.inner),
            id,
            kind,
            active,
        }
    }

    /// Deliver an event to every active listener of its kind
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &Event, page: &mut dyn Page) -> usize {
        let kind = event.kind();
        let snapshot: Vec<_> = self
            .inner
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.kind == kind)
            .map(|slot| (slot.active.clone(), slot.handler.clone()))
            .collect();

        let mut invoked = 0;
        for (active, handler) in snapshot {
            if !active.get() {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut handler) => {
                    (handler)(event, page);
                    invoked += 1;
                }
                Err(_) => {
                    warn!(?kind, "Re-entrant dispatch skipped a running handler");
                }
            }
        }
        invoked
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.kind == kind)
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.inner.borrow().slots.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.total_listeners())
            .finish()
    }
}

/// Detachment handle for an installed listener
#[must_use = "a listener that is never detached leaks across teardown"]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    id: u64,
    kind: EventKind,
    active: Rc<Cell<bool>>,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Remove the listener from its bus
    pub fn detach(self) {
        self.active.set(false);
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().slots.retain(|slot| slot.id != self.id);
            debug!(kind = ?self.kind, id = self.id, "Listener detached");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("active", &self.active.get())
            .finish()
    }
}

/// Detach every handle in a set
pub fn detach_all(subscriptions: impl IntoIterator<Item = Subscription>) -> usize {
    let mut count = 0;
    for subscription in subscriptions {
        subscription.detach();
        count += 1;
    }
    count
}
