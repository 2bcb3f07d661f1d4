//! Synchronous listener registry used to wire stream notifications.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    hash::Hash,
    rc::Rc,
};

/// A notification that can be dispatched through a [`Notifier`].
pub trait Event {
    /// The key listeners subscribe to.
    type Kind: Copy + Eq + Hash + fmt::Debug;

    /// Returns the key of this event.
    fn kind(&self) -> Self::Kind;
}

/// Identifies a subscribed listener.
///
/// The identifier returned by [`Notifier::subscribe_once`] also removes the listener before it fires.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Slot<E> {
    id: ListenerId,
    once: bool,
    fired: Cell<bool>,
    listener: Box<dyn Fn(&E)>,
}

/// A registry of listeners keyed by event kind.
///
/// Every method takes `&self`, so listeners may subscribe or unsubscribe while an event is being
/// dispatched. Dispatch always runs over the listeners registered when [`emit`](Self::emit) was called.
pub struct Notifier<E: Event> {
    listeners: RefCell<HashMap<E::Kind, Vec<Rc<Slot<E>>>>>,
    next_id: Cell<u64>,
}

impl<E: Event> Default for Notifier<E> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<E: Event> Notifier<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, kind: E::Kind, once: bool, listener: Box<dyn Fn(&E)>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(Rc::new(Slot {
                id,
                once,
                fired: Cell::new(false),
                listener,
            }));
        id
    }

    /// Registers `listener` for every event of `kind`.
    pub fn subscribe(&self, kind: E::Kind, listener: impl Fn(&E) + 'static) -> ListenerId {
        self.insert(kind, false, Box::new(listener))
    }

    /// Registers `listener` for the next event of `kind` only.
    pub fn subscribe_once(&self, kind: E::Kind, listener: impl Fn(&E) + 'static) -> ListenerId {
        self.insert(kind, true, Box::new(listener))
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, kind: E::Kind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(slots) = listeners.get_mut(&kind) else {
            return false;
        };
        let Some(index) = slots.iter().rposition(|slot| slot.id == id) else {
            return false;
        };
        slots.remove(index);
        if slots.is_empty() {
            listeners.remove(&kind);
        }
        true
    }

    /// Dispatches `event` to its listeners. Returns `false` if there were none.
    pub fn emit(&self, event: &E) -> bool {
        let kind = event.kind();
        let snapshot: Vec<Rc<Slot<E>>> = match self.listeners.borrow().get(&kind) {
            Some(slots) if !slots.is_empty() => slots.clone(),
            _ => return false,
        };
        for slot in snapshot {
            if slot.once {
                if slot.fired.replace(true) {
                    continue;
                }
                self.unsubscribe(kind, slot.id);
            }
            (slot.listener)(event);
        }
        true
    }

    /// Returns the number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners.borrow().get(&kind).map_or(0, Vec::len)
    }
}

impl<E: Event> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let listeners = self.listeners.borrow();
        f.debug_map()
            .entries(listeners.iter().map(|(kind, slots)| (kind, slots.len())))
            .finish()
    }
}
