//! Ordered, synchronous event dispatch.
//!
//! A generalization of the message parser's `on`/`once`/`off`/`emit`
//! surface: registration order is preserved, `emit` dispatches over a
//! snapshot of the listener list taken before any callback runs (so a
//! callback that calls `off` only affects listeners that have not yet fired
//! *and* future emits — not other listeners already snapshotted for the
//! current emit), and `once` listeners are dropped after their single
//! invocation.
//!
//! Because Rust closures have no stable notion of equality, removal is
//! handle-based ([`ListenerId`]) rather than by comparing callback values.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::error::ParseError;

/// Discriminant identifying an [`Event`] variant, used as the `EventEmitter`
/// registration key so listeners can subscribe to one kind of event without
/// matching on the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ReqMethod,
    ReqUri,
    Version,
    StatusCode,
    Reason,
    HeaderName,
    HeaderValue,
    StartlineComplete,
    HeadersComplete,
    Data,
    MessageComplete,
    Error,
}

/// Every payload a [`crate::MessageParser`] can emit, in the order listed in
/// the data model: `req_method`/`req_uri`/`version` (requests) or
/// `version`/`status_code`/`reason` (responses), `startline_complete`, then
/// repeated `header_name`/`header_value` pairs, `headers_complete`, then
/// zero or more `data` events from the body processor, then
/// `message_complete`. `error` fires at most once per run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ReqMethod(String),
    ReqUri(String),
    Version(u8, u8),
    StatusCode(u16),
    Reason(String),
    HeaderName(String),
    HeaderValue(String),
    StartlineComplete,
    HeadersComplete,
    Data(Vec<u8>),
    MessageComplete,
    Error(ParseError),
}

impl Event {
    /// The [`EventKind`] this payload was emitted under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ReqMethod(_) => EventKind::ReqMethod,
            Self::ReqUri(_) => EventKind::ReqUri,
            Self::Version(..) => EventKind::Version,
            Self::StatusCode(_) => EventKind::StatusCode,
            Self::Reason(_) => EventKind::Reason,
            Self::HeaderName(_) => EventKind::HeaderName,
            Self::HeaderValue(_) => EventKind::HeaderValue,
            Self::StartlineComplete => EventKind::StartlineComplete,
            Self::HeadersComplete => EventKind::HeadersComplete,
            Self::Data(_) => EventKind::Data,
            Self::MessageComplete => EventKind::MessageComplete,
            Self::Error(_) => EventKind::Error,
        }
    }
}

/// Opaque handle returned by [`EventEmitter::on`]/[`EventEmitter::once`],
/// used to remove a listener via [`EventEmitter::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener<E> {
    id: ListenerId,
    once: bool,
    callback: Box<dyn FnMut(&E)>,
}

/// A synchronous event emitter keyed by an event-kind discriminant `K`,
/// dispatching payloads of type `E`.
pub struct EventEmitter<K, E> {
    listeners: HashMap<K, Vec<Listener<E>>>,
    next_id: u64,
    // Ids removed via `off` while their list was taken out of `listeners`
    // for dispatch (i.e. `emit` is mid-flight for that kind). Consulted and
    // cleared at the end of the `emit` call that caused the removal to miss
    // its target.
    pending_removals: HashSet<ListenerId>,
}

impl<K, E> EventEmitter<K, E>
where
    K: Eq + Hash + Copy,
{
    /// Create an emitter with no registered listeners.
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
            pending_removals: HashSet::new(),
        }
    }

    fn next_listener_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a listener that fires on every future `emit(kind, _)`.
    pub fn on(&mut self, kind: K, callback: Box<dyn FnMut(&E)>) -> ListenerId {
        let id = self.next_listener_id();
        self.listeners.entry(kind).or_default().push(Listener {
            id,
            once: false,
            callback,
        });
        id
    }

    /// Register a listener that fires once, then is removed automatically.
    pub fn once(&mut self, kind: K, callback: Box<dyn FnMut(&E)>) -> ListenerId {
        let id = self.next_listener_id();
        self.listeners.entry(kind).or_default().push(Listener {
            id,
            once: true,
            callback,
        });
        id
    }

    /// Remove a previously-registered listener. No-op if `id` is not
    /// currently registered for `kind` (e.g. it was a `once` listener that
    /// already fired).
    pub fn off(&mut self, kind: K, id: ListenerId) {
        if let Some(list) = self.listeners.get_mut(&kind) {
            list.retain(|l| l.id != id);
        } else {
            // `kind`'s listeners are either empty or currently taken out
            // for an in-flight `emit` -- record the removal so it still
            // takes effect once that dispatch finishes.
            self.pending_removals.insert(id);
        }
    }

    /// Handles of every currently-registered listener for `kind`, in
    /// registration order.
    pub fn listeners(&self, kind: K) -> Vec<ListenerId> {
        self.listeners
            .get(&kind)
            .map(|v| v.iter().map(|l| l.id).collect())
            .unwrap_or_default()
    }

    /// Number of listeners currently registered for `kind`.
    pub fn listener_count(&self, kind: K) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Dispatch `event` to every listener registered for `kind`, in
    /// registration order, then drop any `once` listeners that fired.
    ///
    /// Listeners are dispatched from a snapshot taken before the first
    /// callback runs: a callback that calls [`EventEmitter::off`] or
    /// registers new listeners for the same `kind` only affects listeners
    /// that have not yet fired in this call, and future calls to `emit`.
    pub fn emit(&mut self, kind: K, event: &E) {
        let taken = self.listeners.remove(&kind).unwrap_or_default();
        let mut remaining = Vec::with_capacity(taken.len());
        for mut listener in taken {
            if self.pending_removals.remove(&listener.id) {
                continue;
            }
            (listener.callback)(event);
            if !listener.once {
                remaining.push(listener);
            }
        }

        // Merge in anything a callback registered for `kind` during this
        // dispatch (it landed in a fresh map entry, since we removed the
        // live one above) -- those listeners apply to future emits only.
        if let Some(added_during_dispatch) = self.listeners.remove(&kind) {
            remaining.extend(added_during_dispatch);
        }

        // A callback may have called `off` for a listener whose kind-entry
        // was taken out above, missing its target; apply it here instead.
        remaining.retain(|l| !self.pending_removals.contains(&l.id));
        self.pending_removals.clear();

        if !remaining.is_empty() {
            self.listeners.insert(kind, remaining);
        }
    }
}

impl<K, E> Default for EventEmitter<K, E>
where
    K: Eq + Hash + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        A,
        B,
    }

    #[test]
    fn on_listener_fires_every_emit() {
        let calls = Rc::new(RefCell::new(0));
        let mut emitter: EventEmitter<Kind, i32> = EventEmitter::new();
        let calls2 = calls.clone();
        emitter.on(
            Kind::A,
            Box::new(move |_| {
                *calls2.borrow_mut() += 1;
            }),
        );
        emitter.emit(Kind::A, &1);
        emitter.emit(Kind::A, &2);
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let calls = Rc::new(RefCell::new(0));
        let mut emitter: EventEmitter<Kind, i32> = EventEmitter::new();
        let calls2 = calls.clone();
        emitter.once(
            Kind::A,
            Box::new(move |_| {
                *calls2.borrow_mut() += 1;
            }),
        );
        emitter.emit(Kind::A, &1);
        emitter.emit(Kind::A, &2);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn off_removes_a_listener() {
        let calls = Rc::new(RefCell::new(0));
        let mut emitter: EventEmitter<Kind, i32> = EventEmitter::new();
        let calls2 = calls.clone();
        let id = emitter.on(
            Kind::A,
            Box::new(move |_| {
                *calls2.borrow_mut() += 1;
            }),
        );
        emitter.off(Kind::A, id);
        emitter.emit(Kind::A, &1);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut emitter: EventEmitter<Kind, i32> = EventEmitter::new();
        let o1 = order.clone();
        emitter.on(Kind::A, Box::new(move |_| o1.borrow_mut().push(1)));
        let o2 = order.clone();
        emitter.on(Kind::A, Box::new(move |_| o2.borrow_mut().push(2)));
        let o3 = order.clone();
        emitter.on(Kind::A, Box::new(move |_| o3.borrow_mut().push(3)));
        emitter.emit(Kind::A, &0);
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn removal_during_dispatch_only_affects_future_emits() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut emitter: EventEmitter<Kind, i32> = EventEmitter::new();

        let o2 = order.clone();
        let id_two = emitter.on(Kind::A, Box::new(move |_| o2.borrow_mut().push(2)));

        // Listener 1 only records that listener 2 should be removed; the
        // removal itself happens on the outer `emitter` handle once `emit`
        // has returned, proving a same-dispatch removal request doesn't
        // reach backwards into the emit that's already in flight.
        let order1 = order.clone();
        let remove_requested = Rc::new(RefCell::new(false));
        let remove_requested_clone = remove_requested.clone();
        emitter.on(
            Kind::A,
            Box::new(move |_| {
                order1.borrow_mut().push(1);
                *remove_requested_clone.borrow_mut() = true;
            }),
        );

        emitter.emit(Kind::A, &0);
        // Listener 2 was registered before listener 1, so both fire in this
        // first emit; listener 1 only requested the removal, it didn't
        // reach into the in-flight dispatch to perform it.
        assert_eq!(*order.borrow(), vec![2, 1]);
        assert!(*remove_requested.borrow());

        emitter.off(Kind::A, id_two);

        order.borrow_mut().clear();
        emitter.emit(Kind::A, &0);
        // Listener 2 no longer fires on subsequent emits.
        assert_eq!(*order.borrow(), vec![1]);
    }

    #[test]
    fn listener_count_and_listeners() {
        let mut emitter: EventEmitter<Kind, i32> = EventEmitter::new();
        assert_eq!(emitter.listener_count(Kind::B), 0);
        let id = emitter.on(Kind::B, Box::new(|_| {}));
        assert_eq!(emitter.listener_count(Kind::B), 1);
        assert_eq!(emitter.listeners(Kind::B), vec![id]);
    }
}
