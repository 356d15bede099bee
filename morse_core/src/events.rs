// Observer plumbing shared by the sequencer and the orchestrator.
//
// Listeners are called synchronously, in subscription order, from inside
// `tick()` and the setters. A listener cannot borrow the component that is
// emitting to it; to pause or stop from inside a callback, capture a
// `ControlHandle` instead. The request is honoured before the emitting call
// returns and nothing is rescheduled after it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Numeric form handed across the WASM boundary.
    pub(crate) fn raw(&self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        SubscriptionId(raw)
    }
}

type Listener<E> = Box<dyn FnMut(&E)>;

/// Ordered list of listeners for one event type.
pub struct Emitter<E> {
    listeners: Vec<(SubscriptionId, Listener<E>)>,
    next_id: u64,
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Emitter {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if the id was not (or no longer) subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Lifecycle request raised from inside a listener. Ordered by strength: a
/// stronger pending request is never downgraded by a weaker one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ControlRequest {
    Pause,
    Stop,
    Destroy,
}

/// Cloneable handle for pausing, stopping or destroying a component from a
/// context that cannot borrow it, such as its own listeners.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    pending: Rc<Cell<Option<ControlRequest>>>,
}

impl ControlHandle {
    pub fn pause(&self) {
        self.request(ControlRequest::Pause);
    }

    pub fn stop(&self) {
        self.request(ControlRequest::Stop);
    }

    pub fn destroy(&self) {
        self.request(ControlRequest::Destroy);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    fn request(&self, request: ControlRequest) {
        let strongest = match self.pending.get() {
            Some(existing) => existing.max(request),
            None => request,
        };
        self.pending.set(Some(strongest));
    }

    pub(crate) fn take(&self) -> Option<ControlRequest> {
        self.pending.take()
    }
}
