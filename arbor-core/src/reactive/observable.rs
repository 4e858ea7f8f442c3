//! Observable Implementation
//!
//! An Observable holds a value and a list of listeners. Listeners are plain
//! callbacks; there is no automatic dependency tracking. A component that
//! receives an observable as a prop (or owns one as state) subscribes its
//! re-render callback explicitly and releases it when it is destroyed.
//!
//! # Threading
//!
//! Observables are single-threaded (`Rc`/`RefCell`). Change notifications are
//! delivered synchronously on the thread that calls [`Observable::set`],
//! [`Observable::modify`] or [`Observable::notify`].
//!
//! # Re-entrancy
//!
//! The listener list is snapshotted before delivery, so a listener may
//! subscribe or unsubscribe (itself included) while being notified. Reading
//! the value from a listener is fine; calling `set` from inside a
//! [`Observable::with`] closure is not and will panic on the inner borrow.

use std::any::Any;
use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::subscription::SubscriptionToken;

/// Counter for generating unique observable IDs.
static OBSERVABLE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_observable_id() -> u64 {
    OBSERVABLE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type Listener = Rc<dyn Fn()>;

/// A value that notifies listeners when it changes.
///
/// Clones share the value and the listener list.
///
/// ```rust,ignore
/// let counter = Observable::new(0);
/// let token = counter.subscribe(|| println!("changed"));
///
/// counter.set(1); // prints "changed"
/// counter.set(1); // equal value, nothing happens
/// counter.unsubscribe(token);
/// ```
pub struct Observable<T: 'static> {
    id: u64,
    value: Rc<RefCell<T>>,
    listeners: Rc<RefCell<Vec<(SubscriptionToken, Listener)>>>,
}

impl<T: 'static> Observable<T> {
    /// Create a new observable with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_observable_id(),
            value: Rc::new(RefCell::new(value)),
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Get the observable's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value, notifying listeners only if it changed.
    ///
    /// Returns whether a notification was sent.
    pub fn set(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify();
        true
    }

    /// Mutate the value in place and always notify.
    ///
    /// Use this for containers whose contents change without the outer
    /// value being replaced.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.value.borrow_mut());
        self.notify();
        result
    }

    /// Register a listener. The returned token removes it again.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionToken
    where
        F: Fn() + 'static,
    {
        self.subscribe_rc(Rc::new(listener))
    }

    fn subscribe_rc(&self, listener: Listener) -> SubscriptionToken {
        let token = SubscriptionToken::new();
        self.listeners.borrow_mut().push((token, listener));
        token
    }

    /// Remove a listener. Unknown tokens are ignored.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        self.listeners.borrow_mut().retain(|(t, _)| *t != token);
    }

    /// Deliver a change notification to every listener.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in snapshot {
            listener();
        }
    }

    /// Get the number of listeners.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl<T: 'static> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Rc::clone(&self.value),
            listeners: Rc::clone(&self.listeners),
        }
    }
}

impl<T: Debug + 'static> Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.id)
            .field("value", &*self.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Type erasure
// ----------------------------------------------------------------------------

/// The change-notification capability of an observable, independent of its
/// value type. This is all the reconciler needs to know about one.
pub trait AnyObservable {
    /// Identity of the underlying observable (shared by clones).
    fn id(&self) -> u64;

    /// Register a listener.
    fn listen(&self, listener: Rc<dyn Fn()>) -> SubscriptionToken;

    /// Remove a listener.
    fn unlisten(&self, token: SubscriptionToken);

    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AnyObservable for Observable<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn listen(&self, listener: Rc<dyn Fn()>) -> SubscriptionToken {
        self.subscribe_rc(listener)
    }

    fn unlisten(&self, token: SubscriptionToken) {
        self.unsubscribe(token);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A shared, type-erased observable. Equality is identity.
#[derive(Clone)]
pub struct ObservableRef(Rc<dyn AnyObservable>);

impl ObservableRef {
    pub fn new(observable: impl AnyObservable + 'static) -> Self {
        Self(Rc::new(observable))
    }

    pub fn id(&self) -> u64 {
        self.0.id()
    }

    pub fn listen(&self, listener: Rc<dyn Fn()>) -> SubscriptionToken {
        self.0.listen(listener)
    }

    pub fn unlisten(&self, token: SubscriptionToken) {
        self.0.unlisten(token);
    }

    /// Recover the typed observable, if it holds a `T`.
    pub fn downcast<T: 'static>(&self) -> Option<Observable<T>> {
        self.0.as_any().downcast_ref::<Observable<T>>().cloned()
    }
}

impl<T: 'static> From<Observable<T>> for ObservableRef {
    fn from(observable: Observable<T>) -> Self {
        Self::new(observable)
    }
}

impl PartialEq for ObservableRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Debug for ObservableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObservableRef({})", self.id())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
