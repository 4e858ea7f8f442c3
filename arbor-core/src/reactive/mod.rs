//! Observables
//!
//! The reconciler consumes change notifications; it does not track
//! dependencies. Anything that can tell listeners "I changed" implements
//! [`AnyObservable`] and can be handed to a component as a prop or state.
//! [`Observable<T>`] is the stock implementation.
//!
//! A component subscribes its re-render callback to every observable prop and
//! to its state, and records the tokens in a [`Subscriptions`] registry that
//! releases them on destroy.

mod observable;
mod subscription;

pub use observable::{AnyObservable, Observable, ObservableRef};
pub use subscription::{SubscriptionSlot, SubscriptionToken, Subscriptions};
