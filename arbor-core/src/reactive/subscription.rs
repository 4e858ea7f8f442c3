//! Subscription bookkeeping.
//!
//! Each component instance owns a [`Subscriptions`] registry listing every
//! (observable, token) pair it holds. Dropping the registry releases them all,
//! so a destroyed instance can never be kept alive by a dangling listener.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::observable::ObservableRef;

/// Handle returned by a subscription, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Generate a new unique token.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriptionToken {
    fn default() -> Self {
        Self::new()
    }
}

/// What a subscription was made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionSlot {
    /// An observable passed as the named prop.
    Prop(String),
    /// The component's own state.
    State,
}

#[derive(Debug)]
struct Subscription {
    slot: SubscriptionSlot,
    observable: ObservableRef,
    token: SubscriptionToken,
}

/// An owned list of active subscriptions.
#[derive(Debug, Default)]
pub struct Subscriptions {
    entries: Vec<Subscription>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to `observable` on behalf of `slot`.
    ///
    /// Any previous subscription for the same slot is released first.
    pub fn track(
        &mut self,
        slot: SubscriptionSlot,
        observable: &ObservableRef,
        listener: Rc<dyn Fn()>,
    ) {
        self.release(&slot);
        let token = observable.listen(listener);
        self.entries.push(Subscription {
            slot,
            observable: observable.clone(),
            token,
        });
    }

    /// Release the subscription held for `slot`, if any.
    pub fn release(&mut self, slot: &SubscriptionSlot) {
        self.entries.retain(|entry| {
            if &entry.slot == slot {
                entry.observable.unlisten(entry.token);
                false
            } else {
                true
            }
        });
    }

    /// Release every subscription.
    pub fn release_all(&mut self) {
        for entry in self.entries.drain(..) {
            entry.observable.unlisten(entry.token);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observable;

    fn noop() -> Rc<dyn Fn()> {
        Rc::new(|| {})
    }

    #[test]
    fn tokens_are_unique() {
        let first = SubscriptionToken::new();
        let second = SubscriptionToken::new();
        assert_ne!(first, second);
    }

    #[test]
    fn track_replaces_previous_subscription_for_slot() {
        let first = Observable::new(0);
        let second = Observable::new(0);
        let mut subs = Subscriptions::new();

        subs.track(SubscriptionSlot::Prop("model".into()), &first.clone().into(), noop());
        subs.track(SubscriptionSlot::Prop("model".into()), &second.clone().into(), noop());

        assert_eq!(subs.len(), 1);
        assert_eq!(first.subscriber_count(), 0);
        assert_eq!(second.subscriber_count(), 1);
    }

    #[test]
    fn same_observable_in_two_slots_is_released_per_slot() {
        let shared = Observable::new(0);
        let erased: ObservableRef = shared.clone().into();
        let mut subs = Subscriptions::new();

        subs.track(SubscriptionSlot::Prop("a".into()), &erased, noop());
        subs.track(SubscriptionSlot::State, &erased, noop());
        assert_eq!(shared.subscriber_count(), 2);

        subs.release(&SubscriptionSlot::Prop("a".into()));
        assert_eq!(shared.subscriber_count(), 1);
    }

    #[test]
    fn drop_releases_everything() {
        let observable = Observable::new(0);
        {
            let mut subs = Subscriptions::new();
            subs.track(SubscriptionSlot::State, &observable.clone().into(), noop());
            assert_eq!(observable.subscriber_count(), 1);
        }
        assert_eq!(observable.subscriber_count(), 0);
    }
}
