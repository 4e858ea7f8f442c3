//! Instances
//!
//! An instance is the live object behind a reconciled node. There are two
//! variants:
//!
//! - [`HostInstance`] wraps one backend widget and owns the wiring of its
//!   child slots.
//! - [`ComponentInstance`] has no backend presence of its own; it owns props,
//!   optional state, subscriptions and the subtree its last render produced.
//!
//! Instances live in the reconciler's arena and are addressed by
//! [`InstanceId`]. Ownership is strictly tree-shaped: every instance is owned
//! by exactly one parent slot or component subtree.

mod component;
mod host;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use component::{Component, ComponentInstance, FnComponent, Phase, Rendered, State};
pub use host::HostInstance;

use crate::tree::Kind;

/// Stable identity of a live instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Generate a new unique instance ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live instance.
#[derive(Debug)]
pub enum Instance {
    Host(HostInstance),
    Component(ComponentInstance),
}

impl Instance {
    pub fn kind(&self) -> &Kind {
        match self {
            Self::Host(host) => host.kind(),
            Self::Component(component) => component.kind(),
        }
    }

    /// Instances directly owned by this one.
    pub fn owned(&self) -> Vec<InstanceId> {
        match self {
            Self::Host(host) => host.owned().collect(),
            Self::Component(component) => component.owned().collect(),
        }
    }

    pub fn as_host(&self) -> Option<&HostInstance> {
        match self {
            Self::Host(host) => Some(host),
            Self::Component(_) => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentInstance> {
        match self {
            Self::Host(_) => None,
            Self::Component(component) => Some(component),
        }
    }

    pub(crate) fn as_host_mut(&mut self) -> Option<&mut HostInstance> {
        match self {
            Self::Host(host) => Some(host),
            Self::Component(_) => None,
        }
    }

    pub(crate) fn as_component_mut(&mut self) -> Option<&mut ComponentInstance> {
        match self {
            Self::Host(_) => None,
            Self::Component(component) => Some(component),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_ids_are_unique_and_ordered() {
        let first = InstanceId::new();
        let second = InstanceId::new();

        assert_ne!(first, second);
        assert!(first < second);
        assert_eq!(first.to_string(), format!("#{}", first.raw()));
    }
}
