//! Declarative Trees
//!
//! This module defines what callers build: [`Node`] values tagged with a
//! [`Kind`] and carrying a [`Props`] map.
//!
//! # Reserved props
//!
//! - `key`: explicit sibling identity (see [`derive_key`]).
//! - `ref`: callback receiving the instance once it is created.
//! - `children` and a host kind's inflatable slots: node lists, resolved to
//!   widgets before a host widget sees them.
//!
//! Host kinds additionally interpret `class_names` and `on_<signal>`.

mod key;
mod kind;
mod node;
mod props;
mod value;

pub use key::{derive_key, derive_keys, index_by_key};
pub use kind::{ChildArity, HostSpec, Kind, KindClass};
pub use node::{is_reserved, Node, Props, CHILDREN, CLASS_NAMES, KEY, REF, SIGNAL_PREFIX};
pub use props::{diff_props, initial_changes, Change, Changeset};
pub use value::{Callback, PropValue, RefCallback};
