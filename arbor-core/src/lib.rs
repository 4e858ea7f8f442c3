//! Arbor Core
//!
//! This crate provides the reconciliation engine behind the Arbor declarative
//! UI toolkit. It implements:
//!
//! - Declarative node trees tagged with host or component kinds
//! - Keyed diffing that reuses instances across renders
//! - Component lifecycle with observable-triggered re-render
//! - A narrow backend trait standing in for the widget toolkit
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `tree`: nodes, kinds, prop values, sibling keys and prop diffing
//! - `reactive`: observables and subscription bookkeeping
//! - `instance`: host and component instances
//! - `backend`: the toolkit boundary and a recording implementation
//! - `reconciler`: the differ, the instance arena and pass scheduling
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_core::{Kind, HostSpec, Node, Observable, Reconciler, RecordingBackend, Rendered};
//!
//! let label = Kind::host("Label", HostSpec::leaf());
//! let count = Observable::new(0_i64);
//!
//! let counter = Kind::component_fn("Counter", move |props, _| {
//!     let count = props.get("count").and_then(|v| v.observable::<i64>()).map(|c| c.get());
//!     Rendered::from(Node::new(&label).prop("text", count.unwrap_or_default().to_string()))
//! });
//!
//! let reconciler = Reconciler::new(RecordingBackend::new());
//! reconciler.render(Node::new(&counter).prop("count", count.clone()))?;
//!
//! // Re-renders Counter and updates the label text in place
//! count.set(1);
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod instance;
pub mod reactive;
pub mod reconciler;
pub mod tree;

pub use backend::{Backend, BackendOp, HandlerId, Recorder, RecordingBackend, WidgetHandle};
pub use config::{Config, ReentrancyPolicy};
pub use error::{ConfigError, ReconcileError, Result, StructuralError};
pub use instance::{Component, FnComponent, Instance, InstanceId, Phase, Rendered, State};
pub use reactive::{Observable, ObservableRef};
pub use reconciler::{ListenerId, Mount, Reconciler, Surface};
pub use tree::{Callback, ChildArity, HostSpec, Kind, Node, PropValue, Props};
