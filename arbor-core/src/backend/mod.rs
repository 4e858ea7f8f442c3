//! Toolkit Binding
//!
//! The [`Backend`] trait is the boundary to the concrete widget toolkit. The
//! reconciler never touches widgets directly: a [`HostInstance`] translates
//! prop changes into the primitive operations below.
//!
//! [`RecordingBackend`] is a headless implementation that records every
//! call. It backs the test suite and is useful for snapshotting what a
//! render would do.
//!
//! [`HostInstance`]: crate::instance::HostInstance

mod recording;

pub use recording::{BackendOp, Recorder, RecordingBackend};

use crate::error::Result;
use crate::tree::{Callback, Kind, PropValue};

/// Opaque handle to a backend widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetHandle(u64);

impl WidgetHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Opaque handle to a connected event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Primitive widget operations supplied by a toolkit binding.
pub trait Backend {
    /// Allocate a widget for a host kind.
    ///
    /// Fails with [`ReconcileError::Construction`](crate::ReconcileError::Construction)
    /// if the kind is not constructible.
    fn create_widget(&mut self, kind: &Kind) -> Result<WidgetHandle>;

    /// Set a property; `None` resets it to the toolkit default.
    fn set_property(
        &mut self,
        widget: WidgetHandle,
        name: &str,
        value: Option<&PropValue>,
    ) -> Result<()>;

    fn add_class(&mut self, widget: WidgetHandle, class: &str) -> Result<()>;

    fn remove_class(&mut self, widget: WidgetHandle, class: &str) -> Result<()>;

    /// Connect an event handler to `signal`.
    fn connect(
        &mut self,
        widget: WidgetHandle,
        signal: &str,
        handler: Callback,
    ) -> Result<HandlerId>;

    fn disconnect(&mut self, widget: WidgetHandle, handler: HandlerId);

    /// Attach `child` at `index` within `slot`.
    fn insert_child(
        &mut self,
        parent: WidgetHandle,
        slot: &str,
        index: usize,
        child: WidgetHandle,
    ) -> Result<()>;

    fn remove_child(&mut self, parent: WidgetHandle, slot: &str, child: WidgetHandle) -> Result<()>;

    /// Move an attached child to `index` within `slot`.
    fn move_child(
        &mut self,
        parent: WidgetHandle,
        slot: &str,
        child: WidgetHandle,
        index: usize,
    ) -> Result<()> {
        self.remove_child(parent, slot, child)?;
        self.insert_child(parent, slot, index, child)
    }

    /// Release a widget. The reconciler has already destroyed the instances
    /// owning its children.
    fn destroy_widget(&mut self, widget: WidgetHandle);
}
