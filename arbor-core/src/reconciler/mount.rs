//! Mounting
//!
//! A [`Mount`] keeps the root's surfaced widgets attached to a top-level
//! [`Surface`] (a window, a dialog content area) as the tree changes,
//! including when the root component re-renders on its own.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use tracing::warn;

use super::{ListenerId, Reconciler};
use crate::backend::WidgetHandle;
use crate::error::Result;
use crate::instance::InstanceId;
use crate::tree::Node;

/// A top-level container outside the reconciled tree.
pub trait Surface {
    fn attach(&mut self, widget: WidgetHandle);
    fn detach(&mut self, widget: WidgetHandle);
}

struct Mounted<S> {
    surface: S,
    attached: Vec<WidgetHandle>,
}

impl<S: Surface> Mounted<S> {
    fn sync(&mut self, widgets: Vec<WidgetHandle>) {
        for widget in &self.attached {
            if !widgets.contains(widget) {
                self.surface.detach(*widget);
            }
        }
        for widget in &widgets {
            if !self.attached.contains(widget) {
                self.surface.attach(*widget);
            }
        }
        self.attached = widgets;
    }
}

/// A reconciler root bound to a [`Surface`].
pub struct Mount<S: Surface + 'static> {
    reconciler: Reconciler,
    mounted: Rc<RefCell<Mounted<S>>>,
    listener: ListenerId,
}

impl<S: Surface + 'static> Mount<S> {
    pub fn new(reconciler: Reconciler, surface: S) -> Self {
        let mounted = Rc::new(RefCell::new(Mounted {
            surface,
            attached: Vec::new(),
        }));

        let weak: Weak<RefCell<Mounted<S>>> = Rc::downgrade(&mounted);
        let listener = reconciler.on_updated(move |reconciler, id| {
            if reconciler.root() != Some(id) {
                return;
            }
            let Some(mounted) = weak.upgrade() else {
                return;
            };
            match reconciler.widgets(id) {
                Ok(widgets) => mounted.borrow_mut().sync(widgets),
                Err(err) => warn!(error = %err, "cannot read root widgets"),
            }
        });

        Self {
            reconciler,
            mounted,
            listener,
        }
    }

    /// Render `node` as the root and attach its widgets.
    pub fn render(&self, node: Node) -> Result<InstanceId> {
        let id = self.reconciler.render(node)?;
        let widgets = self.reconciler.widgets(id)?;
        self.mounted.borrow_mut().sync(widgets);
        Ok(id)
    }

    /// Detach everything, then destroy the root.
    pub fn unmount(&self) -> Result<()> {
        self.mounted.borrow_mut().sync(Vec::new());
        self.reconciler.unmount()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn surface(&self) -> Ref<'_, S> {
        Ref::map(self.mounted.borrow(), |mounted| &mounted.surface)
    }

    /// Widgets currently attached to the surface.
    pub fn attached(&self) -> Vec<WidgetHandle> {
        self.mounted.borrow().attached.clone()
    }
}

impl<S: Surface + 'static> Drop for Mount<S> {
    fn drop(&mut self) {
        self.reconciler.remove_listener(self.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::instance::Rendered;
    use crate::tree::{HostSpec, Kind};

    #[derive(Default)]
    struct Window {
        children: Vec<WidgetHandle>,
        log: Vec<String>,
    }

    impl Surface for Window {
        fn attach(&mut self, widget: WidgetHandle) {
            self.children.push(widget);
            self.log.push(format!("attach {}", widget.raw()));
        }

        fn detach(&mut self, widget: WidgetHandle) {
            self.children.retain(|w| *w != widget);
            self.log.push(format!("detach {}", widget.raw()));
        }
    }

    #[test]
    fn root_kind_change_swaps_surface_child() {
        let mount = Mount::new(Reconciler::new(RecordingBackend::new()), Window::default());
        let label = Kind::host("Label", HostSpec::leaf());
        let button = Kind::host("Button", HostSpec::leaf());

        mount.render(Node::new(&label)).unwrap();
        let first = mount.attached();
        mount.render(Node::new(&button)).unwrap();
        let second = mount.attached();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first, second);
        assert_eq!(mount.surface().children, second);
        assert_eq!(mount.surface().log.len(), 3);
    }

    #[test]
    fn fragment_root_attaches_every_widget() {
        let mount = Mount::new(Reconciler::new(RecordingBackend::new()), Window::default());
        let label = Kind::host("Label", HostSpec::leaf());
        let inner = label.clone();
        let pair = Kind::component_fn("Pair", move |_, _| {
            Rendered::from(vec![Node::new(&inner).key("a"), Node::new(&inner).key("b")])
        });

        mount.render(Node::new(&pair)).unwrap();
        assert_eq!(mount.surface().children.len(), 2);

        mount.unmount().unwrap();
        assert!(mount.surface().children.is_empty());
        assert_eq!(mount.reconciler().instance_count(), 0);
    }
}
