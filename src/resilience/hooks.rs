//! Transition hooks.

use std::fmt;
use std::sync::Arc;

/// Shared closure run on a state transition.
pub(crate) type Callback = Arc<dyn Fn() + Send + Sync>;

/// A state change that hooks are notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Transition {
    Opened,
    Closed,
    HalfOpened,
}

/// Observer for breaker transitions.
///
/// Methods run synchronously while the breaker lock is held. They must not call
/// back into the same breaker.
pub trait StateListener: Send + Sync {
    fn on_open(&self) {}
    fn on_close(&self) {}
    fn on_half_open(&self) {}
}

#[derive(Default)]
pub(crate) struct Hooks {
    on_open: Option<Callback>,
    on_close: Option<Callback>,
    on_half_open: Option<Callback>,
    listeners: Vec<Arc<dyn StateListener>>,
}

impl Hooks {
    pub(crate) fn set(&mut self, transition: Transition, callback: Callback) {
        let slot = match transition {
            Transition::Opened => &mut self.on_open,
            Transition::Closed => &mut self.on_close,
            Transition::HalfOpened => &mut self.on_half_open,
        };
        *slot = Some(callback);
    }

    pub(crate) fn add_listener(&mut self, listener: Arc<dyn StateListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Closure slot first, then listeners in registration order.
    pub(crate) fn fire(&self, transition: Transition) {
        let slot = match transition {
            Transition::Opened => &self.on_open,
            Transition::Closed => &self.on_close,
            Transition::HalfOpened => &self.on_half_open,
        };
        if let Some(cb) = slot {
            cb();
        }
        for l in &self.listeners {
            match transition {
                Transition::Opened => l.on_open(),
                Transition::Closed => l.on_close(),
                Transition::HalfOpened => l.on_half_open(),
            }
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
