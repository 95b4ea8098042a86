// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Named dispatchers and the handler tables they carry.
//!
//! Each [`DispatcherName`] other than `Dead` has exactly one process-wide [`Dispatcher`]
//! instance (see [`registry`]), matching the singleton `EventDispatcher` objects the reference
//! implementation constructs once at import time and never again.

use crate::event::{Event, EventClass};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// A handler registered against an [`EventClass`]. Handlers never return an error: a handler
/// that can fail should log and swallow it, the same way the reference implementation's
/// decorated methods do (an unhandled exception there would just kill the greenlet).
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// The eight phases of datapath life, in the order a normal connection moves through them. Only
/// `Dead` is terminal; every other name can be re-entered (though in practice the handshake
/// chain only ever moves forward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatcherName {
    Handshake,
    SwitchFeatures,
    Desc,
    ConfigHook,
    BarrierRequest,
    BarrierReply,
    Main,
    Dead,
}

impl DispatcherName {
    pub const ALL_HANDLERS: [DispatcherName; 7] = [
        DispatcherName::Handshake,
        DispatcherName::SwitchFeatures,
        DispatcherName::Desc,
        DispatcherName::ConfigHook,
        DispatcherName::BarrierRequest,
        DispatcherName::BarrierReply,
        DispatcherName::Main,
    ];
}

impl fmt::Display for DispatcherName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatcherName::Handshake => "handshake",
            DispatcherName::SwitchFeatures => "switch_features",
            DispatcherName::Desc => "desc",
            DispatcherName::ConfigHook => "config_hook",
            DispatcherName::BarrierRequest => "barrier_request",
            DispatcherName::BarrierReply => "barrier_reply",
            DispatcherName::Main => "main",
            DispatcherName::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// A named handler table. Handlers registered here only fire while an
/// [`crate::dispatch::EventQueue`]'s current dispatcher is this one.
pub struct Dispatcher {
    name: DispatcherName,
    handlers: DashMap<EventClass, Vec<(u64, Handler)>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl Dispatcher {
    pub fn new(name: DispatcherName) -> Self {
        Self {
            name,
            handlers: DashMap::new(),
            next_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> DispatcherName {
        self.name
    }

    pub fn register_handler(&self, class: EventClass, handler: Handler) -> HandlerToken {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.handlers.entry(class).or_default().push((id, handler));
        HandlerToken { class, id }
    }

    /// Idempotent: unregistering a token twice (or one already removed) is a no-op.
    pub fn unregister(&self, token: HandlerToken) {
        if let Some(mut handlers) = self.handlers.get_mut(&token.class) {
            handlers.retain(|(id, _)| *id != token.id);
        }
    }

    pub fn dispatch(&self, event: &Event) {
        if let Some(handlers) = self.handlers.get(&event.class()) {
            for (_, handler) in handlers.iter() {
                handler(event);
            }
        }
    }
}

/// The process-wide inheritable handler table (`register_inheritable_handler` in the reference
/// implementation). Unlike [`Dispatcher`], these handlers fire for a matching event regardless
/// of which dispatcher is current — used by the reply correlator and by echo/error handling,
/// which both need to observe events no matter what phase a datapath is in.
#[derive(Default)]
pub struct InheritableHandlers {
    handlers: DashMap<EventClass, Vec<(u64, Handler)>>,
    next_id: std::sync::atomic::AtomicU64,
}

/// Token returned by [`InheritableHandlers::register`], needed to unregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerToken {
    class: EventClass,
    id: u64,
}

impl InheritableHandlers {
    pub fn register(&self, class: EventClass, handler: Handler) -> HandlerToken {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.handlers.entry(class).or_default().push((id, handler));
        HandlerToken { class, id }
    }

    pub fn unregister(&self, token: HandlerToken) {
        if let Some(mut handlers) = self.handlers.get_mut(&token.class) {
            handlers.retain(|(id, _)| *id != token.id);
        }
    }

    pub fn dispatch(&self, event: &Event) {
        if let Some(handlers) = self.handlers.get(&event.class()) {
            for (_, handler) in handlers.iter() {
                handler(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn register_then_unregister_leaves_dispatcher_empty() {
        let dispatcher = Dispatcher::new(DispatcherName::Main);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let token = dispatcher.register_handler(
            EventClass::DispatcherChanged,
            Arc::new(move |_event: &Event| {
                calls_clone.fetch_add(1, Ordering::Relaxed);
            }),
        );
        assert!(!dispatcher
            .handlers
            .get(&EventClass::DispatcherChanged)
            .unwrap()
            .is_empty());

        dispatcher.unregister(token);
        assert!(dispatcher
            .handlers
            .get(&EventClass::DispatcherChanged)
            .unwrap()
            .is_empty());

        // Unregistering twice (or a token for an already-removed entry) is a no-op, not a panic.
        dispatcher.unregister(token);
    }

    #[test]
    fn unknown_class_has_no_handlers() {
        let dispatcher = Dispatcher::new(DispatcherName::Main);
        assert!(dispatcher.handlers.get(&EventClass::PhaseEntered).is_none());
    }
}
