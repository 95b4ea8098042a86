// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide dispatcher singletons.
//!
//! The reference implementation builds one `EventDispatcher` per phase name at import time and
//! never tears them down; `once_cell::sync::Lazy` gives the same shape here without requiring a
//! runtime init step.

use super::dispatcher::{Dispatcher, DispatcherName, InheritableHandlers};
use super::queue::{EventQueue, EventQueueHandle};
use once_cell::sync::Lazy;

macro_rules! dispatcher_singletons {
    ($($field:ident => $name:expr),+ $(,)?) => {
        $(static $field: Lazy<Dispatcher> = Lazy::new(|| Dispatcher::new($name));)+
    };
}

dispatcher_singletons! {
    HANDSHAKE => DispatcherName::Handshake,
    SWITCH_FEATURES => DispatcherName::SwitchFeatures,
    DESC => DispatcherName::Desc,
    CONFIG_HOOK => DispatcherName::ConfigHook,
    BARRIER_REQUEST => DispatcherName::BarrierRequest,
    BARRIER_REPLY => DispatcherName::BarrierReply,
    MAIN => DispatcherName::Main,
    DEAD => DispatcherName::Dead,
}

static INHERITABLE: Lazy<InheritableHandlers> = Lazy::new(InheritableHandlers::default);

/// The handler table for a named phase.
pub fn dispatcher(name: DispatcherName) -> &'static Dispatcher {
    match name {
        DispatcherName::Handshake => &HANDSHAKE,
        DispatcherName::SwitchFeatures => &SWITCH_FEATURES,
        DispatcherName::Desc => &DESC,
        DispatcherName::ConfigHook => &CONFIG_HOOK,
        DispatcherName::BarrierRequest => &BARRIER_REQUEST,
        DispatcherName::BarrierReply => &BARRIER_REPLY,
        DispatcherName::Main => &MAIN,
        DispatcherName::Dead => &DEAD,
    }
}

/// The process-wide inheritable handler table shared by every datapath's queue.
pub fn inheritable() -> &'static InheritableHandlers {
    &INHERITABLE
}

/// The global queue that `DispatcherChanged` events are published on, watched by the reply
/// correlator to notice a datapath reaching `DEAD` (`reply_handler._dispacher_change` in the
/// reference implementation).
pub fn dispatcher_change_queue() -> EventQueueHandle {
    static QUEUE: Lazy<EventQueueHandle> =
        Lazy::new(|| EventQueue::new(DispatcherName::Main, None).spawn());
    QUEUE.clone()
}
