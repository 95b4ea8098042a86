// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-datapath event queues.
//!
//! An [`EventQueue`] owns the "current dispatcher" pointer for one datapath and a channel that
//! events are pushed onto; a background task drains the channel and hands each event to the
//! dispatcher that was current at drain time, then to the process-wide inheritable handlers.
//! This mirrors `dispatcher.EventQueue` plus its `_event_loop` greenlet in the reference
//! implementation, minus the cooperative scheduler — here a `tokio::spawn`ed task plays the same
//! role.

use super::dispatcher::DispatcherName;
use super::registry;
use crate::datapath::Datapath;
use crate::event::Event;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Handle used to push events onto a queue from anywhere (the recv loop, handlers synthesizing
/// follow-up events, `send_request` replies).
#[derive(Clone)]
pub struct EventQueueHandle {
    sender: mpsc::UnboundedSender<Event>,
    current: Arc<RwLock<DispatcherName>>,
    aux: Option<Weak<Datapath>>,
}

impl EventQueueHandle {
    pub fn queue(&self, event: Event) {
        // The receiving task may have already exited (datapath torn down); dropping the event
        // is the correct behavior, matching a dead greenlet simply never running again.
        let _ = self.sender.send(event);
    }

    pub fn current_dispatcher(&self) -> DispatcherName {
        *self.current.read()
    }

    /// Swaps the current dispatcher, publishing a `DispatcherChanged` event onto the global
    /// dispatcher-change queue *before* the swap is visible to new events. This ordering is the
    /// one invariant callers rely on: anything reacting to `DEAD` transitions is guaranteed to
    /// see the change-notification before any handler runs under the new dispatcher.
    pub fn set_dispatcher(&self, new: DispatcherName) {
        let mut current = self.current.write();
        let previous = *current;
        if previous == new {
            return;
        }
        if let Some(datapath) = self.aux.as_ref().and_then(Weak::upgrade) {
            registry::dispatcher_change_queue().queue(Event::DispatcherChanged {
                datapath,
                previous: Some(previous),
                new,
            });
        }
        *current = new;
    }
}

/// Owns the receive half; spawned once per datapath (and once globally for the dispatcher-change
/// and dpset queues) by [`EventQueue::spawn`].
pub struct EventQueue {
    handle: EventQueueHandle,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventQueue {
    pub fn new(initial: DispatcherName, aux: Option<Weak<Datapath>>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            handle: EventQueueHandle {
                sender,
                current: Arc::new(RwLock::new(initial)),
                aux,
            },
            receiver,
        }
    }

    pub fn handle(&self) -> EventQueueHandle {
        self.handle.clone()
    }

    /// Spawns the drain loop and returns a handle; the loop runs until every [`EventQueueHandle`]
    /// clone (and this `EventQueue`) has been dropped.
    pub fn spawn(mut self) -> EventQueueHandle {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            while let Some(event) = self.receiver.recv().await {
                let current = self.handle.current_dispatcher();
                registry::dispatcher(current).dispatch(&event);
                registry::inheritable().dispatch(&event);
            }
        });
        handle
    }
}
