// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tracks the set of currently-connected datapaths, grounded on `dpset.DPSet` in the
//! reference implementation. Subscribers get an `EventDp` notification on join and leave;
//! leave is driven off the same `DispatcherChanged { new: Dead }` signal the correlator watches.

use crate::datapath::DatapathHandle;
use crate::dispatch::{registry, DispatcherName, HandlerToken};
use crate::event::{Event, EventClass};
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

/// A datapath's type tag (`dp_type` in the reference implementation). Left open-ended via a
/// plain string since this controller doesn't interpret the value itself.
pub type DpType = String;

/// Join/leave notification broadcast to [`DPSet::subscribe`]rs.
#[derive(Debug, Clone)]
pub enum EventDp {
    Enter(DatapathHandle),
    Leave(DatapathHandle),
}

fn ptr_of(dp: &DatapathHandle) -> usize {
    Arc::as_ptr(dp) as usize
}

pub struct DPSet {
    dps: DashMap<usize, DatapathHandle>,
    dp_types: DashMap<usize, DpType>,
    events: broadcast::Sender<EventDp>,
    _dead_token: HandlerToken,
}

impl DPSet {
    pub fn new() -> Arc<Self> {
        let (events, _rx) = broadcast::channel(1024);
        Arc::new_cyclic(|weak: &Weak<DPSet>| {
            let weak = weak.clone();
            let token = registry::inheritable().register(
                EventClass::DispatcherChanged,
                Arc::new(move |event: &Event| {
                    if let (Some(this), Event::DispatcherChanged { datapath, new, .. }) =
                        (weak.upgrade(), event)
                    {
                        if *new == DispatcherName::Dead {
                            this.unregister(datapath);
                        }
                    }
                }),
            );
            Self {
                dps: DashMap::new(),
                dp_types: DashMap::new(),
                events,
                _dead_token: token,
            }
        })
    }

    /// Registers a newly-handshaken datapath and broadcasts `EventDp::Enter`.
    pub fn register(&self, datapath: DatapathHandle) {
        let key = ptr_of(&datapath);
        self.dps.insert(key, datapath.clone());
        let _ = self.events.send(EventDp::Enter(datapath));
    }

    pub fn unregister(&self, datapath: &DatapathHandle) {
        let key = ptr_of(datapath);
        if let Some((_, dp)) = self.dps.remove(&key) {
            self.dp_types.remove(&key);
            let _ = self.events.send(EventDp::Leave(dp));
        }
    }

    pub fn set_type(&self, datapath: &DatapathHandle, dp_type: DpType) {
        self.dp_types.insert(ptr_of(datapath), dp_type);
    }

    pub fn dp_type(&self, datapath: &DatapathHandle) -> Option<DpType> {
        self.dp_types.get(&ptr_of(datapath)).map(|v| v.clone())
    }

    pub fn get_all(&self) -> Vec<DatapathHandle> {
        self.dps.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventDp> {
        self.events.subscribe()
    }
}

/// The process-wide `DPSet`, matching the reference implementation's module-level `DPSET`
/// singleton.
pub fn global() -> Arc<DPSet> {
    static DPSET: once_cell::sync::Lazy<Arc<DPSet>> = once_cell::sync::Lazy::new(DPSet::new);
    DPSET.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpset_can_be_constructed_and_subscribed() {
        let dpset = DPSet::new();
        let _rx = dpset.subscribe();
        assert!(dpset.get_all().is_empty());
    }
}
