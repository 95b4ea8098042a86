// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Events carried on an [`crate::dispatch::EventQueue`].
//!
//! Every wire message becomes an [`Event::Ofp`] once it's been read off the socket. The
//! handshake phases additionally synthesize [`Event::PhaseEntered`], queued right after a
//! [`crate::dispatch::EventQueueHandle::set_dispatcher`] call so the newly-current dispatcher's
//! entry handler runs without waiting on a matching wire message — this stands in for the
//! reference implementation's pattern of requeuing an empty event onto the next dispatcher. The
//! dispatch layer separately raises [`Event::DispatcherChanged`] on the global change queue
//! whenever any datapath's current dispatcher is swapped.
use crate::datapath::DatapathHandle;
use crate::dispatch::DispatcherName;
use crate::wire::Message;
use std::sync::Arc;

/// The class of an event, used by [`crate::dispatch::Dispatcher`] registration and by the
/// correlator to key pending requests. This mirrors `ev.__class__` in the reference
/// implementation's handler registry, collapsed to a plain enum since Rust has no runtime class
/// identity to dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Ofp(OfpEventClass),
    DispatcherChanged,
    PhaseEntered,
}

/// One entry per `ofp_type` the controller ever receives, plus the synthetic stats-complete
/// class the correlator matches `send_stats_request` against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfpEventClass {
    Hello,
    Error,
    EchoRequest,
    EchoReply,
    Vendor,
    FeaturesReply,
    GetConfigReply,
    PacketIn,
    FlowRemoved,
    PortStatus,
    BarrierReply,
    StatsReply,
    QueueGetConfigReply,
}

#[derive(Debug, Clone)]
pub enum Event {
    Ofp(DatapathHandle, Arc<Message>),
    DispatcherChanged {
        datapath: DatapathHandle,
        previous: Option<DispatcherName>,
        new: DispatcherName,
    },
    /// Synthetic "run the entry handler for whatever phase is current now" kick, queued by a
    /// handler right after it calls `set_dispatcher`.
    PhaseEntered { datapath: DatapathHandle },
}

impl Event {
    pub fn class(&self) -> EventClass {
        match self {
            Event::Ofp(_, msg) => EventClass::Ofp(ofp_event_class(msg)),
            Event::DispatcherChanged { .. } => EventClass::DispatcherChanged,
            Event::PhaseEntered { .. } => EventClass::PhaseEntered,
        }
    }
}

pub fn ofp_event_class(msg: &Message) -> OfpEventClass {
    match msg {
        Message::Hello { .. } => OfpEventClass::Hello,
        Message::Error { .. } => OfpEventClass::Error,
        Message::EchoRequest { .. } => OfpEventClass::EchoRequest,
        Message::EchoReply { .. } => OfpEventClass::EchoReply,
        Message::Vendor { .. } => OfpEventClass::Vendor,
        Message::FeaturesReply { .. } => OfpEventClass::FeaturesReply,
        Message::GetConfigReply { .. } => OfpEventClass::GetConfigReply,
        Message::PacketIn { .. } => OfpEventClass::PacketIn,
        Message::FlowRemoved { .. } => OfpEventClass::FlowRemoved,
        Message::PortStatus { .. } => OfpEventClass::PortStatus,
        Message::BarrierReply { .. } => OfpEventClass::BarrierReply,
        Message::StatsReply { .. } => OfpEventClass::StatsReply,
        Message::QueueGetConfigReply { .. } => OfpEventClass::QueueGetConfigReply,
    }
}
