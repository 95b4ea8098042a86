// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The handshake state machine, grounded on `controller.handler` in the reference
//! implementation: a chain of per-phase handlers that each react to one event and move the
//! datapath's dispatcher forward, plus a pair of handlers (`echo`, `error`) registered on every
//! non-`DEAD` phase.
//!
//! [`install`] must run once before any datapath is accepted; [`crate::lib_init`] takes care of
//! that.

use crate::dispatch::{registry, DispatcherName};
use crate::event::{Event, EventClass, OfpEventClass};
use crate::wire::{error_type, hello_failed_code, Encoder, Message, StatsBody, OFP_VERSION};
use std::sync::Arc;

/// Registers every handshake-phase handler. Idempotent in the sense that calling it twice just
/// registers everything twice (harmless, but wasteful); callers should only do it once, which is
/// exactly what [`crate::lib_init`]'s `Once` guard guarantees.
pub fn install() {
    for name in DispatcherName::ALL_HANDLERS {
        let dispatcher = registry::dispatcher(name);
        dispatcher.register_handler(
            EventClass::Ofp(OfpEventClass::EchoRequest),
            Arc::new(echo_request_handler),
        );
        dispatcher.register_handler(
            EventClass::Ofp(OfpEventClass::EchoReply),
            Arc::new(echo_reply_handler),
        );
        dispatcher.register_handler(
            EventClass::Ofp(OfpEventClass::Error),
            Arc::new(error_msg_handler),
        );
    }

    registry::dispatcher(DispatcherName::Handshake)
        .register_handler(EventClass::Ofp(OfpEventClass::Hello), Arc::new(hello_handler));

    // Hello-failed is the one error kind the handshake itself must react to: the peer rejecting
    // our HELLO means there's no salvaging the connection. Registered only on Handshake, in
    // addition to the generic `error_msg_handler` every phase gets, so every other error kind
    // (and every error outside the handshake) is left for the correlator to match against its
    // pending table.
    registry::dispatcher(DispatcherName::Handshake)
        .register_handler(EventClass::Ofp(OfpEventClass::Error), Arc::new(handshake_error_handler));

    registry::dispatcher(DispatcherName::SwitchFeatures).register_handler(
        EventClass::Ofp(OfpEventClass::FeaturesReply),
        Arc::new(switch_features_handler),
    );

    registry::dispatcher(DispatcherName::Desc)
        .register_handler(EventClass::Ofp(OfpEventClass::StatsReply), Arc::new(desc_handler));

    registry::dispatcher(DispatcherName::ConfigHook)
        .register_handler(EventClass::PhaseEntered, Arc::new(config_hook_handler));

    registry::dispatcher(DispatcherName::BarrierRequest)
        .register_handler(EventClass::PhaseEntered, Arc::new(barrier_request_handler));

    registry::dispatcher(DispatcherName::BarrierReply).register_handler(
        EventClass::Ofp(OfpEventClass::BarrierReply),
        Arc::new(barrier_reply_handler),
    );

    registry::dispatcher(DispatcherName::Main)
        .register_handler(EventClass::Ofp(OfpEventClass::PortStatus), Arc::new(port_status_handler));
}

fn echo_request_handler(event: &Event) {
    if let Event::Ofp(dp, msg) = event {
        if let Message::EchoRequest { xid, data } = msg.as_ref() {
            let _ = dp.send_raw(Encoder::echo_reply(*xid, data));
        }
    }
}

fn echo_reply_handler(_event: &Event) {
    // No-op: nothing in this controller correlates unsolicited echo replies to anything.
}

fn error_msg_handler(event: &Event) {
    if let Event::Ofp(dp, msg) = event {
        if let Message::Error { kind, code, .. } = msg.as_ref() {
            tracing::warn!(
                address = %dp.address,
                kind = format_args!("0x{kind:04x}"),
                code = format_args!("0x{code:04x}"),
                "switch reported an error"
            );
        }
    }
}

/// Disconnects only when the error is a HELLO rejection arriving during the handshake itself;
/// every other error kind is left for `error_msg_handler` to log and the correlator's inheritable
/// handler to match against any pending request.
fn handshake_error_handler(event: &Event) {
    let Event::Ofp(dp, msg) = event else { return };
    let Message::Error { kind, .. } = msg.as_ref() else {
        return;
    };
    if *kind == error_type::HELLO_FAILED {
        tracing::warn!(address = %dp.address, "peer rejected our HELLO, closing connection");
        dp.disconnect();
    }
}

fn hello_handler(event: &Event) {
    let Event::Ofp(dp, msg) = event else { return };
    let Message::Hello { version, .. } = msg.as_ref() else {
        return;
    };

    // Negotiate down to the lower of our max and the peer's version; this controller only ever
    // speaks `OFP_VERSION`, so the negotiated version is incompatible only when the peer's is 0.
    let negotiated = (*version).min(OFP_VERSION);
    if negotiated != OFP_VERSION {
        let err = crate::error::Error::IncompatibleVersion {
            negotiated,
            supported: &[OFP_VERSION],
        };
        tracing::warn!(address = %dp.address, %err, "rejecting HELLO");
        let xid = dp.next_xid();
        let _ = dp.send_raw(Encoder::error(
            xid,
            error_type::HELLO_FAILED,
            hello_failed_code::INCOMPATIBLE,
            &[],
        ));
        dp.disconnect();
        return;
    }

    let xid = dp.next_xid();
    let _ = dp.send_raw(Encoder::features_request(xid));
    dp.event_queue().set_dispatcher(DispatcherName::SwitchFeatures);
}

fn switch_features_handler(event: &Event) {
    let Event::Ofp(dp, msg) = event else { return };
    let Message::FeaturesReply { features, .. } = msg.as_ref() else {
        return;
    };

    dp.set_datapath_id(features.datapath_id);
    dp.set_ports(features.ports.clone());
    dp.set_features(features.clone());

    let xid = dp.next_xid();
    let _ = dp.send_raw(Encoder::desc_stats_request(xid));
    dp.event_queue().set_dispatcher(DispatcherName::Desc);
}

fn desc_handler(event: &Event) {
    let Event::Ofp(dp, msg) = event else { return };
    let Message::StatsReply { body, .. } = msg.as_ref() else {
        return;
    };
    if let StatsBody::Desc(desc) = body {
        dp.set_desc((**desc).clone());
    }

    dp.event_queue().set_dispatcher(DispatcherName::ConfigHook);
    dp.event_queue()
        .queue(Event::PhaseEntered { datapath: dp.clone() });
}

/// Nothing to negotiate by default; supplemental config (`SET_CONFIG`) is left to the caller via
/// [`crate::datapath::Datapath::send_set_config`] once the datapath reaches `MAIN`, rather than
/// hard-coding a miss-send length here.
fn config_hook_handler(event: &Event) {
    let Event::PhaseEntered { datapath: dp } = event else {
        return;
    };
    dp.event_queue().set_dispatcher(DispatcherName::BarrierRequest);
    dp.event_queue()
        .queue(Event::PhaseEntered { datapath: dp.clone() });
}

fn barrier_request_handler(event: &Event) {
    let Event::PhaseEntered { datapath: dp } = event else {
        return;
    };
    let xid = dp.next_xid();
    let _ = dp.send_raw(Encoder::barrier_request(xid));
    dp.event_queue().set_dispatcher(DispatcherName::BarrierReply);
}

fn barrier_reply_handler(event: &Event) {
    let Event::Ofp(dp, msg) = event else { return };
    if !matches!(msg.as_ref(), Message::BarrierReply { .. }) {
        return;
    }
    dp.event_queue().set_dispatcher(DispatcherName::Main);
    crate::dpset::global().register(dp.clone());
    tracing::info!(
        address = %dp.address,
        datapath_id = ?dp.datapath_id(),
        "datapath handshake complete"
    );
}

fn port_status_handler(event: &Event) {
    let Event::Ofp(dp, msg) = event else { return };
    if let Message::PortStatus { reason, port, .. } = msg.as_ref() {
        dp.apply_port_status(*reason, port.clone());
    }
}
