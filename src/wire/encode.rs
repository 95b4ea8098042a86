// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Encoding of controller-to-switch messages.
//!
//! Every builder returns a complete, length-prefixed wire message, ready to hand to the
//! datapath's send half.

use super::types::*;
use super::{msg_type, stats_type, OFP_HEADER_LEN, OFP_VERSION};
use bytes::{BufMut, Bytes, BytesMut};

/// Namespace for the outbound message builders. There's no instance state; this exists purely
/// to keep `wire::Encoder::flow_mod(..)` call sites readable instead of a page of free
/// functions.
pub struct Encoder;

fn header(buf: &mut BytesMut, msg_type: u8, length: u16, xid: u32) {
    buf.put_u8(OFP_VERSION);
    buf.put_u8(msg_type);
    buf.put_u16(length);
    buf.put_u32(xid);
}

fn fixed(msg_type_value: u8, xid: u32, body_len: usize) -> BytesMut {
    let total = OFP_HEADER_LEN + body_len;
    let mut buf = BytesMut::with_capacity(total);
    header(&mut buf, msg_type_value, total as u16, xid);
    buf
}

fn encode_match(buf: &mut BytesMut, m: &Match) {
    buf.put_u32(m.wildcards);
    buf.put_u16(m.in_port);
    buf.put_slice(&m.dl_src);
    buf.put_slice(&m.dl_dst);
    buf.put_u16(m.dl_vlan);
    buf.put_u8(m.dl_vlan_pcp);
    buf.put_u8(0); // pad
    buf.put_u16(m.dl_type);
    buf.put_u8(m.nw_tos);
    buf.put_u8(m.nw_proto);
    buf.put_u16(0); // pad
    buf.put_u32(m.nw_src);
    buf.put_u32(m.nw_dst);
    buf.put_u16(m.tp_src);
    buf.put_u16(m.tp_dst);
}

impl Encoder {
    pub fn hello(xid: u32) -> Bytes {
        fixed(msg_type::HELLO, xid, 0).freeze()
    }

    pub fn echo_request(xid: u32, data: &[u8]) -> Bytes {
        let mut buf = fixed(msg_type::ECHO_REQUEST, xid, data.len());
        buf.put_slice(data);
        buf.freeze()
    }

    pub fn echo_reply(xid: u32, data: &[u8]) -> Bytes {
        let mut buf = fixed(msg_type::ECHO_REPLY, xid, data.len());
        buf.put_slice(data);
        buf.freeze()
    }

    pub fn features_request(xid: u32) -> Bytes {
        fixed(msg_type::FEATURES_REQUEST, xid, 0).freeze()
    }

    pub fn get_config_request(xid: u32) -> Bytes {
        fixed(msg_type::GET_CONFIG_REQUEST, xid, 0).freeze()
    }

    pub fn set_config(xid: u32, flags: u16, miss_send_len: u16) -> Bytes {
        let mut buf = fixed(msg_type::SET_CONFIG, xid, 4);
        buf.put_u16(flags);
        buf.put_u16(miss_send_len);
        buf.freeze()
    }

    pub fn barrier_request(xid: u32) -> Bytes {
        fixed(msg_type::BARRIER_REQUEST, xid, 0).freeze()
    }

    /// Builds a locally-generated `OFPT_ERROR`, e.g. the `OFPET_HELLO_FAILED` sent when a peer
    /// offers an unsupported version. `data` is the offending request's header when replying to
    /// one; empty when the error isn't in response to a specific message.
    pub fn error(xid: u32, kind: u16, code: u16, data: &[u8]) -> Bytes {
        let mut buf = fixed(msg_type::ERROR, xid, 4 + data.len());
        buf.put_u16(kind);
        buf.put_u16(code);
        buf.put_slice(data);
        buf.freeze()
    }

    fn stats_request_header(xid: u32, stats_type_value: u16, body_len: usize) -> BytesMut {
        let mut buf = fixed(msg_type::STATS_REQUEST, xid, 4 + body_len);
        buf.put_u16(stats_type_value);
        buf.put_u16(0); // flags, unused on requests in 1.0
        buf
    }

    pub fn desc_stats_request(xid: u32) -> Bytes {
        Self::stats_request_header(xid, stats_type::DESC, 0).freeze()
    }

    pub fn table_stats_request(xid: u32) -> Bytes {
        Self::stats_request_header(xid, stats_type::TABLE, 0).freeze()
    }

    pub fn port_stats_request(xid: u32, port_no: u16) -> Bytes {
        let mut buf = Self::stats_request_header(xid, stats_type::PORT, 8);
        buf.put_u16(port_no);
        buf.put_bytes(0, 6); // pad
        buf.freeze()
    }

    pub fn queue_stats_request(xid: u32, port_no: u16, queue_id: u32) -> Bytes {
        let mut buf = Self::stats_request_header(xid, stats_type::QUEUE, 8);
        buf.put_u16(port_no);
        buf.put_u16(0); // pad
        buf.put_u32(queue_id);
        buf.freeze()
    }

    pub fn queue_get_config_request(xid: u32, port_no: u16) -> Bytes {
        let mut buf = fixed(msg_type::QUEUE_GET_CONFIG_REQUEST, xid, 4);
        buf.put_u16(port_no);
        buf.put_u16(0); // pad
        buf.freeze()
    }

    pub fn packet_out(xid: u32, buffer_id: u32, in_port: u16, actions: &[Action], data: &[u8]) -> Bytes {
        let actions_len: usize = actions.iter().map(Action::wire_len).sum();
        let body_len = 8 + actions_len + data.len();
        let mut buf = fixed(msg_type::PACKET_OUT, xid, body_len);
        buf.put_u32(buffer_id);
        buf.put_u16(in_port);
        buf.put_u16(actions_len as u16);
        for action in actions {
            action.encode(&mut buf);
        }
        buf.put_slice(data);
        buf.freeze()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn flow_mod(
        xid: u32,
        matched: &Match,
        cookie: u64,
        command: u16,
        idle_timeout: u16,
        hard_timeout: u16,
        priority: u16,
        buffer_id: u32,
        out_port: u16,
        flags: u16,
        actions: &[Action],
    ) -> Bytes {
        let actions_len: usize = actions.iter().map(Action::wire_len).sum();
        let body_len = OFP_MATCH_LEN + 24 + actions_len;
        let mut buf = fixed(msg_type::FLOW_MOD, xid, body_len);
        encode_match(&mut buf, matched);
        buf.put_u64(cookie);
        buf.put_u16(command);
        buf.put_u16(idle_timeout);
        buf.put_u16(hard_timeout);
        buf.put_u16(priority);
        buf.put_u32(buffer_id);
        buf.put_u16(out_port);
        buf.put_u16(flags);
        for action in actions {
            action.encode(&mut buf);
        }
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Header, OFP_VERSION};

    #[test]
    fn hello_round_trips_through_header_peek() {
        let bytes = Encoder::hello(7);
        let header = Header::peek(&bytes).unwrap();
        assert_eq!(header.version, OFP_VERSION);
        assert_eq!(header.msg_type, msg_type::HELLO);
        assert_eq!(header.length as usize, bytes.len());
        assert_eq!(header.xid, 7);
    }

    #[test]
    fn flow_mod_length_accounts_for_actions() {
        let matched = Match::wildcard_all();
        let actions = [Action::Output {
            port: 1,
            max_len: 0,
        }];
        let bytes = Encoder::flow_mod(1, &matched, 0, flow_mod_command::ADD, 0, 0, 0, 0xffffffff, OFPP_NONE, 0, &actions);
        assert_eq!(bytes.len(), OFP_HEADER_LEN + OFP_MATCH_LEN + 24 + OFP_ACTION_OUTPUT_LEN);
    }
}
