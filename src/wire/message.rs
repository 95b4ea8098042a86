// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of switch-to-controller messages.

use super::types::*;
use super::{CodecError, Header};
use bytes::{Buf, Bytes};

/// A fully decoded inbound message, header included.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello {
        xid: u32,
        version: u8,
    },
    Error {
        xid: u32,
        kind: u16,
        code: u16,
        data: Bytes,
    },
    EchoRequest {
        xid: u32,
        data: Bytes,
    },
    EchoReply {
        xid: u32,
        data: Bytes,
    },
    Vendor {
        xid: u32,
        vendor_id: u32,
        data: Bytes,
    },
    FeaturesReply {
        xid: u32,
        features: SwitchFeatures,
    },
    GetConfigReply {
        xid: u32,
        flags: u16,
        miss_send_len: u16,
    },
    PacketIn {
        xid: u32,
        buffer_id: u32,
        total_len: u16,
        in_port: u16,
        reason: u8,
        data: Bytes,
    },
    FlowRemoved {
        xid: u32,
        matched: Match,
        cookie: u64,
        priority: u16,
        reason: u8,
        duration_sec: u32,
        duration_nsec: u32,
        idle_timeout: u16,
        packet_count: u64,
        byte_count: u64,
    },
    PortStatus {
        xid: u32,
        reason: PortReason,
        port: PhyPort,
    },
    BarrierReply {
        xid: u32,
    },
    StatsReply {
        xid: u32,
        stats_type: u16,
        flags: StatsReplyFlags,
        body: StatsBody,
    },
    QueueGetConfigReply {
        xid: u32,
        port: u16,
        /// Raw `ofp_packet_queue` records, unparsed: queue property lists aren't otherwise
        /// needed by this controller.
        queues_raw: Bytes,
    },
}

/// The decoded body of an `OFPT_STATS_REPLY`, keyed by `ofp_stats_types`.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsBody {
    Desc(Box<DescStats>),
    Table(Vec<TableStats>),
    Port(Vec<PortStats>),
    Queue(Vec<QueueStats>),
    /// Stats types this controller doesn't interpret (`FLOW`, `AGGREGATE`, vendor extensions)
    /// are preserved as raw bytes rather than dropped.
    Opaque(Bytes),
}

impl Message {
    pub fn xid(&self) -> u32 {
        match self {
            Message::Hello { xid, .. }
            | Message::Error { xid, .. }
            | Message::EchoRequest { xid, .. }
            | Message::EchoReply { xid, .. }
            | Message::Vendor { xid, .. }
            | Message::FeaturesReply { xid, .. }
            | Message::GetConfigReply { xid, .. }
            | Message::PacketIn { xid, .. }
            | Message::FlowRemoved { xid, .. }
            | Message::PortStatus { xid, .. }
            | Message::BarrierReply { xid, .. }
            | Message::StatsReply { xid, .. }
            | Message::QueueGetConfigReply { xid, .. } => *xid,
        }
    }

    /// Parses one full message (header + body) out of `buf`. `buf` must already contain at
    /// least `header.length` bytes; the caller (the framed decoder) is responsible for that.
    pub(super) fn decode(header: Header, mut body: Bytes) -> Result<Message, CodecError> {
        let xid = header.xid;
        match header.msg_type {
            msg_type::HELLO => Ok(Message::Hello {
                xid,
                version: header.version,
            }),

            msg_type::ERROR => {
                require_len(&body, 4)?;
                let kind = body.get_u16();
                let code = body.get_u16();
                Ok(Message::Error {
                    xid,
                    kind,
                    code,
                    data: body,
                })
            }

            msg_type::ECHO_REQUEST => Ok(Message::EchoRequest { xid, data: body }),
            msg_type::ECHO_REPLY => Ok(Message::EchoReply { xid, data: body }),

            msg_type::VENDOR => {
                require_len(&body, 4)?;
                let vendor_id = body.get_u32();
                Ok(Message::Vendor {
                    xid,
                    vendor_id,
                    data: body,
                })
            }

            msg_type::FEATURES_REPLY => decode_features_reply(xid, body),

            msg_type::GET_CONFIG_REPLY => {
                require_len(&body, 4)?;
                let flags = body.get_u16();
                let miss_send_len = body.get_u16();
                Ok(Message::GetConfigReply {
                    xid,
                    flags,
                    miss_send_len,
                })
            }

            msg_type::PACKET_IN => {
                require_len(&body, 10)?;
                let buffer_id = body.get_u32();
                let total_len = body.get_u16();
                let in_port = body.get_u16();
                let reason = body.get_u8();
                body.advance(1); // pad
                Ok(Message::PacketIn {
                    xid,
                    buffer_id,
                    total_len,
                    in_port,
                    reason,
                    data: body,
                })
            }

            msg_type::FLOW_REMOVED => decode_flow_removed(xid, body),

            msg_type::PORT_STATUS => decode_port_status(xid, body),

            msg_type::BARRIER_REPLY => Ok(Message::BarrierReply { xid }),

            msg_type::STATS_REPLY => decode_stats_reply(xid, body),

            msg_type::QUEUE_GET_CONFIG_REPLY => {
                require_len(&body, 8)?;
                let port = body.get_u16();
                body.advance(6); // pad
                Ok(Message::QueueGetConfigReply {
                    xid,
                    port,
                    queues_raw: body,
                })
            }

            other => Err(CodecError::UnknownMessageType(other)),
        }
    }
}

fn require_len(buf: &Bytes, n: usize) -> Result<(), CodecError> {
    if buf.len() < n {
        Err(CodecError::BodyTooShort {
            expected: n,
            actual: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn decode_phy_port(buf: &mut Bytes) -> Result<PhyPort, CodecError> {
    require_len(buf, OFP_PHY_PORT_LEN)?;
    let port_no = buf.get_u16();
    let mut hw_addr = [0u8; 6];
    buf.copy_to_slice(&mut hw_addr);
    let mut name_raw = [0u8; OFP_MAX_PORT_NAME_LEN];
    buf.copy_to_slice(&mut name_raw);
    let name = cstr_to_string(&name_raw);
    let config = buf.get_u32();
    let state = buf.get_u32();
    let curr = buf.get_u32();
    let advertised = buf.get_u32();
    let supported = buf.get_u32();
    let peer = buf.get_u32();
    Ok(PhyPort {
        port_no,
        hw_addr,
        name,
        config,
        state,
        curr,
        advertised,
        supported,
        peer,
    })
}

fn decode_features_reply(xid: u32, mut body: Bytes) -> Result<Message, CodecError> {
    require_len(&body, OFP_SWITCH_FEATURES_FIXED_LEN)?;
    let datapath_id = body.get_u64();
    let n_buffers = body.get_u32();
    let n_tables = body.get_u8();
    body.advance(3); // pad
    let capabilities = body.get_u32();
    let actions = body.get_u32();

    let mut ports = Vec::new();
    while body.remaining() >= OFP_PHY_PORT_LEN {
        ports.push(decode_phy_port(&mut body)?);
    }

    Ok(Message::FeaturesReply {
        xid,
        features: SwitchFeatures {
            datapath_id,
            n_buffers,
            n_tables,
            capabilities,
            actions,
            ports,
        },
    })
}

fn decode_flow_removed(xid: u32, mut body: Bytes) -> Result<Message, CodecError> {
    require_len(&body, OFP_MATCH_LEN + 40)?;
    let matched = decode_match(&mut body)?;
    let cookie = body.get_u64();
    let priority = body.get_u16();
    let reason = body.get_u8();
    body.advance(1); // pad
    let duration_sec = body.get_u32();
    let duration_nsec = body.get_u32();
    let idle_timeout = body.get_u16();
    body.advance(2); // pad
    let packet_count = body.get_u64();
    let byte_count = body.get_u64();
    Ok(Message::FlowRemoved {
        xid,
        matched,
        cookie,
        priority,
        reason,
        duration_sec,
        duration_nsec,
        idle_timeout,
        packet_count,
        byte_count,
    })
}

fn decode_match(buf: &mut Bytes) -> Result<Match, CodecError> {
    require_len(buf, OFP_MATCH_LEN)?;
    let wildcards = buf.get_u32();
    let in_port = buf.get_u16();
    let mut dl_src = [0u8; 6];
    buf.copy_to_slice(&mut dl_src);
    let mut dl_dst = [0u8; 6];
    buf.copy_to_slice(&mut dl_dst);
    let dl_vlan = buf.get_u16();
    let dl_vlan_pcp = buf.get_u8();
    buf.advance(1); // pad
    let dl_type = buf.get_u16();
    let nw_tos = buf.get_u8();
    let nw_proto = buf.get_u8();
    buf.advance(2); // pad
    let nw_src = buf.get_u32();
    let nw_dst = buf.get_u32();
    let tp_src = buf.get_u16();
    let tp_dst = buf.get_u16();
    Ok(Match {
        wildcards,
        in_port,
        dl_src,
        dl_dst,
        dl_vlan,
        dl_vlan_pcp,
        dl_type,
        nw_tos,
        nw_proto,
        nw_src,
        nw_dst,
        tp_src,
        tp_dst,
    })
}

fn decode_port_status(xid: u32, mut body: Bytes) -> Result<Message, CodecError> {
    require_len(&body, 8 + OFP_PHY_PORT_LEN)?;
    let reason_raw = body.get_u8();
    body.advance(7); // pad
    let reason = PortReason::from_wire(reason_raw).unwrap_or(PortReason::Modify);
    let port = decode_phy_port(&mut body)?;
    Ok(Message::PortStatus { xid, reason, port })
}

fn cstr_to_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn decode_stats_reply(xid: u32, mut body: Bytes) -> Result<Message, CodecError> {
    require_len(&body, 4)?;
    let stats_type = body.get_u16();
    let flags = StatsReplyFlags::from_bits_truncate(body.get_u16());

    let parsed = match stats_type {
        stats_type::DESC => {
            require_len(&body, OFP_DESC_STATS_LEN)?;
            let mfr_desc = take_cstr(&mut body, DESC_STR_LEN);
            let hw_desc = take_cstr(&mut body, DESC_STR_LEN);
            let sw_desc = take_cstr(&mut body, DESC_STR_LEN);
            let serial_num = take_cstr(&mut body, SERIAL_NUM_LEN);
            let dp_desc = take_cstr(&mut body, DESC_STR_LEN);
            StatsBody::Desc(Box::new(DescStats {
                mfr_desc,
                hw_desc,
                sw_desc,
                serial_num,
                dp_desc,
            }))
        }
        stats_type::TABLE => {
            let mut entries = Vec::new();
            while body.remaining() >= OFP_TABLE_STATS_LEN {
                let table_id = body.get_u8();
                body.advance(3); // pad
                let name = take_cstr(&mut body, OFP_MAX_TABLE_NAME_LEN);
                let wildcards = body.get_u32();
                let max_entries = body.get_u32();
                let active_count = body.get_u32();
                let lookup_count = body.get_u64();
                let matched_count = body.get_u64();
                entries.push(TableStats {
                    table_id,
                    name,
                    wildcards,
                    max_entries,
                    active_count,
                    lookup_count,
                    matched_count,
                });
            }
            if body.has_remaining() {
                return Err(CodecError::MisalignedStatsBody(body.remaining()));
            }
            StatsBody::Table(entries)
        }
        stats_type::PORT => {
            let mut entries = Vec::new();
            while body.remaining() >= OFP_PORT_STATS_LEN {
                let port_no = body.get_u16();
                body.advance(6); // pad
                entries.push(PortStats {
                    port_no,
                    rx_packets: body.get_u64(),
                    tx_packets: body.get_u64(),
                    rx_bytes: body.get_u64(),
                    tx_bytes: body.get_u64(),
                    rx_dropped: body.get_u64(),
                    tx_dropped: body.get_u64(),
                    rx_errors: body.get_u64(),
                    tx_errors: body.get_u64(),
                    rx_frame_err: body.get_u64(),
                    rx_over_err: body.get_u64(),
                    rx_crc_err: body.get_u64(),
                    collisions: body.get_u64(),
                });
            }
            if body.has_remaining() {
                return Err(CodecError::MisalignedStatsBody(body.remaining()));
            }
            StatsBody::Port(entries)
        }
        stats_type::QUEUE => {
            let mut entries = Vec::new();
            while body.remaining() >= OFP_QUEUE_STATS_LEN {
                let port_no = body.get_u16();
                body.advance(2); // pad
                entries.push(QueueStats {
                    port_no,
                    queue_id: body.get_u32(),
                    tx_bytes: body.get_u64(),
                    tx_packets: body.get_u64(),
                    tx_errors: body.get_u64(),
                });
            }
            if body.has_remaining() {
                return Err(CodecError::MisalignedStatsBody(body.remaining()));
            }
            StatsBody::Queue(entries)
        }
        stats_type::FLOW | stats_type::AGGREGATE | stats_type::VENDOR => StatsBody::Opaque(body),
        other => return Err(CodecError::UnknownStatsType(other)),
    };

    Ok(Message::StatsReply {
        xid,
        stats_type,
        flags,
        body: parsed,
    })
}

fn take_cstr(buf: &mut Bytes, len: usize) -> String {
    let raw = buf.split_to(len);
    cstr_to_string(&raw)
}

pub(super) fn parse(header: Header, body: Bytes) -> Result<Message, CodecError> {
    Message::decode(header, body)
}
