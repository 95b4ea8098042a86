// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! `ofp_type` values and the wire structs that hang off of them.

/// `enum ofp_type`.
#[allow(non_snake_case, non_upper_case_globals)]
pub mod msg_type {
    pub const HELLO: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const ECHO_REQUEST: u8 = 2;
    pub const ECHO_REPLY: u8 = 3;
    pub const VENDOR: u8 = 4;
    pub const FEATURES_REQUEST: u8 = 5;
    pub const FEATURES_REPLY: u8 = 6;
    pub const GET_CONFIG_REQUEST: u8 = 7;
    pub const GET_CONFIG_REPLY: u8 = 8;
    pub const SET_CONFIG: u8 = 9;
    pub const PACKET_IN: u8 = 10;
    pub const FLOW_REMOVED: u8 = 11;
    pub const PORT_STATUS: u8 = 12;
    pub const PACKET_OUT: u8 = 13;
    pub const FLOW_MOD: u8 = 14;
    pub const PORT_MOD: u8 = 15;
    pub const STATS_REQUEST: u8 = 16;
    pub const STATS_REPLY: u8 = 17;
    pub const BARRIER_REQUEST: u8 = 18;
    pub const BARRIER_REPLY: u8 = 19;
    pub const QUEUE_GET_CONFIG_REQUEST: u8 = 20;
    pub const QUEUE_GET_CONFIG_REPLY: u8 = 21;
}

/// `enum ofp_stats_types`.
#[allow(non_snake_case, non_upper_case_globals)]
pub mod stats_type {
    pub const DESC: u16 = 0;
    pub const FLOW: u16 = 1;
    pub const AGGREGATE: u16 = 2;
    pub const TABLE: u16 = 3;
    pub const PORT: u16 = 4;
    pub const QUEUE: u16 = 5;
    pub const VENDOR: u16 = 0xffff;
}

/// `enum ofp_error_type`.
#[allow(non_snake_case, non_upper_case_globals)]
pub mod error_type {
    pub const HELLO_FAILED: u16 = 0;
    pub const BAD_REQUEST: u16 = 1;
    pub const BAD_ACTION: u16 = 2;
    pub const FLOW_MOD_FAILED: u16 = 3;
    pub const PORT_MOD_FAILED: u16 = 4;
    pub const QUEUE_OP_FAILED: u16 = 5;
}

/// `enum ofp_hello_failed_code`.
#[allow(non_snake_case, non_upper_case_globals)]
pub mod hello_failed_code {
    pub const INCOMPATIBLE: u16 = 0;
    pub const EPERM: u16 = 1;
}

/// `enum ofp_port_reason` (`ofp_port_status.reason`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortReason {
    Add,
    Delete,
    Modify,
}

impl PortReason {
    pub fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Add),
            1 => Some(Self::Delete),
            2 => Some(Self::Modify),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// `ofp_stats_reply.flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatsReplyFlags: u16 {
        const REPLY_MORE = 1 << 0;
    }
}

/// `OFPP_NONE`, the "no output port" sentinel used by `ofp_match.in_port` and flow-mod actions.
pub const OFPP_NONE: u16 = 0xffff;

/// `struct ofp_phy_port`, 48 bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhyPort {
    pub port_no: u16,
    pub hw_addr: [u8; 6],
    pub name: String,
    pub config: u32,
    pub state: u32,
    pub curr: u32,
    pub advertised: u32,
    pub supported: u32,
    pub peer: u32,
}

pub const OFP_PHY_PORT_LEN: usize = 48;
pub const OFP_MAX_PORT_NAME_LEN: usize = 16;

/// `struct ofp_switch_features` (variable-length, `ports` trails the fixed header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchFeatures {
    pub datapath_id: u64,
    pub n_buffers: u32,
    pub n_tables: u8,
    pub capabilities: u32,
    pub actions: u32,
    pub ports: Vec<PhyPort>,
}

pub const OFP_SWITCH_FEATURES_FIXED_LEN: usize = 24;

/// `struct ofp_desc_stats`, 1056 bytes fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescStats {
    pub mfr_desc: String,
    pub hw_desc: String,
    pub sw_desc: String,
    pub serial_num: String,
    pub dp_desc: String,
}

pub const DESC_STR_LEN: usize = 256;
pub const SERIAL_NUM_LEN: usize = 32;
pub const OFP_DESC_STATS_LEN: usize = DESC_STR_LEN * 4 + SERIAL_NUM_LEN;

/// `struct ofp_table_stats`, 64 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub table_id: u8,
    pub name: String,
    pub wildcards: u32,
    pub max_entries: u32,
    pub active_count: u32,
    pub lookup_count: u64,
    pub matched_count: u64,
}

pub const OFP_TABLE_STATS_LEN: usize = 64;
pub const OFP_MAX_TABLE_NAME_LEN: usize = 32;

/// `struct ofp_port_stats`, 104 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStats {
    pub port_no: u16,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_frame_err: u64,
    pub rx_over_err: u64,
    pub rx_crc_err: u64,
    pub collisions: u64,
}

pub const OFP_PORT_STATS_LEN: usize = 104;

/// `struct ofp_queue_stats`, 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub port_no: u16,
    pub queue_id: u32,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
}

pub const OFP_QUEUE_STATS_LEN: usize = 32;

/// `struct ofp_match`, 40 bytes. `wildcards` follows `OFPFW_*` bit semantics; we don't interpret
/// it beyond round-tripping, since flow-table policy is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub wildcards: u32,
    pub in_port: u16,
    pub dl_src: [u8; 6],
    pub dl_dst: [u8; 6],
    pub dl_vlan: u16,
    pub dl_vlan_pcp: u8,
    pub dl_type: u16,
    pub nw_tos: u8,
    pub nw_proto: u8,
    pub nw_src: u32,
    pub nw_dst: u32,
    pub tp_src: u16,
    pub tp_dst: u16,
}

pub const OFP_MATCH_LEN: usize = 40;

impl Match {
    /// The "match everything" wildcard: `OFPFW_ALL` is all bits set in the 1.0 wildcard field.
    pub const WILDCARD_ALL: u32 = (1 << 22) - 1;

    pub fn wildcard_all() -> Self {
        Match {
            wildcards: Self::WILDCARD_ALL,
            in_port: 0,
            dl_src: [0; 6],
            dl_dst: [0; 6],
            dl_vlan: 0,
            dl_vlan_pcp: 0,
            dl_type: 0,
            nw_tos: 0,
            nw_proto: 0,
            nw_src: 0,
            nw_dst: 0,
            tp_src: 0,
            tp_dst: 0,
        }
    }
}

/// `enum ofp_flow_mod_command`.
#[allow(non_snake_case, non_upper_case_globals)]
pub mod flow_mod_command {
    pub const ADD: u16 = 0;
    pub const MODIFY: u16 = 1;
    pub const MODIFY_STRICT: u16 = 2;
    pub const DELETE: u16 = 3;
    pub const DELETE_STRICT: u16 = 4;
}

/// A flow-table action. Only `OFPAT_OUTPUT` is modeled: policy actions beyond forwarding to a
/// port are out of scope for this controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Output { port: u16, max_len: u16 },
}

pub const OFP_ACTION_OUTPUT_LEN: usize = 8;
const OFPAT_OUTPUT: u16 = 0;

impl Action {
    pub(super) fn wire_len(&self) -> usize {
        match self {
            Action::Output { .. } => OFP_ACTION_OUTPUT_LEN,
        }
    }

    pub(super) fn encode(&self, buf: &mut bytes::BytesMut) {
        use bytes::BufMut;
        match *self {
            Action::Output { port, max_len } => {
                buf.put_u16(OFPAT_OUTPUT);
                buf.put_u16(OFP_ACTION_OUTPUT_LEN as u16);
                buf.put_u16(port);
                buf.put_u16(max_len);
            }
        }
    }
}
