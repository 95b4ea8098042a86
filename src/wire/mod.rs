// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! OpenFlow 1.0 wire codec.
//!
//! Only the direction the controller actually needs is implemented: decode for messages a
//! switch sends unsolicited or in reply, encode for messages the controller sends. Flow-table
//! policy is out of scope, so [`types::Action`] only carries `OFPAT_OUTPUT`.

mod codec;
mod encode;
mod message;
mod types;

pub use codec::Ofp10Codec;
pub use encode::Encoder;
pub use message::{Message, StatsBody};
pub use types::*;

use bytes::Buf;

/// The only protocol version this crate speaks.
pub const OFP_VERSION: u8 = 0x01;

/// Size in bytes of `ofp_header`.
pub const OFP_HEADER_LEN: usize = 8;

/// `OFP_MAX_XID` per the 1.0 wire spec (24-bit in the reference implementation's generator, but
/// the header field itself is a full `u32`; callers that care about peer interop should stay
/// within `i32::MAX`).
pub const OFP_MAX_XID: u32 = u32::MAX;

/// Errors raised while parsing or building OpenFlow wire messages.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    /// message claimed length {length}, which is shorter than the header itself
    LengthBelowHeader { length: u16 },

    /// unsupported OpenFlow version 0x{0:02x}
    UnsupportedVersion(u8),

    /// unrecognized message type 0x{0:02x}
    UnknownMessageType(u8),

    /// message body is {actual} bytes, expected at least {expected}
    BodyTooShort { expected: usize, actual: usize },

    /// stats message body length {0} is not a multiple of the per-entry record size
    MisalignedStatsBody(usize),

    /// unrecognized stats type 0x{0:04x}
    UnknownStatsType(u16),
}

/// The fixed `ofp_header` fields, parsed independently of the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub msg_type: u8,
    /// Total message length, header included.
    pub length: u16,
    pub xid: u32,
}

impl Header {
    /// Parses a header from the first [`OFP_HEADER_LEN`] bytes of `buf`, without advancing it.
    ///
    /// Returns `None` if fewer than [`OFP_HEADER_LEN`] bytes are available yet; that's not an
    /// error, it means the caller should keep reading from the socket.
    pub fn peek(buf: &[u8]) -> Option<Header> {
        if buf.len() < OFP_HEADER_LEN {
            return None;
        }
        let mut cursor = buf;
        let version = cursor.get_u8();
        let msg_type = cursor.get_u8();
        let length = cursor.get_u16();
        let xid = cursor.get_u32();
        Some(Header {
            version,
            msg_type,
            length,
            xid,
        })
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        if (self.length as usize) < OFP_HEADER_LEN {
            return Err(CodecError::LengthBelowHeader {
                length: self.length,
            });
        }
        Ok(())
    }
}
