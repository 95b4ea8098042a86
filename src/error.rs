// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Crate-wide error taxonomy.
//!
//! Every fallible core operation returns [`Result`]. Variants are split by failure category so
//! callers (and logs) can always distinguish a timeout from a disconnect from a protocol-level
//! rejection.

use crate::wire::CodecError;
use std::time::Duration;

/// The result type used throughout this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, displaydoc::Display, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// peer offered OpenFlow version 0x{negotiated:02x}, which is not in the supported set {supported:?}
    IncompatibleVersion {
        negotiated: u8,
        supported: &'static [u8],
    },

    /// the datapath disconnected while the request was still pending
    DatapathDisconnected,

    /// no reply for xid {xid} arrived within {timeout:?}
    RequestTimeout { xid: u32, timeout: Duration },

    /// switch rejected the request: type=0x{kind:04x} code=0x{code:04x}
    OfpError {
        kind: u16,
        code: u16,
        data: Vec<u8>,
    },

    /// transport I/O failure
    Transport(#[source] std::io::Error),

    /// malformed OpenFlow message on the wire
    Codec(#[from] CodecError),

    /// invalid controller configuration: {0}
    Config(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err)
    }
}

impl Error {
    /// True for errors that mean the datapath is no longer usable at all.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(self, Error::DatapathDisconnected | Error::Transport(_))
    }
}
