// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! An OpenFlow 1.0 controller runtime: connection I/O, the handshake state machine, reply
//! correlation, and datapath tracking.
//!
//! Callers wanting the whole thing wired together will mostly want [`acceptor::serve`]; the
//! submodules are public so a caller can also assemble a subset (e.g. just the wire codec) on
//! its own.

pub mod acceptor;
pub mod config;
pub mod correlator;
pub mod datapath;
pub mod dispatch;
pub mod dpset;
pub mod error;
pub mod event;
mod handshake;
pub mod wire;

pub use config::Configuration;
pub use correlator::Correlator;
pub use datapath::{Datapath, DatapathHandle};
pub use dpset::DPSet;
pub use error::{Error, Result};

static INIT: std::sync::Once = std::sync::Once::new();

/// Registers the handshake state machine's handlers against the process-wide dispatcher
/// singletons. Idempotent: safe (and cheap) to call from every entry point, including tests,
/// since the real work only happens the first time.
pub fn lib_init() {
    INIT.call_once(handshake::install);
}
