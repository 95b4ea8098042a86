// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The datapath connection: socket I/O, xid bookkeeping, and the convenience send/request
//! operations layered on top of it.

mod connection;
mod ops;

pub use connection::{spawn, Datapath, DatapathHandle};
