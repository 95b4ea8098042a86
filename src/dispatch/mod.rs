// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The dispatcher/event-queue machinery that drives a datapath through its phases.

mod dispatcher;
mod queue;
pub mod registry;

pub use dispatcher::{Dispatcher, DispatcherName, Handler, HandlerToken, InheritableHandlers};
pub use queue::{EventQueue, EventQueueHandle};
