// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Turns the asynchronous reply-by-xid wire protocol into a synchronous request/response call,
//! grounded on `reply_handler.ReplyHandler` in the reference implementation: register a
//! callback keyed by datapath + xid, fire the request, wait for a matching reply or error, and
//! unregister either way.
//!
//! Unlike the reference implementation, which only listens while `MAIN_DISPATCHER` is current,
//! this correlator registers on the process-wide *inheritable* handler table (see
//! [`crate::dispatch::registry::inheritable`]) so a request can be issued during any phase —
//! needed for the supplemental `request_queue_config` call, which has no phase restriction.

use crate::datapath::{Datapath, DatapathHandle};
use crate::dispatch::registry;
use crate::dispatch::{DispatcherName, HandlerToken};
use crate::error::{Error, Result};
use crate::event::{Event, EventClass, OfpEventClass};
use crate::wire::{CodecError, Message, StatsBody, StatsReplyFlags};
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

type PendingKey = (usize, u32);

enum Pending {
    Single(oneshot::Sender<Result<Message>>),
    Stats(mpsc::UnboundedSender<Result<StatsBody>>),
}

/// Tracks in-flight requests across every datapath. One instance is shared by the whole
/// controller; [`Correlator::new`] registers its listeners once and keeps itself alive for as
/// long as any clone of the returned `Arc` is held.
pub struct Correlator {
    pending: DashMap<PendingKey, Pending>,
    tokens: Vec<HandlerToken>,
}

const REPLY_CLASSES: [OfpEventClass; 6] = [
    OfpEventClass::FeaturesReply,
    OfpEventClass::GetConfigReply,
    OfpEventClass::BarrierReply,
    OfpEventClass::StatsReply,
    OfpEventClass::QueueGetConfigReply,
    OfpEventClass::Error,
];

fn key_of(datapath: &Datapath, xid: u32) -> PendingKey {
    (datapath as *const Datapath as usize, xid)
}

impl Correlator {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Correlator>| {
            let mut tokens = Vec::new();

            for class in REPLY_CLASSES {
                let weak = weak.clone();
                let token = registry::inheritable().register(
                    EventClass::Ofp(class),
                    Arc::new(move |event: &Event| {
                        if let (Some(correlator), Event::Ofp(dp, msg)) = (weak.upgrade(), event) {
                            correlator.on_message(dp, msg);
                        }
                    }),
                );
                tokens.push(token);
            }

            let weak = weak.clone();
            let dead_token = registry::inheritable().register(
                EventClass::DispatcherChanged,
                Arc::new(move |event: &Event| {
                    if let (Some(correlator), Event::DispatcherChanged { datapath, new, .. }) =
                        (weak.upgrade(), event)
                    {
                        if *new == DispatcherName::Dead {
                            correlator.on_datapath_dead(datapath);
                        }
                    }
                }),
            );
            tokens.push(dead_token);

            Self {
                pending: DashMap::new(),
                tokens,
            }
        })
    }

    fn on_message(&self, datapath: &DatapathHandle, msg: &Message) {
        let key = key_of(datapath, msg.xid());

        match msg {
            Message::Error { kind, code, data, .. } => {
                if let Some((_, pending)) = self.pending.remove(&key) {
                    let err = Error::OfpError {
                        kind: *kind,
                        code: *code,
                        data: data.to_vec(),
                    };
                    match pending {
                        Pending::Single(tx) => {
                            let _ = tx.send(Err(err));
                        }
                        Pending::Stats(tx) => {
                            let _ = tx.send(Err(err));
                        }
                    }
                }
            }
            Message::StatsReply { flags, body, .. } => {
                let more = flags.contains(StatsReplyFlags::REPLY_MORE);
                if more {
                    if let Some(entry) = self.pending.get(&key) {
                        if let Pending::Stats(tx) = entry.value() {
                            let _ = tx.send(Ok(body.clone()));
                        }
                    }
                } else if let Some((_, pending)) = self.pending.remove(&key) {
                    if let Pending::Stats(tx) = pending {
                        let _ = tx.send(Ok(body.clone()));
                    }
                }
            }
            other => {
                if let Some((_, Pending::Single(tx))) = self.pending.remove(&key) {
                    let _ = tx.send(Ok(other.clone()));
                }
            }
        }
    }

    fn on_datapath_dead(&self, datapath: &DatapathHandle) {
        let ptr = Arc::as_ptr(datapath) as usize;
        let dead: Vec<PendingKey> = self
            .pending
            .iter()
            .map(|entry| *entry.key())
            .filter(|(dp_ptr, _)| *dp_ptr == ptr)
            .collect();
        for key in dead {
            if let Some((_, pending)) = self.pending.remove(&key) {
                match pending {
                    Pending::Single(tx) => {
                        let _ = tx.send(Err(Error::DatapathDisconnected));
                    }
                    Pending::Stats(tx) => {
                        let _ = tx.send(Err(Error::DatapathDisconnected));
                    }
                }
            }
        }
    }

    /// Sends `bytes` (already serialized with `xid`) and waits for exactly one reply or error.
    pub async fn send_request(
        &self,
        datapath: &DatapathHandle,
        xid: u32,
        bytes: Bytes,
        timeout_duration: Duration,
    ) -> Result<Message> {
        let key = key_of(datapath, xid);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(key, Pending::Single(tx));

        if let Err(err) = datapath.send_raw(bytes) {
            self.pending.remove(&key);
            return Err(err);
        }

        match timeout(timeout_duration, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::DatapathDisconnected),
            Err(_) => {
                self.pending.remove(&key);
                Err(Error::RequestTimeout {
                    xid,
                    timeout: timeout_duration,
                })
            }
        }
    }

    /// Sends a stats request and accumulates replies until one arrives without
    /// `OFPSF_REPLY_MORE` set.
    pub async fn send_stats_request(
        &self,
        datapath: &DatapathHandle,
        xid: u32,
        bytes: Bytes,
        timeout_duration: Duration,
    ) -> Result<Vec<StatsBody>> {
        let key = key_of(datapath, xid);
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.pending.insert(key, Pending::Stats(tx));

        if let Err(err) = datapath.send_raw(bytes) {
            self.pending.remove(&key);
            return Err(err);
        }

        let mut collected = Vec::new();
        loop {
            match timeout(timeout_duration, rx.recv()).await {
                Ok(Some(Ok(body))) => {
                    collected.push(body);
                    if self.pending.get(&key).is_none() {
                        // The handler already removed the entry: the final (non-MORE) part
                        // arrived and was pushed above before removal raced us; nothing left
                        // to wait for.
                        break;
                    }
                }
                Ok(Some(Err(err))) => {
                    self.pending.remove(&key);
                    return Err(err);
                }
                Ok(None) => return Err(Error::DatapathDisconnected),
                Err(_) => {
                    self.pending.remove(&key);
                    return Err(Error::RequestTimeout {
                        xid,
                        timeout: timeout_duration,
                    });
                }
            }
        }

        if collected.is_empty() {
            return Err(CodecError::BodyTooShort {
                expected: 1,
                actual: 0,
            }
            .into());
        }

        Ok(collected)
    }
}

impl Drop for Correlator {
    fn drop(&mut self) {
        for token in self.tokens.drain(..) {
            registry::inheritable().unregister(token);
        }
    }
}
