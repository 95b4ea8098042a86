// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The [`Datapath`] connection object: one per accepted TCP connection from a switch.
//!
//! Three tasks cooperate per datapath, mirroring the reference implementation's three greenlets
//! (`_recv_loop`, `_send_loop`, `_event_loop`):
//!   - the recv task reads framed [`crate::wire::Message`]s and turns each into an
//!     [`Event::Ofp`], queuing it on the event queue;
//!   - the send task drains an outbound byte channel straight onto the socket;
//!   - the event-queue drain task (owned by [`crate::dispatch::EventQueue`] itself) hands each
//!     event to the dispatcher that's current at the moment it's drained.
//!
//! All three share nothing but channels and `Arc<Datapath>`, so a panic or early return in one
//! doesn't wedge the others; [`Datapath::mark_dead`] is what actually tears the connection down.

use crate::config::Configuration;
use crate::dispatch::{DispatcherName, EventQueue, EventQueueHandle};
use crate::event::Event;
use crate::wire::{DescStats, Ofp10Codec, PhyPort, PortReason, SwitchFeatures};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Decoder;

/// Largest single read off the socket per syscall, matching `ofproto.OFP_MSG_SIZE_MAX`'s role in
/// the reference implementation's recv loop.
const READ_CHUNK: usize = 64 * 1024;

/// Shared handle to a connected switch. Cloned freely; internally reference-counted.
pub type DatapathHandle = Arc<Datapath>;

/// Per-connection xid generator: increment-then-return, matching `Datapath.set_xid`'s
/// increment-then-mask (the mask is a no-op here since the field is already a `u32`).
struct XidState {
    next: u32,
}

pub struct Datapath {
    pub address: SocketAddr,
    is_active: AtomicBool,
    xid: Mutex<XidState>,
    datapath_id: AtomicU64,
    datapath_id_known: AtomicBool,
    ports: Mutex<Vec<PhyPort>>,
    features: Mutex<Option<SwitchFeatures>>,
    desc: Mutex<Option<DescStats>>,
    send_tx: mpsc::UnboundedSender<Bytes>,
    close_tx: watch::Sender<bool>,
    event_queue: EventQueueHandle,
    pub config: Arc<Configuration>,
}

impl Datapath {
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }

    pub fn datapath_id(&self) -> Option<u64> {
        self.datapath_id_known
            .load(Ordering::Acquire)
            .then(|| self.datapath_id.load(Ordering::Acquire))
    }

    pub fn set_datapath_id(&self, id: u64) {
        self.datapath_id.store(id, Ordering::Release);
        self.datapath_id_known.store(true, Ordering::Release);
    }

    pub fn ports(&self) -> Vec<PhyPort> {
        self.ports.lock().clone()
    }

    pub fn set_ports(&self, ports: Vec<PhyPort>) {
        *self.ports.lock() = ports;
    }

    pub fn apply_port_status(&self, reason: PortReason, port: PhyPort) {
        let mut ports = self.ports.lock();
        match reason {
            PortReason::Add => ports.push(port),
            PortReason::Delete => ports.retain(|p| p.port_no != port.port_no),
            PortReason::Modify => {
                if let Some(existing) = ports.iter_mut().find(|p| p.port_no == port.port_no) {
                    *existing = port;
                } else {
                    ports.push(port);
                }
            }
        }
    }

    pub fn features(&self) -> Option<SwitchFeatures> {
        self.features.lock().clone()
    }

    pub fn set_features(&self, features: SwitchFeatures) {
        *self.features.lock() = Some(features);
    }

    pub fn desc(&self) -> Option<DescStats> {
        self.desc.lock().clone()
    }

    pub fn set_desc(&self, desc: DescStats) {
        *self.desc.lock() = Some(desc);
    }

    /// Forces the datapath into the `DEAD` phase immediately, e.g. after a fatal protocol
    /// violation such as a `HELLO` version mismatch. Flips the close signal the send/recv tasks
    /// race against their blocking I/O, so both unwind and the socket is actually shut down
    /// rather than left to the peer's discretion.
    pub fn disconnect(self: &Arc<Self>) {
        self.mark_dead();
    }

    pub fn event_queue(&self) -> &EventQueueHandle {
        &self.event_queue
    }

    pub fn current_dispatcher(&self) -> DispatcherName {
        self.event_queue.current_dispatcher()
    }

    /// Allocates the next xid for this datapath.
    pub fn next_xid(&self) -> u32 {
        let mut state = self.xid.lock();
        state.next = state.next.wrapping_add(1);
        state.next
    }

    /// Queues a fully-encoded wire message for the send task. Unlike `send_msg` in the reference
    /// implementation, xid assignment is the caller's job (see [`crate::datapath::ops`]) since
    /// every [`crate::wire::Encoder`] builder takes the xid up front instead of patching it in
    /// after serialization.
    pub fn send_raw(&self, bytes: Bytes) -> Result<(), crate::error::Error> {
        self.send_tx
            .send(bytes)
            .map_err(|_| crate::error::Error::DatapathDisconnected)
    }

    fn mark_dead(self: &Arc<Self>) {
        if self
            .is_active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.event_queue.set_dispatcher(DispatcherName::Dead);
            let _ = self.close_tx.send(true);
        }
    }
}

/// Accepts an already-connected socket and spins up the three tasks that keep it alive. Sends
/// `OFPT_HELLO` immediately, matching `Datapath.serve`.
pub fn spawn(stream: TcpStream, address: SocketAddr, config: Arc<Configuration>) -> DatapathHandle {
    let (send_tx, mut send_rx) = mpsc::unbounded_channel::<Bytes>();
    let (close_tx, mut send_close_rx) = watch::channel(false);
    let mut recv_close_rx = close_tx.subscribe();

    // `Arc::new_cyclic` hands us a `Weak<Datapath>` before the datapath itself is constructed,
    // which is exactly the backreference the event queue's `aux` slot needs (see
    // `EventQueue::new` and the weakref-to-self pattern this is grounded on).
    let datapath = Arc::new_cyclic(|weak: &Weak<Datapath>| {
        let event_queue = EventQueue::new(DispatcherName::Handshake, Some(weak.clone()));
        Datapath {
            address,
            is_active: AtomicBool::new(true),
            xid: Mutex::new(XidState {
                next: initial_xid(),
            }),
            datapath_id: AtomicU64::new(0),
            datapath_id_known: AtomicBool::new(false),
            ports: Mutex::new(Vec::new()),
            features: Mutex::new(None),
            desc: Mutex::new(None),
            send_tx,
            close_tx,
            event_queue: event_queue.spawn(),
            config,
        }
    });

    let (mut stream_read, mut stream_write) = stream.into_split();

    let send_task_dp = Arc::clone(&datapath);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = send_close_rx.changed() => break,
                bytes = send_rx.recv() => {
                    let Some(bytes) = bytes else { break };
                    if stream_write.write_all(&bytes).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = stream_write.shutdown().await;
        send_task_dp.mark_dead();
    });

    let recv_task_dp = Arc::clone(&datapath);
    tokio::spawn(async move {
        let mut codec = Ofp10Codec::default();
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        'recv: loop {
            match codec.decode(&mut buf) {
                Ok(Some(msg)) => {
                    recv_task_dp
                        .event_queue
                        .queue(Event::Ofp(Arc::clone(&recv_task_dp), Arc::new(msg)));
                    continue;
                }
                Ok(None) => {}
                // A malformed header means framing itself is unrecoverable: we no longer know
                // where the next message starts, so the connection can't continue. Any other
                // parse error means the frame was already split off intact; drop the one
                // message and keep reading.
                Err(crate::wire::CodecError::LengthBelowHeader { .. }) => {
                    tracing::warn!(address = %recv_task_dp.address, "malformed OpenFlow header, closing connection");
                    break;
                }
                Err(err) => {
                    tracing::warn!(address = %recv_task_dp.address, error = %err, "dropping malformed OpenFlow message");
                    continue;
                }
            }

            buf.reserve(READ_CHUNK);
            tokio::select! {
                biased;
                _ = recv_close_rx.changed() => break 'recv,
                read = stream_read.read_buf(&mut buf) => {
                    match read {
                        Ok(0) => break 'recv,
                        Ok(_) => {}
                        Err(err) => {
                            tracing::debug!(address = %recv_task_dp.address, error = %err, "recv error");
                            break 'recv;
                        }
                    }
                }
            }
        }
        recv_task_dp.mark_dead();
    });

    let hello_xid = datapath.next_xid();
    let _ = datapath.send_raw(crate::wire::Encoder::hello(hello_xid));

    datapath
}

fn initial_xid() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0)
}
