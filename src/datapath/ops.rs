// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Convenience message-sending operations on [`Datapath`], mirroring the `send_*`/`request_*`
//! methods the reference implementation hangs off of `Datapath` directly.

use super::connection::Datapath;
use crate::correlator::Correlator;
use crate::error::Result;
use crate::wire::{
    Action, DescStats, Encoder, Match, PortStats, QueueStats, TableStats, OFPP_NONE,
};
use std::time::Duration;

impl Datapath {
    pub fn send_packet_out(&self, buffer_id: u32, in_port: Option<u16>, actions: &[Action], data: &[u8]) -> Result<()> {
        let xid = self.next_xid();
        let bytes = Encoder::packet_out(xid, buffer_id, in_port.unwrap_or(OFPP_NONE), actions, data);
        self.send_raw(bytes)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn send_flow_mod(
        &self,
        matched: &Match,
        cookie: u64,
        command: u16,
        idle_timeout: u16,
        hard_timeout: u16,
        priority: u16,
        buffer_id: u32,
        out_port: Option<u16>,
        flags: u16,
        actions: &[Action],
    ) -> Result<()> {
        let xid = self.next_xid();
        let bytes = Encoder::flow_mod(
            xid,
            matched,
            cookie,
            command,
            idle_timeout,
            hard_timeout,
            priority,
            buffer_id,
            out_port.unwrap_or(OFPP_NONE),
            flags,
            actions,
        );
        self.send_raw(bytes)
    }

    pub fn send_flow_del(&self, matched: &Match, cookie: u64, out_port: Option<u16>) -> Result<()> {
        self.send_flow_mod(
            matched,
            cookie,
            crate::wire::flow_mod_command::DELETE,
            0,
            0,
            0,
            0xffffffff,
            out_port,
            0,
            &[],
        )
    }

    pub fn send_delete_all_flows(&self) -> Result<()> {
        self.send_flow_del(&Match::wildcard_all(), 0, None)
    }

    pub fn send_barrier(&self) -> Result<()> {
        let xid = self.next_xid();
        self.send_raw(Encoder::barrier_request(xid))
    }

    pub fn send_set_config(&self, flags: u16, miss_send_len: u16) -> Result<()> {
        let xid = self.next_xid();
        self.send_raw(Encoder::set_config(xid, flags, miss_send_len))
    }
}

/// Request/reply operations layered on top of [`Correlator`]. These take `&self` plus a
/// correlator reference rather than living directly on `Datapath`, since correlation state is
/// owned by the correlator, not the connection (see the design ledger entry for why this split
/// differs from the reference implementation's `_do_send_request`).
impl Datapath {
    pub async fn request_queue_config(
        self: &std::sync::Arc<Self>,
        correlator: &Correlator,
        port_no: u16,
        timeout: Duration,
    ) -> Result<crate::wire::Message> {
        let xid = self.next_xid();
        let bytes = Encoder::queue_get_config_request(xid, port_no);
        correlator
            .send_request(self, xid, bytes, timeout)
            .await
    }

    pub async fn request_desc_stats(
        self: &std::sync::Arc<Self>,
        correlator: &Correlator,
        timeout: Duration,
    ) -> Result<DescStats> {
        let xid = self.next_xid();
        let bytes = Encoder::desc_stats_request(xid);
        let replies = correlator.send_stats_request(self, xid, bytes, timeout).await?;
        match replies.into_iter().next() {
            Some(crate::wire::StatsBody::Desc(desc)) => Ok(*desc),
            _ => Err(crate::error::Error::Codec(crate::wire::CodecError::BodyTooShort {
                expected: 1,
                actual: 0,
            })),
        }
    }

    pub async fn request_table_stats(
        self: &std::sync::Arc<Self>,
        correlator: &Correlator,
        timeout: Duration,
    ) -> Result<Vec<TableStats>> {
        let xid = self.next_xid();
        let bytes = Encoder::table_stats_request(xid);
        let replies = correlator.send_stats_request(self, xid, bytes, timeout).await?;
        Ok(replies
            .into_iter()
            .flat_map(|b| match b {
                crate::wire::StatsBody::Table(entries) => entries,
                _ => Vec::new(),
            })
            .collect())
    }

    pub async fn request_port_stats(
        self: &std::sync::Arc<Self>,
        correlator: &Correlator,
        port_no: u16,
        timeout: Duration,
    ) -> Result<Vec<PortStats>> {
        let xid = self.next_xid();
        let bytes = Encoder::port_stats_request(xid, port_no);
        let replies = correlator.send_stats_request(self, xid, bytes, timeout).await?;
        Ok(replies
            .into_iter()
            .flat_map(|b| match b {
                crate::wire::StatsBody::Port(entries) => entries,
                _ => Vec::new(),
            })
            .collect())
    }

    pub async fn request_queue_stats(
        self: &std::sync::Arc<Self>,
        correlator: &Correlator,
        port_no: u16,
        queue_id: u32,
        timeout: Duration,
    ) -> Result<Vec<QueueStats>> {
        let xid = self.next_xid();
        let bytes = Encoder::queue_stats_request(xid, port_no, queue_id);
        let replies = correlator.send_stats_request(self, xid, bytes, timeout).await?;
        Ok(replies
            .into_iter()
            .flat_map(|b| match b {
                crate::wire::StatsBody::Queue(entries) => entries,
                _ => Vec::new(),
            })
            .collect())
    }
}
