// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Shared wire-encoding helpers and a handshake driver for integration tests that play the
//! switch side of the connection over a raw `TcpStream`.

#![allow(dead_code)]

use bytes::{BufMut, BytesMut};
use ofp_dc::{acceptor, Configuration, DatapathHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const OFP_VERSION: u8 = 1;

pub fn header(msg_type: u8, length: u16, xid: u32, buf: &mut BytesMut) {
    buf.put_u8(OFP_VERSION);
    buf.put_u8(msg_type);
    buf.put_u16(length);
    buf.put_u32(xid);
}

pub fn encode_hello(xid: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    header(0, 8, xid, &mut buf);
    buf
}

pub fn encode_features_reply(xid: u32, datapath_id: u64) -> BytesMut {
    let mut buf = BytesMut::new();
    header(6, 24, xid, &mut buf); // FEATURES_REPLY, no ports
    buf.put_u64(datapath_id);
    buf.put_u32(8); // n_buffers
    buf.put_u8(254); // n_tables
    buf.put_bytes(0, 3); // pad
    buf.put_u32(0); // capabilities
    buf.put_u32(0); // actions
    buf
}

pub fn encode_desc_stats_reply(xid: u32) -> BytesMut {
    let body_len = 4 + 256 * 4 + 32;
    let mut buf = BytesMut::new();
    header(17, (8 + body_len) as u16, xid, &mut buf); // STATS_REPLY
    buf.put_u16(0); // OFPST_DESC
    buf.put_u16(0); // flags
    buf.put_bytes(0, body_len - 4);
    buf
}

pub fn encode_barrier_reply(xid: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    header(19, 8, xid, &mut buf); // BARRIER_REPLY
    buf
}

pub fn encode_error(xid: u32, kind: u16, code: u16) -> BytesMut {
    let mut buf = BytesMut::new();
    header(1, 12, xid, &mut buf); // ERROR
    buf.put_u16(kind);
    buf.put_u16(code);
    buf
}

/// One `OFPST_TABLE` stats-reply fragment. `table_id` distinguishes fragments from each other so
/// a test can assert every part actually arrived.
pub fn encode_table_stats_reply(xid: u32, table_id: u8, more: bool) -> BytesMut {
    let entry_len = 64usize;
    let body_len = 4 + entry_len;
    let mut buf = BytesMut::new();
    header(17, (8 + body_len) as u16, xid, &mut buf); // STATS_REPLY
    buf.put_u16(3); // OFPST_TABLE
    buf.put_u16(if more { 1 } else { 0 }); // OFPSF_REPLY_MORE
    buf.put_u8(table_id);
    buf.put_bytes(0, 3); // pad
    buf.put_bytes(0, 32); // name
    buf.put_u32(0); // wildcards
    buf.put_u32(0); // max_entries
    buf.put_u32(0); // active_count
    buf.put_u64(0); // lookup_count
    buf.put_u64(0); // matched_count
    buf
}

pub fn encode_queue_get_config_reply(xid: u32, port: u16) -> BytesMut {
    let mut buf = BytesMut::new();
    header(21, 16, xid, &mut buf); // QUEUE_GET_CONFIG_REPLY
    buf.put_u16(port);
    buf.put_bytes(0, 6); // pad
    buf
}

pub async fn read_header(stream: &mut TcpStream) -> (u8, u16, u32, Vec<u8>) {
    let mut head = [0u8; 8];
    stream.read_exact(&mut head).await.unwrap();
    let msg_type = head[1];
    let length = u16::from_be_bytes([head[2], head[3]]);
    let xid = u32::from_be_bytes([head[4], head[5], head[6], head[7]]);
    let mut body = vec![0u8; length as usize - 8];
    if !body.is_empty() {
        stream.read_exact(&mut body).await.unwrap();
    }
    (msg_type, length, xid, body)
}

/// Binds an ephemeral listener, starts the acceptor on it in the background, and returns the
/// chosen address plus a channel that yields each accepted datapath.
pub async fn start_acceptor() -> (std::net::SocketAddr, mpsc::UnboundedReceiver<DatapathHandle>) {
    ofp_dc::lib_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let config = Arc::new(Configuration::builder().with_listen_port(addr.port()).build());

    let (connected_tx, connected_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = acceptor::serve(config, move |dp| {
            let _ = connected_tx.send(dp);
        })
        .await;
    });

    (addr, connected_rx)
}

/// Drives a freshly-connected client socket through the full handshake (HELLO, FEATURES, DESC,
/// BARRIER) up to `MAIN`, then waits for the accepted datapath to show up on `connected_rx`.
pub async fn drive_handshake_to_main(
    client: &mut TcpStream,
    connected_rx: &mut mpsc::UnboundedReceiver<DatapathHandle>,
    datapath_id: u64,
) -> DatapathHandle {
    let (msg_type, _, _, _) = read_header(client).await;
    assert_eq!(msg_type, 0, "expected HELLO");
    client.write_all(&encode_hello(1)).await.unwrap();

    let (msg_type, _, xid, _) = read_header(client).await;
    assert_eq!(msg_type, 5, "expected FEATURES_REQUEST");
    client
        .write_all(&encode_features_reply(xid, datapath_id))
        .await
        .unwrap();

    let (msg_type, _, xid, _) = read_header(client).await;
    assert_eq!(msg_type, 16, "expected STATS_REQUEST (DESC)");
    client.write_all(&encode_desc_stats_reply(xid)).await.unwrap();

    let (msg_type, _, xid, _) = read_header(client).await;
    assert_eq!(msg_type, 18, "expected BARRIER_REQUEST");
    client.write_all(&encode_barrier_reply(xid)).await.unwrap();

    let dp = tokio::time::timeout(Duration::from_secs(2), connected_rx.recv())
        .await
        .expect("datapath connected before timeout")
        .expect("channel open");

    for _ in 0..50 {
        if dp.datapath_id() == Some(datapath_id) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(dp.datapath_id(), Some(datapath_id));
    dp
}
