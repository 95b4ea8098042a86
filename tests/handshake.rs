// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end handshake coverage: a raw TCP client plays the role of the switch and is driven
//! through every phase up to `MAIN`, then the negotiated connection is torn down and observed to
//! reach `DEAD`.

use bytes::{BufMut, BytesMut};
use ofp_dc::{acceptor, Configuration};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const OFP_VERSION: u8 = 1;

fn header(msg_type: u8, length: u16, xid: u32, buf: &mut BytesMut) {
    buf.put_u8(OFP_VERSION);
    buf.put_u8(msg_type);
    buf.put_u16(length);
    buf.put_u32(xid);
}

fn encode_hello(xid: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    header(0, 8, xid, &mut buf);
    buf
}

fn encode_features_reply(xid: u32, datapath_id: u64) -> BytesMut {
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

fn encode_desc_stats_reply(xid: u32) -> BytesMut {
    let body_len = 4 + 256 * 4 + 32;
    let mut buf = BytesMut::new();
    header(17, (8 + body_len) as u16, xid, &mut buf); // STATS_REPLY
    buf.put_u16(0); // OFPST_DESC
    buf.put_u16(0); // flags
    buf.put_bytes(0, body_len - 4);
    buf
}

fn encode_barrier_reply(xid: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    header(19, 8, xid, &mut buf); // BARRIER_REPLY
    buf
}

async fn read_header(stream: &mut TcpStream) -> (u8, u16, u32, Vec<u8>) {
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

#[tokio::test]
async fn full_handshake_reaches_main_with_datapath_id() {
    ofp_dc::lib_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = Arc::new(Configuration::builder().with_listen_port(addr.port()).build());

    let (connected_tx, mut connected_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = acceptor::serve(config, move |dp| {
            let _ = connected_tx.send(dp);
        })
        .await;
    });

    let mut client = TcpStream::connect(addr).await.unwrap();

    // Server sends HELLO immediately on accept.
    let (msg_type, _, _, _) = read_header(&mut client).await;
    assert_eq!(msg_type, 0, "expected HELLO");

    client.write_all(&encode_hello(1)).await.unwrap();

    let (msg_type, _, xid, _) = read_header(&mut client).await;
    assert_eq!(msg_type, 5, "expected FEATURES_REQUEST");
    client
        .write_all(&encode_features_reply(xid, 0xdead_beef))
        .await
        .unwrap();

    let (msg_type, _, xid, body) = read_header(&mut client).await;
    assert_eq!(msg_type, 16, "expected STATS_REQUEST");
    assert_eq!(u16::from_be_bytes([body[0], body[1]]), 0, "expected OFPST_DESC");
    client.write_all(&encode_desc_stats_reply(xid)).await.unwrap();

    let (msg_type, _, xid, _) = read_header(&mut client).await;
    assert_eq!(msg_type, 18, "expected BARRIER_REQUEST");
    client.write_all(&encode_barrier_reply(xid)).await.unwrap();

    let datapath = tokio::time::timeout(Duration::from_secs(2), connected_rx.recv())
        .await
        .expect("datapath connected before timeout")
        .expect("channel open");

    // Give the barrier-reply handler a moment to run after we wrote the reply.
    for _ in 0..50 {
        if datapath.datapath_id() == Some(0xdead_beef) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(datapath.datapath_id(), Some(0xdead_beef));
    assert!(datapath.is_active());
}

#[tokio::test]
async fn incompatible_hello_version_disconnects() {
    ofp_dc::lib_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = Arc::new(Configuration::builder().with_listen_port(addr.port()).build());

    let (connected_tx, mut connected_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = acceptor::serve(config, move |dp| {
            let _ = connected_tx.send(dp);
        })
        .await;
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    let (msg_type, _, _, _) = read_header(&mut client).await;
    assert_eq!(msg_type, 0);

    let mut bad_hello = BytesMut::new();
    bad_hello.put_u8(0); // version 0 negotiates below the controller's only supported version
    bad_hello.put_u8(0);
    bad_hello.put_u16(8);
    bad_hello.put_u32(1);
    client.write_all(&bad_hello).await.unwrap();

    let (msg_type, _, _, body) = read_header(&mut client).await;
    assert_eq!(msg_type, 1, "expected OFPT_ERROR");
    assert_eq!(u16::from_be_bytes([body[0], body[1]]), 0, "OFPET_HELLO_FAILED");

    let datapath = tokio::time::timeout(Duration::from_secs(2), connected_rx.recv())
        .await
        .unwrap()
        .unwrap();

    for _ in 0..50 {
        if !datapath.is_active() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!datapath.is_active());
}
