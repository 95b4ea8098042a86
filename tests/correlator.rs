// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reply-correlation coverage once a datapath has reached `MAIN`: a single-reply request, a
//! multi-part stats aggregation, a request that gets matched against an `OFPT_ERROR` instead of
//! its expected reply, and a request left pending when the datapath disconnects.

mod common;

use common::*;
use ofp_dc::{Correlator, Error};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn single_reply_request_completes_with_matching_reply() {
    let (addr, mut connected_rx) = start_acceptor().await;
    let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
    let dp = drive_handshake_to_main(&mut client, &mut connected_rx, 0x1111).await;

    let correlator = Correlator::new();
    let dp_for_request = dp.clone();
    let correlator_for_request = correlator.clone();
    let request = tokio::spawn(async move {
        dp_for_request
            .request_queue_config(&correlator_for_request, 3, REQUEST_TIMEOUT)
            .await
    });

    let (msg_type, _, xid, body) = read_header(&mut client).await;
    assert_eq!(msg_type, 20, "expected QUEUE_GET_CONFIG_REQUEST");
    assert_eq!(u16::from_be_bytes([body[0], body[1]]), 3, "requested port");
    client
        .write_all(&encode_queue_get_config_reply(xid, 3))
        .await
        .unwrap();

    let reply = request.await.unwrap().expect("reply arrives");
    match reply {
        ofp_dc::wire::Message::QueueGetConfigReply { port, .. } => assert_eq!(port, 3),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn multi_part_stats_reply_is_aggregated_across_fragments() {
    let (addr, mut connected_rx) = start_acceptor().await;
    let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
    let dp = drive_handshake_to_main(&mut client, &mut connected_rx, 0x2222).await;

    let correlator = Correlator::new();
    let dp_for_request = dp.clone();
    let correlator_for_request = correlator.clone();
    let request = tokio::spawn(async move {
        dp_for_request
            .request_table_stats(&correlator_for_request, REQUEST_TIMEOUT)
            .await
    });

    let (msg_type, _, xid, _) = read_header(&mut client).await;
    assert_eq!(msg_type, 16, "expected STATS_REQUEST (TABLE)");

    client
        .write_all(&encode_table_stats_reply(xid, 0, true))
        .await
        .unwrap();
    client
        .write_all(&encode_table_stats_reply(xid, 1, true))
        .await
        .unwrap();
    client
        .write_all(&encode_table_stats_reply(xid, 2, false))
        .await
        .unwrap();

    let tables = request.await.unwrap().expect("all fragments arrive");
    let mut table_ids: Vec<u8> = tables.iter().map(|t| t.table_id).collect();
    table_ids.sort();
    assert_eq!(table_ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn error_matched_request_completes_with_ofp_error_and_leaves_connection_up() {
    let (addr, mut connected_rx) = start_acceptor().await;
    let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
    let dp = drive_handshake_to_main(&mut client, &mut connected_rx, 0x3333).await;

    let correlator = Correlator::new();
    let dp_for_request = dp.clone();
    let correlator_for_request = correlator.clone();
    let request = tokio::spawn(async move {
        dp_for_request
            .request_queue_config(&correlator_for_request, 7, REQUEST_TIMEOUT)
            .await
    });

    let (msg_type, _, xid, _) = read_header(&mut client).await;
    assert_eq!(msg_type, 20, "expected QUEUE_GET_CONFIG_REQUEST");
    client
        .write_all(&encode_error(xid, 1, 0)) // OFPET_BAD_REQUEST / OFPBRC_BAD_VERSION
        .await
        .unwrap();

    match request.await.unwrap() {
        Err(Error::OfpError { kind, code, .. }) => {
            assert_eq!(kind, 1);
            assert_eq!(code, 0);
        }
        other => panic!("expected Error::OfpError, got {other:?}"),
    }

    // A correlated error must not tear the connection down; only a HELLO-failed error during the
    // handshake does that.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(dp.is_active());
}

#[tokio::test]
async fn disconnect_while_request_pending_fails_it_with_datapath_disconnected() {
    let (addr, mut connected_rx) = start_acceptor().await;
    let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
    let dp = drive_handshake_to_main(&mut client, &mut connected_rx, 0x4444).await;

    let correlator = Correlator::new();
    let dp_for_request = dp.clone();
    let correlator_for_request = correlator.clone();
    let request = tokio::spawn(async move {
        dp_for_request
            .request_queue_config(&correlator_for_request, 1, REQUEST_TIMEOUT)
            .await
    });

    let (msg_type, _, _, _) = read_header(&mut client).await;
    assert_eq!(msg_type, 20, "expected QUEUE_GET_CONFIG_REQUEST");

    // The switch vanishes instead of replying.
    drop(client);

    match request.await.unwrap() {
        Err(Error::DatapathDisconnected) => {}
        other => panic!("expected Error::DatapathDisconnected, got {other:?}"),
    }

    for _ in 0..50 {
        if !dp.is_active() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!dp.is_active());
}
