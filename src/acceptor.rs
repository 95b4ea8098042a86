// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! TCP listener loop, grounded on `OpenFlowController.server_loop` in the reference
//! implementation and on the accept-loop shape of `stream::server::tokio::tcp::Acceptor`.

use crate::config::Configuration;
use crate::datapath::DatapathHandle;
use crate::error::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Binds [`Configuration::listen_host`]:[`Configuration::listen_port`] and accepts connections
/// forever, spawning a [`crate::datapath::spawn`] per accepted socket.
///
/// `on_connect` is called with every freshly-spawned [`DatapathHandle`] before the accept loop
/// continues; callers that want to observe every connection (tests, metrics, a supplemental
/// admin surface) hook in there instead of polling [`crate::dpset::DPSet`].
pub async fn serve(
    config: Arc<Configuration>,
    mut on_connect: impl FnMut(DatapathHandle) + Send,
) -> Result<()> {
    let listener = bind(&config).await?;
    tracing::info!(host = config.listen_host(), port = config.listen_port(), "listening");

    loop {
        let (stream, address) = listener.accept().await?;
        tracing::debug!(%address, "accepted connection");
        let datapath = crate::datapath::spawn(stream, address, Arc::clone(&config));
        on_connect(datapath);
    }
}

async fn bind(config: &Configuration) -> Result<TcpListener> {
    let addr = format!(
        "{}:{}",
        if config.listen_host().is_empty() {
            "0.0.0.0"
        } else {
            config.listen_host()
        },
        config.listen_port()
    );
    Ok(TcpListener::bind(addr).await?)
}
