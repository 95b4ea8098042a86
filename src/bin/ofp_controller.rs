// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Standalone controller binary: bind, accept, log. Applications wanting programmatic access to
//! datapaths as they join should call the library directly rather than shell out to this.

use ofp_dc::Configuration;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ofp_dc::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    ofp_dc::lib_init();

    let config = Arc::new(Configuration::builder().from_env()?.build());

    ofp_dc::acceptor::serve(config, |datapath| {
        tracing::info!(address = %datapath.address, "datapath connected");
    })
    .await?;

    Ok(())
}
