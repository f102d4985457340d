// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client creation by service name.
//!
//! ```text
//! fetch description ──► ClientIr ──► Rust source ──► load ──► DynamicClient
//! ```

use crate::client::Connector;
use crate::codegen::{ClientIr, RustEmitter};
use crate::error::RpcResult;
use crate::fetcher::fetch;
use crate::loader::{load, DynamicClient, GeneratedClientArtifact};
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

/// Everything produced while creating a client.
#[derive(Debug)]
pub struct CreatedClient {
    pub ir: ClientIr,
    pub artifact: GeneratedClientArtifact,
    /// Started client, present when the artifact was compiled.
    pub client: Option<DynamicClient>,
}

/// Fetch `service`'s description, synthesize its client and load it.
///
/// Honors the connector's options (`timeout` bounds the fetch, `write` and
/// `compile` control loading). When `options.logger` is set, every stage
/// logs through it instead of the global subscriber.
pub async fn create_client(connector: &Connector, service: &str) -> RpcResult<CreatedClient> {
    let span = tracing::info_span!("create_client", service);
    let run = create(connector, service).instrument(span);
    match connector.options().logger.clone() {
        Some(logger) => run.with_subscriber(logger).await,
        None => run.await,
    }
}

async fn create(connector: &Connector, service: &str) -> RpcResult<CreatedClient> {
    let options = connector.options();

    let description = fetch(connector, service, options.timeout()).await?;
    let ir = ClientIr::from_description(&description);
    tracing::debug!(
        client_type = %ir.client_type,
        methods = ir.methods.len(),
        types = ir.types.len(),
        "description lowered"
    );

    let source = RustEmitter.render(&ir);
    tracing::debug!(bytes = source.len(), "client synthesized");

    let artifact = load(&ir.module_name, source, &ir, options)?;

    let client = match &artifact.compiled_module {
        Some(constructor) => {
            let rpc = connector.client(&ir.module_name)?;
            if let Err(e) = rpc.start().await {
                if let Err(cleanup) = rpc.destroy().await {
                    tracing::warn!(client = %rpc.name(), error = %cleanup, "client cleanup failed");
                }
                return Err(e);
            }
            tracing::info!(client = %rpc.name(), "client ready");
            Some(constructor.construct(rpc))
        }
        None => None,
    };

    Ok(CreatedClient {
        ir,
        artifact,
        client,
    })
}
