// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Description fetching.
//!
//! A transient probe client named `<service>.describe` asks the service
//! for its description. The probe is destroyed on every path.

use crate::client::Connector;
use crate::error::{RpcError, RpcResult};
use crate::schema::{ServiceDescription, DESCRIBE_METHOD};
use std::time::Duration;

/// Base name of the probe client used to describe `service`.
pub fn probe_name(service: &str) -> String {
    format!("{}.{}", service, DESCRIBE_METHOD)
}

/// Fetch the description of `service`, giving up after `timeout`.
///
/// Fails with [`RpcError::Timeout`] naming the service when nothing answers
/// in time; remote and transport errors are propagated unchanged.
pub async fn fetch(
    connector: &Connector,
    service: &str,
    timeout: Duration,
) -> RpcResult<ServiceDescription> {
    let probe = connector.client(&probe_name(service))?;
    tracing::debug!(service, probe = %probe.name(), timeout_ms = timeout.as_millis() as u64, "fetching description");

    let outcome = match probe.start().await {
        Ok(()) => tokio::time::timeout(
            timeout,
            probe.call_typed::<ServiceDescription>(service, DESCRIBE_METHOD, Vec::new()),
        )
        .await
        .unwrap_or_else(|_| {
            Err(RpcError::Timeout {
                service: service.to_string(),
            })
        }),
        Err(e) => Err(e),
    };

    if let Err(e) = probe.destroy().await {
        tracing::warn!(service, error = %e, "probe client cleanup failed");
    }

    match &outcome {
        Ok(desc) => tracing::debug!(
            service,
            methods = desc.methods.len(),
            types = desc.types.len(),
            "description fetched"
        ),
        Err(e) => tracing::warn!(service, error = %e, "description fetch failed"),
    }
    outcome
}
