// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Generated by mqrpc from the `CalculatorService` description. Do not edit.

#[allow(non_snake_case)]
pub mod calculatorClient {
    #![allow(non_camel_case_types, dead_code, unused_imports, clippy::all)]

    pub const SERVICE_NAME: &str = "CalculatorService";

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde")]
    pub struct Point {
        #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
        pub label: ::std::option::Option<::std::string::String>,
        pub x: f64,
        pub y: f64,
    }

    /// Typed client for `CalculatorService`.
    #[derive(Debug, Clone)]
    pub struct CalculatorClient {
        client: ::mqrpc::RpcClient,
    }

    impl CalculatorClient {
        /// Adds two numbers.
        pub async fn add(&self, a: f64, b: f64, delay: ::std::option::Option<::mqrpc::DelaySpec>) -> ::mqrpc::RpcResult<f64> {
            let mut args = ::std::vec::Vec::with_capacity(3);
            args.push(::mqrpc::CallArg::value(&a)?);
            args.push(::mqrpc::CallArg::value(&b)?);
            if let ::std::option::Option::Some(delay) = delay {
                args.push(::mqrpc::CallArg::from(delay));
            }
            self.client
                .call_typed(SERVICE_NAME, "add", args)
                .await
        }

        pub async fn reset(&self, delay: ::std::option::Option<::mqrpc::DelaySpec>) -> ::mqrpc::RpcResult<()> {
            let mut args = ::std::vec::Vec::with_capacity(1);
            if let ::std::option::Option::Some(delay) = delay {
                args.push(::mqrpc::CallArg::from(delay));
            }
            self.client
                .call(SERVICE_NAME, "reset", args)
                .await
                .map(|_| ())
        }

        pub async fn scale(&self, p: Point, factor: f64, delay: ::std::option::Option<::mqrpc::DelaySpec>) -> ::mqrpc::RpcResult<Point> {
            let mut args = ::std::vec::Vec::with_capacity(3);
            args.push(::mqrpc::CallArg::value(&p)?);
            args.push(::mqrpc::CallArg::value(&factor)?);
            if let ::std::option::Option::Some(delay) = delay {
                args.push(::mqrpc::CallArg::from(delay));
            }
            self.client
                .call_typed(SERVICE_NAME, "scale", args)
                .await
        }
    }

    impl ::mqrpc::StubClient for CalculatorClient {
        const SERVICE_NAME: &'static str = SERVICE_NAME;

        fn from_client(client: ::mqrpc::RpcClient) -> Self {
            Self { client }
        }

        fn client(&self) -> &::mqrpc::RpcClient {
            &self.client
        }
    }
}
