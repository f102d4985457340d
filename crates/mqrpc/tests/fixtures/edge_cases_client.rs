// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Generated by mqrpc from the `EdgeCaseService` description. Do not edit.

#[allow(non_snake_case)]
pub mod edgeCaseClient {
    #![allow(non_camel_case_types, dead_code, unused_imports, clippy::all)]

    pub const SERVICE_NAME: &str = "EdgeCaseService";

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde")]
    pub struct A {
        #[serde(flatten)]
        pub base: B,
        pub a: f64,
    }

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde")]
    pub struct B {
        pub b: f64,
    }

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde")]
    pub struct Child {
        #[serde(rename = "fooBar")]
        pub foo_bar: f64,
        #[serde(rename = "foo_bar")]
        pub foo_bar_: f64,
        #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
        pub parent: ::std::option::Option<::std::boxed::Box<Parent>>,
    }

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde")]
    pub struct Circle {
        #[serde(flatten)]
        pub base: Parent,
        pub radius: f64,
    }

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde")]
    pub struct Parent {
        pub child: ::std::option::Option<::std::boxed::Box<Child>>,
        pub name: ::std::string::String,
    }

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde")]
    pub struct Point {
        pub y: f64,
    }

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde")]
    pub struct Tags {
        pub owner: ::std::string::String,
        /// Index signature: `[key: string]: string`
        #[serde(flatten)]
        pub extra: ::std::collections::HashMap<::std::string::String, ::std::string::String>,
    }

    #[derive(Debug, Clone, PartialEq, ::mqrpc::serde::Serialize, ::mqrpc::serde::Deserialize)]
    #[serde(crate = "::mqrpc::serde", rename = "point")]
    pub struct Point_ {
        pub x: f64,
    }

    /// Typed client for `EdgeCaseService`.
    #[derive(Debug, Clone)]
    pub struct EdgeCaseClient {
        client: ::mqrpc::RpcClient,
    }

    impl EdgeCaseClient {
        pub async fn exec(&self, args: ::std::vec::Vec<::std::string::String>, delay: ::std::option::Option<::mqrpc::DelaySpec>) -> ::mqrpc::RpcResult<::std::string::String> {
            let mut args_ = ::std::vec::Vec::with_capacity(2);
            args_.push(::mqrpc::CallArg::value(&args)?);
            if let ::std::option::Option::Some(delay) = delay {
                args_.push(::mqrpc::CallArg::from(delay));
            }
            self.client
                .call_typed(SERVICE_NAME, "exec", args_)
                .await
        }

        pub async fn get_x(&self, delay: ::std::option::Option<::mqrpc::DelaySpec>) -> ::mqrpc::RpcResult<f64> {
            let mut args = ::std::vec::Vec::with_capacity(1);
            if let ::std::option::Option::Some(delay) = delay {
                args.push(::mqrpc::CallArg::from(delay));
            }
            self.client
                .call_typed(SERVICE_NAME, "getX", args)
                .await
        }

        pub async fn get_x_(&self, delay: ::std::option::Option<::mqrpc::DelaySpec>) -> ::mqrpc::RpcResult<f64> {
            let mut args = ::std::vec::Vec::with_capacity(1);
            if let ::std::option::Option::Some(delay) = delay {
                args.push(::mqrpc::CallArg::from(delay));
            }
            self.client
                .call_typed(SERVICE_NAME, "get_x", args)
                .await
        }

        pub async fn locate(&self, at: Point_, delay: ::std::option::Option<::mqrpc::DelaySpec>) -> ::mqrpc::RpcResult<Point> {
            let mut args = ::std::vec::Vec::with_capacity(2);
            args.push(::mqrpc::CallArg::value(&at)?);
            if let ::std::option::Option::Some(delay) = delay {
                args.push(::mqrpc::CallArg::from(delay));
            }
            self.client
                .call_typed(SERVICE_NAME, "locate", args)
                .await
        }

        pub async fn schedule(&self, r#type: ::std::string::String, after: ::mqrpc::DelaySpec) -> ::mqrpc::RpcResult<()> {
            let mut args = ::std::vec::Vec::with_capacity(2);
            args.push(::mqrpc::CallArg::value(&r#type)?);
            args.push(::mqrpc::CallArg::from(after));
            self.client
                .call(SERVICE_NAME, "schedule", args)
                .await
                .map(|_| ())
        }

        pub async fn walk(&self, tree: Parent, delay: ::std::option::Option<::mqrpc::DelaySpec>) -> ::mqrpc::RpcResult<::std::option::Option<Child>> {
            let mut args = ::std::vec::Vec::with_capacity(2);
            args.push(::mqrpc::CallArg::value(&tree)?);
            if let ::std::option::Option::Some(delay) = delay {
                args.push(::mqrpc::CallArg::from(delay));
            }
            self.client
                .call_typed(SERVICE_NAME, "walk", args)
                .await
        }
    }

    impl ::mqrpc::StubClient for EdgeCaseClient {
        const SERVICE_NAME: &'static str = SERVICE_NAME;

        fn from_client(client: ::mqrpc::RpcClient) -> Self {
            Self { client }
        }

        fn client(&self) -> &::mqrpc::RpcClient {
            &self.client
        }
    }
}
