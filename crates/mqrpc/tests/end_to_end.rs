// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client creation and call routing across the public API.

use mqrpc::codegen::parse_types;
use mqrpc::schema::{MethodDescription, TypeDescription};
use mqrpc::{
    create_client, synthesize, CallArg, Connector, DelaySpec, InProcessIds, LifecycleState,
    MemoryBroker, MethodTable, Options, Response, RpcError, ServiceDescription, DESCRIBE_METHOD,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn calculator() -> ServiceDescription {
    ServiceDescription::new("CalculatorService")
        .with_type(
            "Shape",
            TypeDescription::new()
                .property("name", "string", false)
                .property("color", "string | null", true),
        )
        .with_type(
            "Circle",
            TypeDescription::new()
                .property("radius", "number", false)
                .property("centerPoint", "number[]", true)
                .inherits("Shape"),
        )
        .with_type(
            "Tags",
            TypeDescription::new()
                .property("owner", "string", false)
                .index_signature("[key: string]: string"),
        )
        .with_method(
            "add",
            MethodDescription::new("Promise<number>")
                .arg("a", "number")
                .arg("b", "number"),
        )
        .with_method(
            "area",
            MethodDescription::new("Promise<number>").arg("shape", "Circle"),
        )
        .with_method(
            "greet",
            MethodDescription::new("Promise<string>").optional_arg("name", "string"),
        )
}

fn serve(broker: &MemoryBroker, desc: ServiceDescription) {
    let desc = serde_json::to_value(desc).unwrap();
    broker
        .serve("CalculatorService", move |req| match req.method.as_str() {
            DESCRIBE_METHOD => Ok(desc.clone()),
            "add" => Ok(json!(req.args.iter().filter_map(Value::as_f64).sum::<f64>())),
            "greet" => match req.args.first().and_then(Value::as_str) {
                Some(name) => Ok(json!(format!("hello {}", name))),
                None => Ok(json!("hello")),
            },
            _ => Err(json!({ "message": "unsupported" })),
        })
        .unwrap();
}

fn connector(broker: &MemoryBroker, options: Options) -> Connector {
    Connector::new(
        Arc::new(broker.clone()),
        Arc::new(InProcessIds::new()),
        options,
    )
}

fn args(values: &[Value]) -> Vec<CallArg> {
    values.iter().cloned().map(CallArg::from).collect()
}

#[tokio::test]
async fn created_client_calls_the_service() {
    let broker = MemoryBroker::new();
    serve(&broker, calculator());
    let connector = connector(&broker, Options::default());

    let created = create_client(&connector, "CalculatorService").await.unwrap();
    assert_eq!(created.ir.client_type, "CalculatorClient");
    assert!(created.artifact.source_text.contains("pub mod calculatorClient {"));
    assert!(created.artifact.source_path.is_none());

    let calc = created.client.unwrap();
    assert_eq!(calc.service_name(), "CalculatorService");
    assert!(calc.has_method("add"));
    assert!(!calc.has_method(DESCRIBE_METHOD));
    assert_eq!(calc.client().state(), LifecycleState::Started);

    let sum: f64 = calc.invoke_typed("add", args(&[json!(1), json!(2)])).await.unwrap();
    assert_eq!(sum, 3.0);

    let greeting = calc.invoke("greet", Vec::new()).await.unwrap();
    assert_eq!(greeting, json!("hello"));

    let remote = calc.invoke("area", args(&[json!({ "name": "c", "radius": 1 })])).await.unwrap_err();
    assert_eq!(remote.remote_payload(), Some(&json!({ "message": "unsupported" })));

    let err = calc.invoke("add", args(&[json!(1)])).await.unwrap_err();
    assert!(matches!(err, RpcError::InvalidArguments { .. }));
    assert!(err.to_string().contains("expected 2 arguments, got 1"));

    // The probe client is gone; only the service and the loaded client remain.
    assert_eq!(
        broker.endpoint_names(),
        vec!["CalculatorService".to_string(), calc.client().name().to_string()]
    );
    calc.client().destroy().await.unwrap();
}

#[tokio::test]
async fn write_persists_source_and_method_table() {
    let dir = tempfile::tempdir().unwrap();
    let broker = MemoryBroker::new();
    serve(&broker, calculator());
    let options = Options::default().with_path(dir.path()).write(true).compile(false);
    let connector = connector(&broker, options);

    let created = create_client(&connector, "CalculatorService").await.unwrap();
    assert!(created.client.is_none());
    assert!(created.artifact.compiled_module.is_none());

    let source_path = created.artifact.source_path.unwrap();
    assert_eq!(source_path, dir.path().join("calculatorClient.rs"));
    assert_eq!(std::fs::read_to_string(&source_path).unwrap(), created.artifact.source_text);

    let table = MethodTable::from_file(created.artifact.table_path.unwrap()).unwrap();
    assert_eq!(table.service_name, "CalculatorService");
    assert_eq!(table.signature("greet").unwrap().required, 0);
}

#[tokio::test(start_paused = true)]
async fn silent_service_times_out() {
    let broker = MemoryBroker::new();
    let _queue = broker.attach("CalculatorService").unwrap();
    let options = Options::default().with_timeout(Duration::from_millis(250));
    let connector = connector(&broker, options);

    let err = create_client(&connector, "CalculatorService").await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.to_string().contains("CalculatorService"));
    assert_eq!(broker.endpoint_names(), vec!["CalculatorService".to_string()]);
}

#[tokio::test]
async fn late_response_reaches_restarted_client_as_orphan() {
    let broker = MemoryBroker::new();
    let mut queue = broker.attach("CalculatorService").unwrap();
    let connector = connector(&broker, Options::default());

    let first = connector.client("calc").unwrap();
    first.start().await.unwrap();
    let name = first.name().to_string();

    let caller = first.clone();
    let call = tokio::spawn(async move {
        caller
            .call("CalculatorService", "add", args(&[json!(1), json!(2)]))
            .await
    });
    let delivery = queue.recv().await.unwrap();
    assert_eq!(delivery.request.from, name);

    first.destroy().await.unwrap();
    assert!(matches!(call.await.unwrap(), Err(RpcError::Shutdown)));

    let second = connector.client("calc").unwrap();
    assert_eq!(second.name(), name);
    let (tx, mut orphans) = mpsc::unbounded_channel();
    second
        .on("add", move |response: &Response| {
            let _ = tx.send(response.clone());
        })
        .unwrap();
    second.start().await.unwrap();

    broker
        .respond(Response::success(delivery.id.clone(), json!(3)))
        .unwrap();

    let orphan = tokio::time::timeout(Duration::from_secs(5), orphans.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(orphan.to, delivery.id);
    assert_eq!(orphan.data, Some(json!(3)));
    assert_eq!(second.pending_calls(), 0);
    second.destroy().await.unwrap();
}

#[tokio::test]
async fn destroy_twice_is_harmless() {
    let broker = MemoryBroker::new();
    let connector = connector(&broker, Options::default());
    let client = connector.client("calc").unwrap();
    client.start().await.unwrap();

    client.destroy().await.unwrap();
    client.destroy().await.unwrap();
    assert_eq!(client.state(), LifecycleState::Destroyed);
    assert!(broker.endpoint_names().is_empty());
    assert!(matches!(client.start().await, Err(RpcError::Shutdown)));
}

#[tokio::test(start_paused = true)]
async fn delay_holds_request_back() {
    let broker = MemoryBroker::new();
    let mut queue = broker.attach("CalculatorService").unwrap();
    let connector = connector(&broker, Options::default());
    let client = connector.client("calc").unwrap();
    client.start().await.unwrap();

    let caller = client.clone();
    tokio::spawn(async move {
        let mut call = args(&[json!(1)]);
        call.push(DelaySpec::millis(1500.0).into());
        caller.call("CalculatorService", "add", call).await
    });

    tokio::time::sleep(Duration::from_millis(1400)).await;
    assert!(queue.try_recv().is_err());
    tokio::time::sleep(Duration::from_millis(200)).await;
    let delivery = queue.try_recv().unwrap();
    assert_eq!(delivery.request.args, vec![json!(1)]);
    client.destroy().await.unwrap();
}

#[test]
fn synthesized_types_parse_back() {
    let desc = calculator();
    let types = parse_types(&synthesize(&desc)).unwrap();
    assert_eq!(types.len(), desc.types.len());

    for (name, expected) in &desc.types {
        let parsed = &types[name];
        assert_eq!(parsed.inherits_from, expected.inherits_from, "{}", name);
        assert_eq!(parsed.index_signature, expected.index_signature, "{}", name);
        assert_eq!(
            parsed.properties.keys().collect::<Vec<_>>(),
            expected.properties.keys().collect::<Vec<_>>(),
            "{}",
            name
        );
        for (prop, p) in &expected.properties {
            assert_eq!(parsed.properties[prop].optional, p.optional, "{}.{}", name, prop);
        }
    }
}

#[test]
fn two_argument_method_gets_three_parameters() {
    let source = synthesize(&calculator());
    let file = syn::parse_file(&source).unwrap();
    let syn::Item::Mod(module) = &file.items[0] else {
        panic!("expected the client module first");
    };
    let (_, items) = module.content.as_ref().unwrap();
    let add = items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Impl(imp) if imp.trait_.is_none() => Some(&imp.items),
            _ => None,
        })
        .flatten()
        .find_map(|item| match item {
            syn::ImplItem::Fn(f) if f.sig.ident == "add" => Some(f),
            _ => None,
        })
        .unwrap();

    // self + a + b + delay
    assert_eq!(add.sig.inputs.len(), 4);
    let returns = match &add.sig.output {
        syn::ReturnType::Type(_, ty) => type_shape(ty),
        syn::ReturnType::Default => String::new(),
    };
    assert!(returns.ends_with("RpcResult < f64 >"), "{}", returns);
}

fn type_shape(ty: &syn::Type) -> String {
    match ty {
        syn::Type::Path(path) => {
            let last = path.path.segments.last().unwrap();
            match &last.arguments {
                syn::PathArguments::AngleBracketed(args) => {
                    let inner: Vec<String> = args
                        .args
                        .iter()
                        .map(|a| match a {
                            syn::GenericArgument::Type(t) => type_shape(t),
                            _ => String::new(),
                        })
                        .collect();
                    format!("{} < {} >", last.ident, inner.join(", "))
                }
                _ => last.ident.to_string(),
            }
        }
        _ => String::new(),
    }
}

/// Hands out broker handles, except for `failing` whose start and
/// teardown both fail.
struct FailingStart {
    broker: MemoryBroker,
    failing: &'static str,
}

struct BrokenHandle(Arc<dyn mqrpc::TransportHandle>);

#[async_trait::async_trait]
impl mqrpc::TransportHandle for BrokenHandle {
    fn send(
        &self,
        destination: &str,
        message: mqrpc::Message,
        delay_ms: u64,
        on_delivery_failure: mqrpc::transport::DeliveryFailure,
    ) -> mqrpc::RpcResult<mqrpc::CorrelationId> {
        self.0.send(destination, message, delay_ms, on_delivery_failure)
    }

    fn on_message(&self, callback: mqrpc::transport::InboundHandler) {
        self.0.on_message(callback);
    }

    fn subscribe(
        &self,
        channel: &str,
        handler: mqrpc::transport::BroadcastHandler,
    ) -> mqrpc::RpcResult<()> {
        self.0.subscribe(channel, handler)
    }

    fn unsubscribe(&self) {
        self.0.unsubscribe();
    }

    async fn start(&self) -> mqrpc::RpcResult<()> {
        Err(RpcError::Transport("queue unavailable".to_string()))
    }

    async fn stop(&self) -> mqrpc::RpcResult<()> {
        self.0.stop().await
    }

    async fn destroy(&self) -> mqrpc::RpcResult<()> {
        self.0.destroy().await?;
        Err(RpcError::Transport("consumer already gone".to_string()))
    }
}

impl mqrpc::TransportFactory for FailingStart {
    fn create(
        &self,
        identity: &mqrpc::ClientIdentity,
        options: &Options,
    ) -> mqrpc::RpcResult<Arc<dyn mqrpc::TransportHandle>> {
        let handle = mqrpc::TransportFactory::create(&self.broker, identity, options)?;
        if identity.base_name() == self.failing {
            Ok(Arc::new(BrokenHandle(handle)))
        } else {
            Ok(handle)
        }
    }
}

#[derive(Clone, Default)]
struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn failed_start_reports_start_error_and_logs_cleanup_failure() {
    let broker = MemoryBroker::new();
    serve(&broker, calculator());

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    let connector = Connector::new(
        Arc::new(FailingStart {
            broker: broker.clone(),
            failing: "calculatorClient",
        }),
        Arc::new(InProcessIds::new()),
        Options::default().with_logger(tracing::Dispatch::new(subscriber)),
    );

    let err = create_client(&connector, "CalculatorService").await.unwrap_err();
    assert_eq!(err.to_string(), RpcError::Transport("queue unavailable".into()).to_string());

    let logs = String::from_utf8(captured.0.lock().clone()).unwrap();
    assert!(logs.contains("client cleanup failed"), "{}", logs);
    assert!(logs.contains("consumer already gone"), "{}", logs);
}
