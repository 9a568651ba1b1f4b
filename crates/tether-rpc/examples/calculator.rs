//! Calculator over an in-process loopback transport
//!
//! Registers a `math` handler, binds a client stub to it and makes a few calls, including the
//! built-in `system` introspection handler and a call that fails on the server.
//!
//! ```text
//! RUST_LOG=debug cargo run --example calculator
//! ```

use anyhow::{Result, anyhow};
use std::sync::Arc;
use tether_rpc::prelude::*;
use tracing::info;

#[rpc_interface]
pub trait Calculator {
    fn add(&self, a: i32, b: i32) -> RpcResult<i32>;

    #[rpc(name = "add")]
    fn add_all(&self, values: Vec<i32>) -> RpcResult<i64>;

    fn divide(&self, dividend: f64, divisor: f64) -> RpcResult<f64>;
}

struct Math;

impl Calculator for Math {
    fn add(&self, a: i32, b: i32) -> RpcResult<i32> {
        Ok(a + b)
    }

    fn add_all(&self, values: Vec<i32>) -> RpcResult<i64> {
        Ok(values.into_iter().map(i64::from).sum())
    }

    fn divide(&self, dividend: f64, divisor: f64) -> RpcResult<f64> {
        if divisor == 0.0 {
            return Err(RemoteError::invalid_params("division by zero").into());
        }
        Ok(dividend / divisor)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let executor = Arc::new(JsonRpcExecutor::new());
    executor.add_handler("math", Arc::new(Math), vec![Capability::of::<dyn Calculator>()])?;

    let transport: Arc<dyn ClientTransport> = Arc::new(LoopbackTransport::new(executor));
    let invoker = JsonRpcInvoker::new();
    let math = invoker.bind(
        transport.clone(),
        "math",
        vec![InterfaceDescriptor::of::<dyn Calculator>()],
    )?;
    let system = invoker.bind(
        transport,
        "system",
        vec![InterfaceDescriptor::of::<dyn RpcIntrospection>()],
    )?;

    info!("2 + 3 = {}", math.add(2, 3)?);
    info!("sum of 1..=10 = {}", math.add_all((1..=10).collect())?);
    info!("7 / 2 = {}", math.divide(7.0, 2.0)?);

    match math.divide(1.0, 0.0) {
        Err(RpcError::Remote(error)) => info!("server refused: {error}"),
        other => return Err(anyhow!("expected a remote error, got {other:?}")),
    }

    for method in system.list_methods()? {
        info!("{method}: {:?}", system.method_signature(method.clone())?);
    }

    Ok(())
}
