//! Shared fixtures for the integration tests
//!
//! A `math` handler exposing a small calculator, helpers to wire it into an executor and to bind
//! client stubs over the loopback transport, and a scripted client transport for feeding
//! hand-written response envelopes to a stub.

#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

use tether_rpc::prelude::*;
use tether_rpc::{RpcInterface, TransportError};

#[rpc_interface]
pub trait Calculator {
    fn add(&self, a: i32, b: i32) -> RpcResult<i32>;

    #[rpc(name = "add")]
    fn add_three(&self, a: i32, b: i32, c: i32) -> RpcResult<i32>;

    fn divide(&self, dividend: i64, divisor: i64) -> RpcResult<i64>;

    fn reset(&self) -> RpcResult<()>;
}

/// Stateless calculator; `divide` fails with a domain error on a zero divisor.
pub struct Math;

impl Calculator for Math {
    fn add(&self, a: i32, b: i32) -> RpcResult<i32> {
        Ok(a + b)
    }

    fn add_three(&self, a: i32, b: i32, c: i32) -> RpcResult<i32> {
        Ok(a + b + c)
    }

    fn divide(&self, dividend: i64, divisor: i64) -> RpcResult<i64> {
        dividend
            .checked_div(divisor)
            .ok_or_else(|| RpcError::handler("division by zero"))
    }

    fn reset(&self) -> RpcResult<()> {
        Ok(())
    }
}

/// An executor with `math` registered.
pub fn math_executor() -> Arc<JsonRpcExecutor> {
    let executor = Arc::new(JsonRpcExecutor::new());
    executor
        .add_handler("math", Arc::new(Math), vec![Capability::of::<dyn Calculator>()])
        .expect("math handler registers");
    executor
}

/// Bind a stub for `handler` implementing the interface `I` over a loopback transport.
pub fn loopback_stub<I>(executor: &Arc<JsonRpcExecutor>, handler: &str) -> RemoteStub
where
    I: RpcInterface + ?Sized,
{
    JsonRpcInvoker::new()
        .bind(
            Arc::new(LoopbackTransport::new(executor.clone())),
            handler,
            vec![InterfaceDescriptor::of::<I>()],
        )
        .expect("stub binds")
}

/// Client transport answering with queued responses and recording every request it sends.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub fn replying(responses: &[&str]) -> Arc<Self> {
        let transport = Self::default();
        transport
            .responses
            .lock()
            .extend(responses.iter().map(|response| Ok(response.to_string())));
        Arc::new(transport)
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let transport = Self::default();
        transport.responses.lock().push_back(Err(message.to_string()));
        Arc::new(transport)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }
}

impl ClientTransport for ScriptedTransport {
    fn call(&self, request: &str) -> Result<String, TransportError> {
        let request = serde_json::from_str(request)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        self.requests.lock().push(request);
        match self.responses.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Io(std::io::Error::other(message))),
            None => Err(TransportError::Closed),
        }
    }
}

/// Bind a calculator stub to a scripted transport.
pub fn scripted_calculator(transport: Arc<ScriptedTransport>) -> RemoteStub {
    JsonRpcInvoker::new()
        .bind(transport, "math", vec![InterfaceDescriptor::of::<dyn Calculator>()])
        .expect("stub binds")
}
