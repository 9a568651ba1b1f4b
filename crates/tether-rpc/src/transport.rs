//! Transport layer: bytes in, bytes out
//!
//! The engine only needs two synchronous capabilities. Clients send one request and block until
//! its response arrives; servers read one request and write one response per cycle.

use parking_lot::Mutex;
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::trace;

use crate::error::TransportError;
use crate::executor::JsonRpcExecutor;

/// Client side transport
pub trait ClientTransport: Send + Sync {
    /// Send a request and wait for its response
    fn call(&self, request: &str) -> Result<String, TransportError>;
}

/// Server side transport, used for exactly one request/response exchange per executor cycle
pub trait ServerTransport {
    fn read_request(&mut self) -> Result<String, TransportError>;

    fn write_response(&mut self, response: &str) -> Result<(), TransportError>;
}

/// Client transport that hands every request straight to an in-process executor.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    executor: Arc<JsonRpcExecutor>,
}

impl LoopbackTransport {
    pub fn new(executor: Arc<JsonRpcExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<JsonRpcExecutor> {
        &self.executor
    }
}

impl ClientTransport for LoopbackTransport {
    fn call(&self, request: &str) -> Result<String, TransportError> {
        let mut exchange = Exchange {
            request: Some(request.to_string()),
            response: None,
        };
        self.executor.execute(&mut exchange);
        exchange.response.ok_or(TransportError::Closed)
    }
}

// One in-memory request/response pair.
struct Exchange {
    request: Option<String>,
    response: Option<String>,
}

impl ServerTransport for Exchange {
    fn read_request(&mut self) -> Result<String, TransportError> {
        self.request.take().ok_or(TransportError::Closed)
    }

    fn write_response(&mut self, response: &str) -> Result<(), TransportError> {
        self.response = Some(response.to_string());
        Ok(())
    }
}

/// Newline-delimited JSON over a reader/writer pair.
///
/// Works as a client transport (write a request line, read a response line) and as a server
/// transport (read a request line, write a response line).
pub struct LineTransport<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead, W: Write> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner()
    }

    fn read_line(reader: &mut R) -> Result<String, TransportError> {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(TransportError::Closed);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        trace!(bytes = trimmed.len(), "read line");
        Ok(trimmed.to_string())
    }

    fn write_line(writer: &mut W, text: &str) -> Result<(), TransportError> {
        if text.contains('\n') {
            return Err(TransportError::Protocol(
                "message contains a line break".to_string(),
            ));
        }
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl<R, W> ClientTransport for LineTransport<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn call(&self, request: &str) -> Result<String, TransportError> {
        let mut io = self.io.lock();
        let (reader, writer) = &mut *io;
        Self::write_line(writer, request)?;
        Self::read_line(reader)
    }
}

impl<R: BufRead, W: Write> ServerTransport for LineTransport<R, W> {
    fn read_request(&mut self) -> Result<String, TransportError> {
        let (reader, _) = self.io.get_mut();
        Self::read_line(reader)
    }

    fn write_response(&mut self, response: &str) -> Result<(), TransportError> {
        let (_, writer) = self.io.get_mut();
        Self::write_line(writer, response)
    }
}

impl<R, W> fmt::Debug for LineTransport<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineTransport").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_transport_client_side() {
        let transport = LineTransport::new(
            Cursor::new(b"{\"result\":1}\r\n".to_vec()),
            Vec::new(),
        );
        assert_eq!(transport.call("{\"id\":1}").unwrap(), "{\"result\":1}");
        assert!(matches!(
            transport.call("{\"id\":2}"),
            Err(TransportError::Closed)
        ));

        let (_, written) = transport.into_inner();
        assert_eq!(written, b"{\"id\":1}\n{\"id\":2}\n");
    }

    #[test]
    fn test_line_transport_server_side() {
        let mut transport = LineTransport::new(Cursor::new(b"first\nsecond\n".to_vec()), Vec::new());
        assert_eq!(transport.read_request().unwrap(), "first");
        transport.write_response("one").unwrap();
        assert_eq!(transport.read_request().unwrap(), "second");
        assert!(matches!(
            transport.read_request(),
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            transport.write_response("a\nb"),
            Err(TransportError::Protocol(_))
        ));

        let (_, written) = transport.into_inner();
        assert_eq!(written, b"one\n");
    }

    #[test]
    fn test_exchange_is_single_use() {
        let mut exchange = Exchange {
            request: Some("req".to_string()),
            response: None,
        };
        assert_eq!(exchange.read_request().unwrap(), "req");
        assert!(exchange.read_request().is_err());
        exchange.write_response("resp").unwrap();
        assert_eq!(exchange.response.as_deref(), Some("resp"));
    }
}
