//! Client-side channel owning one connection to a server.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::*;

use crate::codec::RpcMessage;
use crate::config::RpcConfig;
use crate::controller::Controller;
use crate::error::RpcError;
use crate::net::FramedStream;
use crate::proto::{FailureInfo, MethodIndex};
use crate::service::{Done, MethodDescriptor};

/// A connection to one server, carrying one call at a time.
///
/// The channel connects lazily on the first call and performs the service
/// handshake exactly once per connection. Any transport-class error closes
/// the socket and the next call reconnects and re-handshakes. Serializing
/// calls is enforced by `&mut self`.
pub struct Channel {
    endpoint: SocketAddr,
    timeout: Duration,
    stream: Option<FramedStream>,
}

impl Channel {
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self::with_config(address, port, RpcConfig::default())
    }

    pub fn with_config(address: Ipv4Addr, port: u16, config: RpcConfig) -> Self {
        Self { endpoint: SocketAddr::from((address, port)), timeout: config.timeout, stream: None }
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Call `method` with `request`, filling `response`.
    ///
    /// Failures of every kind surface only through the controller; a
    /// fabricated one is used when `controller` is `None`. `done` is
    /// invoked exactly once, whether the call succeeded or failed.
    pub async fn call(
        &mut self, method: &MethodDescriptor, controller: Option<&mut Controller>,
        request: &dyn RpcMessage, response: &mut dyn RpcMessage, done: Option<Done>,
    ) {
        let mut fallback = Controller::new();
        let ctl = controller.unwrap_or(&mut fallback);

        if !request.is_initialized() {
            // no I/O was performed; the connection state is untouched
            ctl.set_failed("Uninitialized request");
        } else {
            match self.try_call(method, request, response).await {
                Ok(None) => {}
                // the server answered through the result path; the
                // connection stays usable
                Ok(Some(text)) => ctl.set_failed(&text),
                // transport-class failure; the connection is gone and the
                // next call reconnects
                Err(e) => {
                    debug!("channel {}: call failed: {}", self.endpoint, e);
                    ctl.set_failed(&e.to_string());
                }
            }
        }

        if let Some(done) = done {
            done();
        }
    }

    /// Run one RPC. `Ok(Some(text))` is a failure the server reported
    /// through the normal result path.
    async fn try_call(
        &mut self, method: &MethodDescriptor, request: &dyn RpcMessage,
        response: &mut dyn RpcMessage,
    ) -> Result<Option<String>, RpcError> {
        let mut stream = match self.stream.take() {
            Some(s) => s,
            None => self.connect(method).await?,
        };
        // dropping `stream` on the error path is what closes the socket
        let failure = self.exchange(&mut stream, method, request, response).await?;
        self.stream = Some(stream);
        Ok(failure)
    }

    /// Connect and run the once-per-connection service handshake.
    async fn connect(&self, method: &MethodDescriptor) -> Result<FramedStream, RpcError> {
        let mut stream = FramedStream::connect(&self.endpoint, self.timeout).await?;
        info!("channel {}: connected", self.endpoint);

        stream.write_message(&method.service().to_proto(), self.timeout).await?;

        let mut info = FailureInfo::default();
        stream.read_message(&mut info, self.timeout).await?;
        if !info.is_initialized() {
            return Err(RpcError::Protocol("Uninitialized failure info"));
        }
        if info.is_failed() {
            return Err(RpcError::Remote(info.error_text().to_string()));
        }
        Ok(stream)
    }

    async fn exchange(
        &self, stream: &mut FramedStream, method: &MethodDescriptor,
        request: &dyn RpcMessage, response: &mut dyn RpcMessage,
    ) -> Result<Option<String>, RpcError> {
        stream.write_message(&MethodIndex::new(method.index()), self.timeout).await?;
        stream.write_message(request, self.timeout).await?;

        // failure info and response arrive back to back in one buffer
        let mut info = FailureInfo::default();
        stream.read_message(&mut info, self.timeout).await?;
        stream.read_message(response, self.timeout).await?;

        if !info.is_initialized() {
            return Err(RpcError::Protocol("Uninitialized failure info"));
        }
        if info.is_failed() {
            return Ok(Some(info.error_text().to_string()));
        }
        if !response.is_initialized() {
            return Err(RpcError::Protocol("Uninitialized response"));
        }
        Ok(None)
    }
}
