//! Server acceptor and per-connection sessions.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable};
use log::*;
use prost::Message as _;
use tokio::net::{TcpListener, TcpStream};

use crate::codec::RpcMessage;
use crate::config::RpcConfig;
use crate::controller::Controller;
use crate::error::RpcError;
use crate::net::FramedStream;
use crate::proto::{FailureInfo, MethodIndex, Placeholder, ServiceDescriptorProto};
use crate::service::{MethodDescriptor, Service};

/// Hosts one service implementation on a TCP port.
pub struct Server<S: Service> {
    service: Arc<S>,
    timeout: Duration,
    accept_abort: Option<AbortHandle>,
}

impl<S: Service> Server<S> {
    pub fn new(service: S) -> Self {
        Self::with_config(service, RpcConfig::default())
    }

    pub fn with_config(service: S, config: RpcConfig) -> Self {
        Self { service: Arc::new(service), timeout: config.timeout, accept_abort: None }
    }

    /// Bind all IPv4 interfaces on `port` (0 picks a free port) and start
    /// accepting connections. Returns the bound address.
    ///
    /// Each accepted connection gets its own [`Session`] task; accept
    /// errors are logged and accepting continues.
    pub async fn bind(&mut self, port: u16) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        let local = listener.local_addr()?;
        info!("server listening on {}", local);

        let (abort_handle, abort_reg) = AbortHandle::new_pair();
        let accepting =
            Abortable::new(accept_loop(listener, self.service.clone(), self.timeout), abort_reg);
        tokio::spawn(async move {
            if accepting.await.is_err() {
                debug!("server {}: stopped accepting", local);
            }
        });
        self.accept_abort = Some(abort_handle);
        Ok(local)
    }

    /// Stop accepting new connections; live sessions run to completion.
    pub fn shutdown(&mut self) {
        if let Some(h) = self.accept_abort.take() {
            h.abort();
        }
    }
}

impl<S: Service> Drop for Server<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_loop<S: Service>(listener: TcpListener, service: Arc<S>, timeout: Duration) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let session = Session::new(stream, peer, service.clone(), timeout);
                tokio::spawn(session.run());
            }
            Err(e) => {
                warn!("accept error: {}", e);
            }
        }
    }
}

/// Per-connection state machine: one handshake, then a request/response
/// loop until the client disconnects or an error kills the connection.
struct Session<S: Service> {
    stream: FramedStream,
    peer: SocketAddr,
    service: Arc<S>,
    timeout: Duration,
}

impl<S: Service> Session<S> {
    fn new(stream: TcpStream, peer: SocketAddr, service: Arc<S>, timeout: Duration) -> Self {
        Self { stream: FramedStream::new(stream), peer, service, timeout }
    }

    async fn run(mut self) {
        info!("session {}: started", self.peer);
        match self.serve().await {
            Ok(()) => info!("session {}: closed", self.peer),
            Err(e) => warn!("session {}: terminated: {}", self.peer, e),
        }
    }

    async fn serve(&mut self) -> Result<(), RpcError> {
        if !self.handshake().await? {
            return Ok(());
        }
        loop {
            let mut index = MethodIndex::default();
            // the wait for the next call deliberately has no deadline; a
            // quiet connected client is the legitimate resting state
            match self.stream.read_message(&mut index, Duration::ZERO).await {
                Ok(()) => {}
                Err(RpcError::Eof) => return Ok(()),
                Err(e) => return Err(e),
            }
            self.serve_one(index).await?;
        }
    }

    /// Read the client's service descriptor and acknowledge match or
    /// mismatch. `Ok(false)` means the handshake was answered with a
    /// failure and the session is done.
    async fn handshake(&mut self) -> Result<bool, RpcError> {
        let mut ctl = Controller::new();

        let mut descriptor = ServiceDescriptorProto::default();
        self.stream.read_message(&mut descriptor, self.timeout).await?;

        if !descriptor.is_initialized() {
            ctl.set_failed("Uninitialized service descriptor on server");
        } else if descriptor.encode_to_vec().as_slice()
            != self.service.descriptor().canonical_bytes()
        {
            ctl.set_failed("Service descriptor mismatch on server");
        }

        self.stream.stage_message(&FailureInfo::from(&ctl));
        self.stream.flush_staged(self.timeout).await?;
        Ok(!ctl.failed())
    }

    /// Serve the single RPC addressed by `index`.
    async fn serve_one(&mut self, index: MethodIndex) -> Result<(), RpcError> {
        let mut ctl = Controller::new();

        let method = if !index.is_initialized() {
            ctl.set_failed("Uninitialized method index on server");
            None
        } else {
            let value = index.value.unwrap_or_default();
            let method = self.service.descriptor().method(value);
            if method.is_none() {
                ctl.set_failed("Method not found on server");
            }
            method
        };

        let mut response: Option<Box<dyn RpcMessage>> = None;
        match method {
            None => {
                // swallow whatever the client sent as a request for the
                // bad index so the stream stays aligned for the next call
                let mut sink = Placeholder::default();
                self.stream.read_message(&mut sink, self.timeout).await?;
            }
            Some(ref m) => {
                let mut request = self.service.request_prototype(m);
                self.stream.read_message(request.as_mut(), self.timeout).await?;
                if !request.is_initialized() {
                    ctl.set_failed("Uninitialized request on server");
                } else {
                    response = Some(self.dispatch(m, request.as_ref(), &mut ctl));
                }
            }
        }

        self.write_result(&ctl, response).await
    }

    fn dispatch(
        &self, method: &MethodDescriptor, request: &dyn RpcMessage, ctl: &mut Controller,
    ) -> Box<dyn RpcMessage> {
        trace!("session {}: dispatching {:?}", self.peer, method);
        let mut response = self.service.response_prototype(method);
        self.service.call(method, ctl, request, response.as_mut(), Box::new(|| {}));
        if !ctl.failed() && !response.is_initialized() {
            ctl.set_failed("Uninitialized response on server");
        }
        response
    }

    /// Failure leg then response payload, staged together and written as
    /// one unit. A failed call answers with a placeholder payload.
    async fn write_result(
        &mut self, ctl: &Controller, response: Option<Box<dyn RpcMessage>>,
    ) -> Result<(), RpcError> {
        self.stream.stage_message(&FailureInfo::from(ctl));
        match response {
            Some(ref resp) if !ctl.failed() => self.stream.stage_message(resp.as_ref()),
            _ => self.stream.stage_message(&Placeholder::default()),
        }
        self.stream.flush_staged(self.timeout).await
    }
}
