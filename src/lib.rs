//! # proto-rpc
//!
//! Point-to-point RPC over TCP. A client dispatches calls on a typed stub
//! through a [`Channel`]; a server hosts a [`Service`] implementation and
//! serves each connection with a per-session state machine. Payloads are
//! IDL messages (protobuf wire format via `prost`) framed with a varint
//! length prefix.
//!
//! The crate is the runtime only: transport, framing, dispatch and
//! connection lifecycle. The IDL compiler and the generated stubs are
//! external collaborators; the runtime consumes a [`ServiceDescriptor`],
//! prototype factories and a dispatch function through the [`Service`]
//! trait.
//!
//! ## Protocol
//!
//! - On connect, the client sends the descriptor of the service it was
//!   built against; the server answers with a [`proto::FailureInfo`]
//!   acknowledging match or mismatch. This handshake happens exactly once
//!   per connection.
//! - Each call is two frames in each direction: `MethodIndex` + request
//!   from the client, `FailureInfo` + response from the server. A failed
//!   call carries a `Placeholder` as its response payload.
//! - One call at a time per channel; one call at a time per session. Every
//!   network operation except the server's idle wait runs under a deadline
//!   (default 5000 ms).
//! - Failures surface exclusively through the per-call [`Controller`].
//!
//! ## Example
//!
//! ```no_run
//! use std::net::Ipv4Addr;
//!
//! use proto_rpc::{
//!     Channel, Controller, Done, Initialized, MethodDescriptor, RpcMessage, Server, Service,
//!     ServiceDescriptor,
//! };
//!
//! #[derive(Clone, PartialEq, ::prost::Message)]
//! pub struct Echo {
//!     #[prost(string, optional, tag = "1")]
//!     pub text: Option<String>,
//! }
//!
//! impl Initialized for Echo {
//!     fn is_initialized(&self) -> bool {
//!         self.text.is_some()
//!     }
//! }
//!
//! struct EchoService {
//!     descriptor: ServiceDescriptor,
//! }
//!
//! impl EchoService {
//!     fn new() -> Self {
//!         let descriptor =
//!             ServiceDescriptor::new("example.Echo", &[("Say", "example.Echo", "example.Echo")]);
//!         Self { descriptor }
//!     }
//! }
//!
//! impl Service for EchoService {
//!     fn descriptor(&self) -> &ServiceDescriptor {
//!         &self.descriptor
//!     }
//!
//!     fn request_prototype(&self, _method: &MethodDescriptor) -> Box<dyn RpcMessage> {
//!         Box::new(Echo::default())
//!     }
//!
//!     fn response_prototype(&self, _method: &MethodDescriptor) -> Box<dyn RpcMessage> {
//!         Box::new(Echo::default())
//!     }
//!
//!     fn call(
//!         &self, _method: &MethodDescriptor, _controller: &mut Controller,
//!         request: &dyn RpcMessage, response: &mut dyn RpcMessage, done: Done,
//!     ) {
//!         let request = request.as_any().downcast_ref::<Echo>().unwrap();
//!         let response = response.as_any_mut().downcast_mut::<Echo>().unwrap();
//!         response.text = request.text.clone();
//!         done();
//!     }
//! }
//!
//! fn main() -> std::io::Result<()> {
//!     let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
//!     rt.block_on(async {
//!         let mut server = Server::new(EchoService::new());
//!         let addr = server.bind(0).await?;
//!
//!         let mut channel = Channel::new(Ipv4Addr::LOCALHOST, addr.port());
//!         let descriptor = EchoService::new().descriptor().clone();
//!         let method = descriptor.method(0).unwrap();
//!
//!         let request = Echo { text: Some("hello".to_string()) };
//!         let mut response = Echo::default();
//!         let mut controller = Controller::new();
//!         channel.call(&method, Some(&mut controller), &request, &mut response, None).await;
//!         assert!(!controller.failed(), "{}", controller.error_text());
//!         assert_eq!(response.text.as_deref(), Some("hello"));
//!         Ok(())
//!     })
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod net;
pub mod proto;
pub mod server;
pub mod service;

pub use client::Channel;
pub use codec::{DecodeStatus, Initialized, RpcMessage};
pub use config::{RpcConfig, DEFAULT_TIMEOUT_MS};
pub use controller::Controller;
pub use error::RpcError;
pub use net::FramedStream;
pub use server::Server;
pub use service::{Done, MethodDescriptor, Service, ServiceDescriptor};
