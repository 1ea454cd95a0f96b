//! Wire control messages.
//!
//! These ride the stream exactly like application payloads: varint length
//! prefix, then the serialized message. Required fields follow proto2
//! semantics, modeled as `Option` fields checked by [`Initialized`].

use crate::codec::Initialized;

/// Addresses the next call by the method's position in the service's
/// declaration order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MethodIndex {
    #[prost(uint32, optional, tag = "1")]
    pub value: Option<u32>,
}

impl MethodIndex {
    pub fn new(value: u32) -> Self {
        Self { value: Some(value) }
    }
}

impl Initialized for MethodIndex {
    fn is_initialized(&self) -> bool {
        self.value.is_some()
    }
}

/// Failure leg of every RPC result, and the handshake acknowledgement.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FailureInfo {
    #[prost(bool, optional, tag = "1")]
    pub failed: Option<bool>,
    #[prost(string, optional, tag = "2")]
    pub error_text: Option<String>,
}

impl FailureInfo {
    /// `failed` is authoritative; a stray `error_text` on a non-failed
    /// info is ignored.
    pub fn is_failed(&self) -> bool {
        self.failed.unwrap_or(false)
    }
}

impl Initialized for FailureInfo {
    fn is_initialized(&self) -> bool {
        self.failed.is_some()
    }
}

/// Stands in for a message one side cannot construct: serializes to an
/// empty payload, and parses any payload without interpreting it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Placeholder {}

impl Initialized for Placeholder {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MethodDescriptorProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub input_type: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub output_type: Option<String>,
}

impl Initialized for MethodDescriptorProto {
    fn is_initialized(&self) -> bool {
        self.name.is_some()
    }
}

/// Canonical serialized identity of a service. Byte equality of this
/// message is the handshake equality test.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceDescriptorProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub methods: Vec<MethodDescriptorProto>,
}

impl Initialized for ServiceDescriptorProto {
    fn is_initialized(&self) -> bool {
        self.name.is_some() && self.methods.iter().all(|m| m.is_initialized())
    }
}
