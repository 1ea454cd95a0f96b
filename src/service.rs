//! The contract between the runtime and user code: service identity and
//! the dispatch seam a code generator would target.

use std::fmt;
use std::sync::Arc;

use prost::Message as _;

use crate::codec::RpcMessage;
use crate::controller::Controller;
use crate::proto::{MethodDescriptorProto, ServiceDescriptorProto};

/// Completion callback handed to [`Service::call`]; invoked exactly once.
pub type Done = Box<dyn FnOnce() + Send>;

struct MethodMeta {
    name: String,
    input_type: String,
    output_type: String,
}

struct DescriptorInner {
    name: String,
    methods: Vec<MethodMeta>,
    /// Serialized [`ServiceDescriptorProto`], computed once. Descriptor
    /// equality is byte equality of this form.
    canonical: Vec<u8>,
}

/// Immutable identity of a service: fully-qualified name plus its methods
/// in declaration order. Cheap to clone.
#[derive(Clone)]
pub struct ServiceDescriptor(Arc<DescriptorInner>);

impl ServiceDescriptor {
    /// `methods` are `(name, input_type, output_type)` triples in
    /// declaration order; a method's position is its stable wire index.
    pub fn new(name: &str, methods: &[(&str, &str, &str)]) -> Self {
        let methods: Vec<MethodMeta> = methods
            .iter()
            .map(|(name, input, output)| MethodMeta {
                name: name.to_string(),
                input_type: input.to_string(),
                output_type: output.to_string(),
            })
            .collect();
        let proto = ServiceDescriptorProto {
            name: Some(name.to_string()),
            methods: methods
                .iter()
                .map(|m| MethodDescriptorProto {
                    name: Some(m.name.clone()),
                    input_type: Some(m.input_type.clone()),
                    output_type: Some(m.output_type.clone()),
                })
                .collect(),
        };
        let canonical = proto.encode_to_vec();
        Self(Arc::new(DescriptorInner { name: name.to_string(), methods, canonical }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn method_count(&self) -> usize {
        self.0.methods.len()
    }

    /// Look up a method by wire index; `None` when out of range.
    pub fn method(&self, index: u32) -> Option<MethodDescriptor> {
        if (index as usize) < self.0.methods.len() {
            Some(MethodDescriptor { service: self.clone(), index })
        } else {
            None
        }
    }

    /// The descriptor as it travels in the handshake frame.
    pub fn to_proto(&self) -> ServiceDescriptorProto {
        ServiceDescriptorProto {
            name: Some(self.0.name.clone()),
            methods: self
                .0
                .methods
                .iter()
                .map(|m| MethodDescriptorProto {
                    name: Some(m.name.clone()),
                    input_type: Some(m.input_type.clone()),
                    output_type: Some(m.output_type.clone()),
                })
                .collect(),
        }
    }

    /// Canonical serialized form backing the equality test.
    pub fn canonical_bytes(&self) -> &[u8] {
        &self.0.canonical
    }
}

impl PartialEq for ServiceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.0.canonical == other.0.canonical
    }
}

impl Eq for ServiceDescriptor {}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{} methods]", self.0.name, self.0.methods.len())
    }
}

/// Handle to one method of a service; carries its descriptor.
#[derive(Clone)]
pub struct MethodDescriptor {
    service: ServiceDescriptor,
    index: u32,
}

impl MethodDescriptor {
    /// Zero-based position in the service's declaration order.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn input_type(&self) -> &str {
        &self.meta().input_type
    }

    pub fn output_type(&self) -> &str {
        &self.meta().output_type
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    fn meta(&self) -> &MethodMeta {
        // the index was bounds-checked at construction
        &self.service.0.methods[self.index as usize]
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.service.0.name, self.meta().name)
    }
}

/// What the runtime requires from a hosted service implementation.
///
/// A code generator would emit all of this from the IDL; the runtime only
/// depends on the shape.
pub trait Service: Send + Sync + 'static {
    fn descriptor(&self) -> &ServiceDescriptor;

    /// Empty message of the method's request type, for the server to
    /// parse into.
    fn request_prototype(&self, method: &MethodDescriptor) -> Box<dyn RpcMessage>;

    /// Empty message of the method's response type, for the handler to
    /// fill.
    fn response_prototype(&self, method: &MethodDescriptor) -> Box<dyn RpcMessage>;

    /// Dispatch one call. `done` must be invoked exactly once; invoking it
    /// before returning (synchronous completion) is acceptable and is how
    /// the bundled server drives its sessions.
    fn call(
        &self, method: &MethodDescriptor, controller: &mut Controller,
        request: &dyn RpcMessage, response: &mut dyn RpcMessage, done: Done,
    );
}
