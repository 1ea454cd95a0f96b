//! Shared fixtures for the end-to-end tests: the message types and service
//! implementation an IDL compiler would emit, plus a blocking test runner.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use proto_rpc::{
    Channel, Controller, Done, Initialized, MethodDescriptor, RpcMessage, Service,
    ServiceDescriptor,
};
use rstest::fixture;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DoubleValue {
    #[prost(double, optional, tag = "1")]
    pub value: Option<f64>,
}

impl Initialized for DoubleValue {
    fn is_initialized(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringValue {
    #[prost(string, optional, tag = "1")]
    pub data: Option<String>,
}

impl Initialized for StringValue {
    fn is_initialized(&self) -> bool {
        self.data.is_some()
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Empty {}

impl Initialized for Empty {}

pub fn storage_descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new(
        "demo.Storage",
        &[
            ("Set", "demo.DoubleValue", "demo.Empty"),
            ("Get", "demo.Empty", "demo.DoubleValue"),
            ("Append", "demo.StringValue", "demo.StringValue"),
            ("Delay", "demo.Empty", "demo.Empty"),
        ],
    )
}

/// Server-side implementation backing the scenarios: a settable double, an
/// appendable string, and a method that stalls for the timeout tests.
pub struct StorageService {
    descriptor: ServiceDescriptor,
    value: Mutex<Option<f64>>,
    data: Mutex<String>,
    delay: Duration,
}

impl StorageService {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            descriptor: storage_descriptor(),
            value: Mutex::new(None),
            data: Mutex::new(String::new()),
            delay,
        }
    }
}

impl Service for StorageService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn request_prototype(&self, method: &MethodDescriptor) -> Box<dyn RpcMessage> {
        match method.index() {
            0 => Box::new(DoubleValue::default()),
            2 => Box::new(StringValue::default()),
            _ => Box::new(Empty::default()),
        }
    }

    fn response_prototype(&self, method: &MethodDescriptor) -> Box<dyn RpcMessage> {
        match method.index() {
            1 => Box::new(DoubleValue::default()),
            2 => Box::new(StringValue::default()),
            _ => Box::new(Empty::default()),
        }
    }

    fn call(
        &self, method: &MethodDescriptor, controller: &mut Controller,
        request: &dyn RpcMessage, response: &mut dyn RpcMessage, done: Done,
    ) {
        match method.name() {
            "Set" => {
                let request = request.as_any().downcast_ref::<DoubleValue>().unwrap();
                *self.value.lock().unwrap() = request.value;
            }
            "Get" => match *self.value.lock().unwrap() {
                None => controller.set_failed("Value never set"),
                Some(v) => {
                    let response = response.as_any_mut().downcast_mut::<DoubleValue>().unwrap();
                    response.value = Some(v);
                }
            },
            "Append" => {
                let request = request.as_any().downcast_ref::<StringValue>().unwrap();
                let mut data = self.data.lock().unwrap();
                data.push_str(request.data.as_deref().unwrap_or(""));
                let response = response.as_any_mut().downcast_mut::<StringValue>().unwrap();
                response.data = Some(data.clone());
            }
            "Delay" => {
                std::thread::sleep(self.delay);
            }
            other => controller.set_failed(&format!("unhandled method {}", other)),
        }
        done();
    }
}

/// The stub an IDL compiler would emit: typed wrappers over `Channel::call`.
pub struct StorageStub {
    descriptor: ServiceDescriptor,
    pub channel: Channel,
}

impl StorageStub {
    pub fn new(channel: Channel) -> Self {
        Self { descriptor: storage_descriptor(), channel }
    }

    pub async fn set(&mut self, ctl: &mut Controller, value: f64) -> Empty {
        let request = DoubleValue { value: Some(value) };
        let mut response = Empty::default();
        let method = self.descriptor.method(0).unwrap();
        self.channel.call(&method, Some(ctl), &request, &mut response, None).await;
        response
    }

    pub async fn get(&mut self, ctl: &mut Controller) -> DoubleValue {
        let mut response = DoubleValue::default();
        let method = self.descriptor.method(1).unwrap();
        self.channel.call(&method, Some(ctl), &Empty::default(), &mut response, None).await;
        response
    }

    pub async fn append(&mut self, ctl: &mut Controller, data: &str) -> StringValue {
        let request = StringValue { data: Some(data.to_string()) };
        let mut response = StringValue::default();
        let method = self.descriptor.method(2).unwrap();
        self.channel.call(&method, Some(ctl), &request, &mut response, None).await;
        response
    }

    pub async fn delay(&mut self, ctl: &mut Controller) -> Empty {
        let mut response = Empty::default();
        let method = self.descriptor.method(3).unwrap();
        self.channel.call(&method, Some(ctl), &Empty::default(), &mut response, None).await;
        response
    }
}

pub struct TestRunner {
    rt: tokio::runtime::Runtime,
}

impl TestRunner {
    pub fn new() -> Self {
        Self {
            rt: tokio::runtime::Builder::new_multi_thread()
                .worker_threads(4)
                .enable_all()
                .build()
                .unwrap(),
        }
    }

    pub fn block_on<F: Future<Output = ()>>(&self, f: F) {
        self.rt.block_on(f);
    }
}

#[fixture]
pub fn runner() -> TestRunner {
    TestRunner::new()
}
