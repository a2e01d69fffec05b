pub mod builder;
pub mod client;

pub use builder::{build_service_map, ServiceInstance, ServiceMap};
pub use client::{ConsulClient, ConsulServiceEntry, RegistrationRecord, RegistryClient};
