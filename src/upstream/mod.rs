pub mod cluster;
pub mod loadbalance;

pub use cluster::{Cluster, ClusterStore};
pub use loadbalance::{LoadBalancer, UpstreamInstance};
