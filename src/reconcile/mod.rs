pub mod reconciler;
pub mod snapshot;

pub use snapshot::{build_clusters, build_routes, ChangeToken, Cluster, ConfigSnapshot, Destination, Route};
