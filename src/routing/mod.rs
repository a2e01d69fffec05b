mod matcher;

pub use matcher::{CompiledRoute, RouteTable, RouteTableCache};
