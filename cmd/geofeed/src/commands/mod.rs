//! CLI commands module.

mod cluster;
mod fetch;
mod pick;
mod util;

pub use cluster::ClusterCommand;
pub use fetch::FetchCommand;
pub use pick::PickCommand;

pub(crate) use util::*;
