mod ingest;
mod model;

pub use ingest::{OwnerProfile, read_connections, read_profile};
pub use model::{Edge, Network, Node, OWNER_ID};

#[cfg(test)]
pub(crate) use model::tests as fixtures;
