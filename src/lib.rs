/// `graphhog` is a library for storing and querying a partitioned
/// property graph: typed nodes and edges, spec-driven traversal, a
/// pluggable rule/event bus, and a transaction engine with a baseline,
/// thread-safe, and background-self-committing variant.
pub mod config;
pub mod container;
pub mod directory;
pub mod error;
pub mod graph;
pub mod io;
pub mod model;
pub mod names;
pub mod rules;
pub mod storage;
pub mod txn;
pub mod value;

pub use error::{ErrorKind, GraphError, GraphResult};
pub use graph::GraphManager;
pub use model::{Edge, Node, Spec, TargetDescriptor};
