//! The I/O-performing services built on top of the pure builder/planner:
//! the transactional upsert executor (§4.4), named-graph management and
//! the conditional-clear engine (§4.5), graph projection (§4.6), and the
//! chunked batch operator (§4.7). Every operation here goes through an
//! [`crate::client::RdfClient`] — nothing in `executor` talks to the
//! network directly.

pub mod batch;
pub mod named_graph;
pub mod projection;
pub mod transaction;

pub use batch::{BatchOperator, BatchOutcome, BatchTemplate};
pub use named_graph::{ClearOutcome, GraphStatus, NamedGraphManager};
pub use projection::{Edge, Node, ProjectionConfig, ProjectionResult, ProjectionSource, ProjectionStats, ProjectionService};
pub use transaction::{Conflict, TransactionExecutor, UpsertOutcome};
