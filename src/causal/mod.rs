/*!
 * Causal Memory
 * Outcome log, condition labels and the weighted graph folded from them
 */

pub mod conditions;
mod graph;
mod layer;
mod record;
mod store;

pub use conditions::{conditions_from_context, conditions_from_record, derive_conditions};
pub use graph::{CausalEdge, CausalGraph};
pub use layer::CausalMemoryLayer;
pub use record::{OutcomeKind, OutcomeRecord, OutcomeRecordBuilder};
pub use store::{EventStore, RecordQuery};
