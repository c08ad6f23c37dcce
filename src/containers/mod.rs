//! Utility data structures used throughout the solver.

mod int_queue_set;
mod keyed_vec;

pub use int_queue_set::IntQueueSet;
pub use keyed_vec::KeyedVec;
pub use keyed_vec::StorageKey;
