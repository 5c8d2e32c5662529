// crates/core/src/lib.rs
//! Task lifecycle core: the task entity, its store, and the external
//! collaborators (content producers, publishers) a generation job drives.

pub mod error;
pub mod llm;
pub mod publish;
pub mod store;
pub mod task;

pub use error::*;
pub use store::TaskStore;
pub use task::*;
