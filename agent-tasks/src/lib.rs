//! Task & delegation store: tracks the tree of delegations between agents
//! within a run, and the working context that flows forward through it.

pub mod error;
pub mod store;
pub mod task;

pub use error::TaskError;
pub use store::TaskStore;
pub use task::{Interaction, Task, TaskStatus, WorkingContext, describe_from_input};
