//! Domain model (Task, ids, errors).

pub mod errors;
pub mod ids;
pub mod task;

pub use self::errors::TaskError;
pub use self::ids::{TaskId, TaskName};
pub use self::task::Task;
