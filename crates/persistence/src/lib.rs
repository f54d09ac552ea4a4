pub mod error;
pub mod queue;

pub use error::{PersistenceError, Result};
pub use queue::{PendingQueue, PendingWrite};
