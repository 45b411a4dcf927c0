//! Domain model (IDs, tasks, links, states, errors).

pub mod errors;
pub mod ids;
pub mod link;
pub mod state;
pub mod task;

pub use self::errors::{ArchiveError, FetchError, ServiceError, StoreError};
pub use self::ids::{ParseIdError, TaskId};
pub use self::link::{FileLink, LinkStatus, unique_entry_name, url_basename};
pub use self::state::{TaskOutcome, TaskState};
pub use self::task::Task;
