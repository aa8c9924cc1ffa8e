pub mod domain;
pub mod error;
pub mod protocol;

pub use domain::{sort_newest_first, AppRecord, LaunchStatus, RecordId};
pub use error::{StoreError, StoreErrorCode};
pub use protocol::AppFields;
