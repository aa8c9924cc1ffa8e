pub mod admin;
pub mod auth;
pub mod clock;
pub mod error;
pub mod form;
pub mod public_list;
mod subscription;

pub use admin::{
    AdminController, AdminEvent, AdminOptions, AdminView, FormMode, SaveOutcome, SAVE_TIMEOUT,
};
pub use auth::{AdminPolicy, AdminRouteDecision, AuthGate, AuthState, LoginRouteDecision, StaticAuthGate};
pub use clock::{Clock, SystemClock};
pub use error::{ControllerError, ErrorCategory, ErrorNotice, StoreOperation, UserAction, ValidationError};
pub use form::{check, validate, AppForm};
pub use public_list::{ListState, PublicListView};
pub use subscription::Subscription;

/// Collection holding the app entries.
pub const APPS_COLLECTION: &str = "apps";
