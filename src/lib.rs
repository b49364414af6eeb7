pub mod accessors;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod db;
pub mod error;
pub mod geolocation;
pub mod models;
pub mod notify;
pub mod services;
pub mod session;
pub mod state;
pub mod views;

pub use cancel::{CancelSource, CancelToken};
pub use config::Config;
pub use error::{BackendError, ClientError, ValidationError};
pub use state::ClientState;
