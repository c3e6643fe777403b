// upway-api: Async client for the myUpway portal's cookie-authenticated private API

pub mod auth;
pub mod error;
pub mod expiry;
pub mod retry;
pub mod session;
pub mod transport;
pub mod values;

pub use auth::{Credentials, LOGIN_PATH};
pub use error::Error;
pub use expiry::{is_session_expired, redirect_path};
pub use retry::retry_once_after_reauth;
pub use session::PortalSession;
pub use transport::TransportConfig;
pub use values::{VALUES_PATH, VariableValue, ValuesResponse};
