// smc-api: Async Rust client for the Security Management Center REST API
//
// Session lifecycle (version negotiation, login, entry points), the
// request pipeline and its result envelope. Resource modelling lives in
// smc-core.

pub mod auth;
pub mod error;
pub mod request;
pub mod result;
pub mod session;
pub mod transport;
pub mod types;

pub use auth::{Credential, SESSION_HEADER};
pub use error::{Error, TransportFailure};
pub use request::{Operation, SmcRequest};
pub use reqwest::Method;
pub use result::{Content, SmcResult};
pub use session::{Session, SessionConfig, clear_default_session, default_session, set_default_session};
pub use transport::{RetryPolicy, TlsMode, TransportConfig};
pub use types::{ApiVersion, Etag, Href, SUPPORTED_VERSIONS, negotiate_version};
