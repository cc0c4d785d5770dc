//! Server-rendered portal pages and the admin form endpoints

pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod templates;

pub use extractors::{PortalError, SessionId};
pub use routes::create_router;
