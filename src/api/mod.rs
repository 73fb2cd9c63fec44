//! HTTP API.
//!
//! JSON endpoints under `/api/`, stored images under `/uploads/`.
//! Protected routes run behind: Rate Limit → Auth → Audit → Handler.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::{api_router, build_router};
pub use server::{start_server, ApiServer, ServerError};
pub use types::ApiContext;
