//! API endpoint handlers, one module per resource.

pub mod analyze;
pub mod auth;
pub mod diagnosis;
pub mod files;
pub mod health;
pub mod reports;
pub mod upload;
