//! Request handlers, one module per resource.

pub mod auth;
pub mod domains;
pub mod employees;
pub mod health;
pub mod oauth;
