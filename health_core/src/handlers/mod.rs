//! HTTP reporting endpoint

pub mod health;
pub mod routes;
