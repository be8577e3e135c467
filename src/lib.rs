//! Library crate for party-trivia-back: game completion tracking and settings
//! synchronisation, exposed for the daemon, the OpenAPI generator and integration tests.

/// Local key/value cache backing the completion mirror and the session.
pub mod cache;
/// Game catalog.
pub mod catalog;
/// Application configuration.
pub mod config;
/// Remote stores and their models.
pub mod dao;
/// HTTP request and response bodies.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Completion policy.
pub mod policy;
/// HTTP routes.
pub mod routes;
/// Business services.
pub mod services;
/// Shared application state.
pub mod state;
