/// Session collaborator keyed on the local cache.
pub mod auth;
/// Remote completion store facade.
pub mod completion_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Local mirror reconciliation with the remote completion store.
pub mod reconciliation;
/// Settings provider chain.
pub mod settings_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Remote store connection supervisor.
pub mod storage_supervisor;
