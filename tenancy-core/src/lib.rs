//! tenancy-core: request-scoped tenant resolution and the shared service plumbing around it.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod tenancy;

pub use async_trait;
pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;

pub use tenancy::{
    InMemoryTenantLookup, RequestTenantScope, TenantContext, TenantError, TenantLookup,
};
