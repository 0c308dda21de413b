//! Tenant identity: resolution, validation and request-scoped storage.

pub mod bypass;
pub mod context;
pub mod error;
pub mod in_memory;
pub mod lookup;
pub mod scope;

pub use bypass::{BypassMatcher, InvalidPatternError, PathPattern};
pub use context::TenantContext;
pub use error::{TenantError, TenantErrorKind, TenantErrorResponse};
pub use in_memory::{derive_tenant_id, InMemoryTenantLookup};
pub use lookup::TenantLookup;
pub use scope::{RequestTenantScope, TenantScopeGuard};
