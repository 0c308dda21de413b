use async_trait::async_trait;

use super::{TenantContext, TenantError};

/// Resolves an externally supplied identifier (slug or UUID) to a tenant.
///
/// Implementations return [`TenantError::NotFound`] when nothing matches and
/// [`TenantError::Inactive`] when the match is deactivated. Callers pass a
/// trimmed, non-empty identifier.
#[async_trait]
pub trait TenantLookup: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<TenantContext, TenantError>;
}
