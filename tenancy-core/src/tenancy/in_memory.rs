//! Bootstrap-configured tenant registry.

use std::collections::HashMap;

use async_trait::async_trait;
use md5::{Digest, Md5};
use uuid::{Builder, Uuid};

use super::{TenantContext, TenantError, TenantLookup};
use crate::config::TenantSeed;

/// Read-only registry built once from bootstrap seeds.
///
/// Slugs are matched case-insensitively; UUID literals are matched exactly.
/// Nothing writes to the indices after construction, so concurrent reads need
/// no synchronization.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantLookup {
    by_slug: HashMap<String, TenantContext>,
    by_id: HashMap<Uuid, TenantContext>,
}

impl InMemoryTenantLookup {
    /// Build the registry from seeds in order. Later seeds overwrite earlier
    /// ones sharing a slug.
    pub fn from_seeds<'a, I>(seeds: I) -> Self
    where
        I: IntoIterator<Item = &'a TenantSeed>,
    {
        let mut by_slug = HashMap::new();
        let mut by_id = HashMap::new();

        for seed in seeds {
            if seed.slug.trim().is_empty() {
                tracing::warn!(id = ?seed.id, "Skipping bootstrap tenant with blank slug");
                continue;
            }

            let id = seed.id.unwrap_or_else(|| derive_tenant_id(&seed.slug));
            let context = TenantContext::new(id, seed.slug.clone(), seed.active);

            if let Some(previous) = by_slug.insert(seed.slug.to_lowercase(), context.clone()) {
                tracing::warn!(
                    slug = %seed.slug,
                    previous_id = %previous.tenant_id(),
                    id = %id,
                    "Duplicate bootstrap tenant slug, later entry wins"
                );
                // drop the stale id entry unless a later seed has taken it over
                if previous.tenant_id() != id
                    && by_id.get(&previous.tenant_id()) == Some(&previous)
                {
                    by_id.remove(&previous.tenant_id());
                }
            }
            by_id.insert(id, context);
        }

        tracing::info!(count = by_slug.len(), "Loaded bootstrap tenants");

        Self { by_slug, by_id }
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }

    fn find(&self, identifier: &str) -> Option<&TenantContext> {
        if identifier.trim().is_empty() {
            return None;
        }
        if let Some(context) = self.by_slug.get(&identifier.to_lowercase()) {
            return Some(context);
        }
        Uuid::parse_str(identifier)
            .ok()
            .and_then(|id| self.by_id.get(&id))
    }
}

#[async_trait]
impl TenantLookup for InMemoryTenantLookup {
    async fn resolve(&self, identifier: &str) -> Result<TenantContext, TenantError> {
        let context = self
            .find(identifier)
            .ok_or_else(|| TenantError::NotFound(identifier.to_string()))?;

        if !context.is_active() {
            return Err(TenantError::Inactive(identifier.to_string()));
        }

        Ok(context.clone())
    }
}

/// Name-based (version 3) UUID over the raw slug bytes, with no namespace.
///
/// Stable across restarts, so a slug-only seed always maps to the same id.
pub fn derive_tenant_id(slug: &str) -> Uuid {
    let digest = Md5::digest(slug.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    Builder::from_md5_bytes(bytes).into_uuid()
}
