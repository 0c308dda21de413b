use serde::Serialize;
use uuid::Uuid;

/// Immutable snapshot describing a resolved tenant.
///
/// Equality is by value. The slug is kept exactly as it was registered even
/// though lookups treat it case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TenantContext {
    tenant_id: Uuid,
    slug: String,
    active: bool,
}

impl TenantContext {
    pub fn new(tenant_id: Uuid, slug: impl Into<String>, active: bool) -> Self {
        Self {
            tenant_id,
            slug: slug.into(),
            active,
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_value() {
        let id = Uuid::new_v4();
        let a = TenantContext::new(id, "tenant-a", true);
        let b = TenantContext::new(id, "tenant-a".to_string(), true);
        assert_eq!(a, b);
        assert_ne!(a, TenantContext::new(id, "tenant-a", false));
    }

    #[test]
    fn slug_is_stored_as_given() {
        let ctx = TenantContext::new(Uuid::nil(), "Tenant-A", true);
        assert_eq!(ctx.slug(), "Tenant-A");
    }

    #[test]
    fn serializes_with_field_names() {
        let ctx = TenantContext::new(Uuid::nil(), "tenant-a", true);
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["tenant_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["slug"], "tenant-a");
        assert_eq!(json["active"], true);
    }
}
