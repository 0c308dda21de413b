use axum::Json;
use serde::Serialize;
use tenancy_core::error::AppError;
use tenancy_core::middleware::CurrentTenant;
use tenancy_core::RequestTenantScope;

#[derive(Debug, Serialize)]
pub struct CurrentTenantResponse {
    pub id: String,
    pub slug: String,
}

/// `GET /tenants/current`
pub async fn current_tenant(CurrentTenant(tenant): CurrentTenant) -> Json<CurrentTenantResponse> {
    Json(CurrentTenantResponse {
        id: tenant.tenant_id().to_string(),
        slug: tenant.slug().to_string(),
    })
}

/// `GET /tenants/current/id`, read straight from the request scope.
pub async fn current_tenant_id() -> Result<String, AppError> {
    Ok(RequestTenantScope::require_tenant_id()?.to_string())
}

/// `GET /tenants/current/background`
///
/// Resolves the tenant from a spawned task, which starts with a copy of the
/// request's binding.
pub async fn current_tenant_from_task() -> Result<Json<CurrentTenantResponse>, AppError> {
    let tenant = RequestTenantScope::spawn_inheriting(async { RequestTenantScope::require() })
        .await
        .map_err(|e| AppError::InternalError(e.into()))??;

    Ok(Json(CurrentTenantResponse {
        id: tenant.tenant_id().to_string(),
        slug: tenant.slug().to_string(),
    }))
}
