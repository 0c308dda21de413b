//! Per-request tenant resolution.
//!
//! For every request the middleware:
//! 1. lets bypassed paths through without a tenant,
//! 2. reads the tenant header (rejecting with 400 when absent or blank),
//! 3. resolves it through the configured [`TenantLookup`] (404 / 403 on failure),
//! 4. binds the result into [`RequestTenantScope`] for the rest of the request.
//!
//! The scope is cleared exactly once when the request finishes, whichever of
//! these paths was taken and even if the handler fails or the request future
//! is dropped.
//!
//! ```rust,ignore
//! let resolver = TenantResolutionMiddleware::from_config(lookup, &config.tenancy)?;
//! let app = Router::new()
//!     .route("/orders", get(list_orders))
//!     .layer(axum::middleware::from_fn_with_state(
//!         resolver,
//!         tenant_resolution_middleware,
//!     ));
//! ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{TenancyConfig, DEFAULT_TENANT_HEADER};
use crate::error::AppError;
use crate::tenancy::{
    BypassMatcher, RequestTenantScope, TenantContext, TenantError, TenantLookup,
};

/// Outcome of a successful resolution step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The path matched a bypass pattern; no tenant is bound.
    Bypassed,
    Resolved(TenantContext),
}

#[derive(Clone)]
pub struct TenantResolutionMiddleware {
    lookup: Arc<dyn TenantLookup>,
    bypass: Arc<BypassMatcher>,
    header_name: HeaderName,
}

impl std::fmt::Debug for TenantResolutionMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantResolutionMiddleware")
            .field("bypass", &self.bypass)
            .field("header_name", &self.header_name)
            .finish_non_exhaustive()
    }
}

impl TenantResolutionMiddleware {
    pub fn new(lookup: Arc<dyn TenantLookup>, bypass: BypassMatcher) -> Self {
        Self {
            lookup,
            bypass: Arc::new(bypass),
            header_name: HeaderName::from_static("x-tenant-id"),
        }
    }

    pub fn from_config(
        lookup: Arc<dyn TenantLookup>,
        config: &TenancyConfig,
    ) -> Result<Self, AppError> {
        let header_name = HeaderName::try_from(config.header_name.as_str()).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid tenant header name '{}': {}",
                config.header_name,
                e
            ))
        })?;

        Ok(Self::new(lookup, config.bypass_matcher()?).with_header_name(header_name))
    }

    pub fn with_header_name(mut self, header_name: HeaderName) -> Self {
        self.header_name = header_name;
        self
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Returns `Ok(None)` for bypassed paths, otherwise the trimmed header
    /// value to resolve.
    pub fn extract_identifier(
        &self,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<Option<String>, TenantError> {
        if let Some(pattern) = self.bypass.find_match(path) {
            tracing::debug!(path, pattern = pattern.as_str(), "Tenant resolution bypassed");
            return Ok(None);
        }

        let identifier = headers
            .get(&self.header_name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).trim().to_string())
            .unwrap_or_default();

        if identifier.is_empty() {
            return Err(TenantError::MissingHeader(self.header_display_name()));
        }

        Ok(Some(identifier))
    }

    /// Run the resolution protocol without touching the scope.
    pub async fn resolve_request(
        &self,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<Resolution, TenantError> {
        match self.extract_identifier(path, headers)? {
            None => Ok(Resolution::Bypassed),
            Some(identifier) => self.lookup.resolve(&identifier).await.map(Resolution::Resolved),
        }
    }

    pub async fn handle(&self, request: Request, next: Next) -> Response {
        RequestTenantScope::run(async move {
            // completion hook: clears the slot on every exit path
            let _completion = RequestTenantScope::guard();

            let resolution = self
                .resolve_request(request.uri().path(), request.headers())
                .await;

            match resolution {
                Ok(Resolution::Bypassed) => next.run(request).await,
                Ok(Resolution::Resolved(context)) => {
                    tracing::Span::current()
                        .record("tenant_id", tracing::field::display(context.tenant_id()));
                    tracing::debug!(
                        tenant_id = %context.tenant_id(),
                        slug = context.slug(),
                        "Tenant resolved"
                    );
                    RequestTenantScope::set(context);
                    next.run(request).await
                }
                Err(err) => reject(err),
            }
        })
        .await
    }

    fn header_display_name(&self) -> String {
        // HeaderName compares case-insensitively against str
        if self.header_name == DEFAULT_TENANT_HEADER {
            DEFAULT_TENANT_HEADER.to_string()
        } else {
            self.header_name.to_string()
        }
    }
}

fn reject(err: TenantError) -> Response {
    tracing::warn!(error = %err, code = err.kind().code(), "Tenant resolution failed");
    err.into_response()
}

/// Middleware entry point for `axum::middleware::from_fn_with_state`.
pub async fn tenant_resolution_middleware(
    State(resolver): State<TenantResolutionMiddleware>,
    request: Request,
    next: Next,
) -> Response {
    resolver.handle(request, next).await
}

/// Extractor for the tenant bound to the current request.
///
/// ```rust,ignore
/// async fn handler(CurrentTenant(tenant): CurrentTenant) -> String {
///     tenant.slug().to_string()
/// }
/// ```
///
/// Rejects with a 500 when used on a route the middleware does not cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTenant(pub TenantContext);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = TenantError;

    async fn from_request_parts(_parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        RequestTenantScope::require().map(CurrentTenant)
    }
}
