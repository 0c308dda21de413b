pub mod tenant_resolution;
pub mod tracing;

pub use self::tracing::{request_id_middleware, REQUEST_ID_HEADER};
pub use tenant_resolution::{
    tenant_resolution_middleware, CurrentTenant, Resolution, TenantResolutionMiddleware,
};
