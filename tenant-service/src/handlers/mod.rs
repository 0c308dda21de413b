//! HTTP handlers for tenant-service.
//!
//! Everything under `/actuator` is exempt from tenant resolution by default.

pub mod health;
pub mod tenant;

pub use health::{health_check, info};
pub use tenant::{current_tenant, current_tenant_from_task, current_tenant_id};
