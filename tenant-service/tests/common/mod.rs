use std::sync::Arc;
use tenancy_core::config::{Config as CoreConfig, TenancyConfig, TenantSeed};
use tenancy_core::TenantLookup;
use tenant_service::config::TenantServiceConfig;
use tenant_service::startup::Application;
use uuid::Uuid;

pub const GREEN_ID: &str = "00000000-0000-0000-0000-00000000abcd";

pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub client: reqwest::Client,
}

pub fn test_config() -> TenantServiceConfig {
    TenantServiceConfig {
        // Use random port for testing (port 0)
        common: CoreConfig {
            port: 0,
            tenancy: TenancyConfig {
                bootstrap_tenants: vec![
                    TenantSeed::new("tenant-green")
                        .with_id(Uuid::parse_str(GREEN_ID).expect("valid uuid")),
                    TenantSeed::new("tenant-blue"),
                    TenantSeed::new("tenant-disabled").inactive(),
                ],
                ..TenancyConfig::default()
            },
        },
        service_name: "tenant-service".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let app = Application::build(test_config())
            .await
            .expect("Failed to build test application");
        Self::start(app).await
    }

    pub async fn spawn_with_lookup(lookup: Arc<dyn TenantLookup>) -> Self {
        let app = Application::build_with_lookup(test_config(), lookup)
            .await
            .expect("Failed to build test application");
        Self::start(app).await
    }

    async fn start(app: Application) -> Self {
        let http_port = app.http_port();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/actuator/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
            client,
        }
    }

    pub async fn get(&self, path: &str, tenant: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(format!("{}{}", self.http_address, path));
        if let Some(tenant) = tenant {
            request = request.header("X-Tenant-ID", tenant);
        }
        request.send().await.expect("Failed to execute request")
    }
}
