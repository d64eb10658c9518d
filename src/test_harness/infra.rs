//! Testcontainers infrastructure management
//!
//! Starts a throwaway BigQuery emulator (`ghcr.io/goccy/bigquery-emulator`)
//! for integration tests and hands out an [`EngineConfig`] pointing at it.
//! Requires Docker.
//!
//! ```rust,ignore
//! use bqtest::test_harness::infra::EmulatorInfra;
//!
//! #[tokio::test]
//! async fn test_with_emulator() {
//!     let infra = EmulatorInfra::start().await.unwrap();
//!     let client = BigQueryClient::new(infra.engine_config()).unwrap();
//!     // ... run tests
//!     infra.stop().await;
//! }
//! ```

use super::config::{EngineConfig, DEFAULT_PROJECT};
use super::error::{TestHarnessError, TestHarnessResult};
use crate::engine::{BigQueryClient, QueryEngine};
use std::time::Duration;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

pub const EMULATOR_IMAGE: &str = "ghcr.io/goccy/bigquery-emulator";
pub const EMULATOR_TAG: &str = "latest";
pub const EMULATOR_PORT: u16 = 9050;

const READY_ATTEMPTS: u32 = 60;
const READY_DELAY: Duration = Duration::from_millis(500);

/// A running emulator container
pub struct EmulatorInfra {
    container: ContainerAsync<GenericImage>,
    endpoint: String,
    project: String,
}

impl EmulatorInfra {
    /// Start an emulator for the default project and wait until it answers
    pub async fn start() -> TestHarnessResult<Self> {
        Self::start_for_project(DEFAULT_PROJECT).await
    }

    pub async fn start_for_project(project: &str) -> TestHarnessResult<Self> {
        log::info!("Starting BigQuery emulator container via testcontainers...");

        let container = GenericImage::new(EMULATOR_IMAGE, EMULATOR_TAG)
            .with_exposed_port(EMULATOR_PORT.tcp())
            .with_cmd([format!("--project={}", project)])
            .start()
            .await
            .map_err(|e| infra_error("start emulator container", e))?;

        let host_port = container
            .get_host_port_ipv4(EMULATOR_PORT.tcp())
            .await
            .map_err(|e| infra_error("get emulator port", e))?;

        let infra = Self {
            container,
            endpoint: format!("http://127.0.0.1:{}", host_port),
            project: project.to_string(),
        };
        infra.wait_until_ready().await?;

        log::info!("BigQuery emulator listening at {}", infra.endpoint);
        Ok(infra)
    }

    /// Poll the REST API until the emulator serves requests
    async fn wait_until_ready(&self) -> TestHarnessResult<()> {
        let client = BigQueryClient::new(self.engine_config())?;
        let mut last_error = None;

        for _ in 0..READY_ATTEMPTS {
            match client.dataset_exists("readiness_probe").await {
                Ok(_) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
            tokio::time::sleep(READY_DELAY).await;
        }

        Err(TestHarnessError::Timeout {
            operation: format!(
                "waiting for emulator at {} ({})",
                self.endpoint,
                last_error.map(|e| e.to_string()).unwrap_or_default()
            ),
            timeout_ms: (READY_DELAY * READY_ATTEMPTS).as_millis() as u64,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Engine settings targeting this emulator
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_endpoint(&self.endpoint)
            .with_project(&self.project)
            .with_poll_interval(Duration::from_millis(100))
            .with_query_timeout(Duration::from_secs(60))
    }

    /// Stop and remove the container. Failures are logged, not returned.
    pub async fn stop(self) {
        log::info!("Stopping BigQuery emulator container...");
        if let Err(e) = self.container.stop().await {
            log::warn!("Failed to stop emulator container: {}", e);
        }
        if let Err(e) = self.container.rm().await {
            log::warn!("Failed to remove emulator container: {}", e);
        }
    }
}

fn infra_error(operation: &str, err: impl std::fmt::Display) -> TestHarnessError {
    TestHarnessError::EngineError {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}
