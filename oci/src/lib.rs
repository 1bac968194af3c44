//! Terraform provider for Oracle Cloud Infrastructure core services

pub mod api;
pub mod data_sources;
pub mod filter;
pub mod provider_data;
pub mod resources;
pub mod timeouts;
pub mod waiter;

use async_trait::async_trait;
use provider_data::OciProviderData;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::ManagedResource;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

pub const PROVIDER_NAME: &str = "oci";

#[derive(Default)]
pub struct OciProvider {
    provider_data: Option<OciProviderData>,
    poll_interval: Option<Duration>,
}

impl OciProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides how often resources poll lifecycle state while waiting
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn provider_data(&self) -> Option<&OciProviderData> {
        self.provider_data.as_ref()
    }

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Oracle Cloud Infrastructure provider")
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region identifier, e.g. us-phoenix-1. Falls back to OCI_REGION.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Base URL replacing the regional service hosts. Falls back to OCI_ENDPOINT.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("security_token", AttributeType::String)
                    .description("Bearer token for API requests. Falls back to OCI_SECURITY_TOKEN.")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("retry_max_attempts", AttributeType::Number)
                    .description("Attempts per request before giving up on retryable errors, from 1 to 20. Falls back to OCI_RETRY_MAX_ATTEMPTS.")
                    .optional()
                    .build(),
            )
            .build()
    }
}

fn string_setting(config: &DynamicValue, name: &str, env: &str) -> Option<String> {
    config
        .get_optional_string(&AttributePath::new(name))
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|s| !s.is_empty()))
}

/// Upper bound on `retry_max_attempts`
pub const MAX_RETRY_ATTEMPTS: u32 = 20;

fn retry_attempts_setting(config: &DynamicValue) -> Result<Option<u32>, Diagnostic> {
    let path = AttributePath::new("retry_max_attempts");
    let invalid = |value: String| {
        Diagnostic::error(
            "Invalid retry_max_attempts",
            format!(
                "retry_max_attempts must be a whole number between 1 and {}, got {}",
                MAX_RETRY_ATTEMPTS, value
            ),
        )
        .with_attribute(path.clone())
    };

    let raw = match config.get_number(&path) {
        Ok(n) => Some(n),
        Err(_) => match std::env::var("OCI_RETRY_MAX_ATTEMPTS") {
            Ok(v) => Some(v.parse::<f64>().map_err(|_| invalid(v))?),
            Err(_) => None,
        },
    };

    match raw {
        Some(n) if (1.0..=f64::from(MAX_RETRY_ATTEMPTS)).contains(&n) && n.fract() == 0.0 => {
            Ok(Some(n as u32))
        }
        Some(n) => Err(invalid(n.to_string())),
        None => Ok(None),
    }
}

#[async_trait]
impl Provider for OciProvider {
    fn type_name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: PROVIDER_NAME.to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = &request.config;
        let mut diagnostics = vec![];

        let region = string_setting(config, "region", "OCI_REGION");
        let security_token = string_setting(config, "security_token", "OCI_SECURITY_TOKEN");
        let endpoint = string_setting(config, "endpoint", "OCI_ENDPOINT");
        let retry_attempts = match retry_attempts_setting(config) {
            Ok(attempts) => attempts,
            Err(diag) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![diag],
                    provider_data: None,
                };
            }
        };

        let (region, security_token) = match (region, security_token) {
            (Some(region), Some(token)) => (region, token),
            (None, _) => {
                diagnostics.push(
                    Diagnostic::error(
                        "region is required (set in provider config or OCI_REGION env var)",
                        "",
                    )
                    .with_attribute(AttributePath::new("region")),
                );
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
            (_, None) => {
                diagnostics.push(
                    Diagnostic::error(
                        "security_token is required (set in provider config or OCI_SECURITY_TOKEN env var)",
                        "",
                    )
                    .with_attribute(AttributePath::new("security_token")),
                );
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        let mut client_config = api::ClientConfig::new(&region, &security_token);
        if let Some(endpoint) = &endpoint {
            client_config = client_config.with_endpoint(endpoint);
        }
        if let Some(attempts) = retry_attempts {
            client_config = client_config.with_retry(api::RetryConfig {
                max_retries: attempts - 1,
                ..Default::default()
            });
        }

        match api::Client::new(client_config) {
            Ok(client) => {
                tracing::info!("Configured OCI provider for region {}", region);
                let mut data = OciProviderData::new(client);
                if let Some(interval) = self.poll_interval {
                    data = data.with_poll_interval(interval);
                }
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    format!("Failed to create API client: {}", e),
                    "",
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            resources::core::resource_virtual_network::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::VirtualNetworkResource::new()) as Box<dyn ManagedResource>
            }),
        );
        resources.insert(
            resources::core::resource_subnet::TYPE_NAME.to_string(),
            Box::new(|| Box::new(resources::SubnetResource::new()) as Box<dyn ManagedResource>),
        );
        resources.insert(
            resources::core::resource_instance::TYPE_NAME.to_string(),
            Box::new(|| Box::new(resources::InstanceResource::new()) as Box<dyn ManagedResource>),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            data_sources::identity::data_source_availability_domains::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::AvailabilityDomainsDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        data_sources.insert(
            data_sources::core::data_source_instances::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::InstancesDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        data_sources
    }
}
