//! Availability domains data source implementation

use crate::api::identity::availability_domains::AvailabilityDomain;
use crate::data_sources::{configure_provider_data, generate_data_source_id};
use crate::filter::{apply_filters, filter_block, filters_from_config};
use crate::provider_data::OciProviderData;
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{validate_config, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::validator::StringPatternValidator;

pub const TYPE_NAME: &str = "oci_identity_availability_domains";

#[derive(Default)]
pub struct AvailabilityDomainsDataSource {
    provider_data: Option<OciProviderData>,
}

impl AvailabilityDomainsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema() -> Schema {
        let domain = AttributeType::Object(HashMap::from([
            ("name".to_string(), AttributeType::String),
            ("compartment_id".to_string(), AttributeType::String),
        ]));

        SchemaBuilder::new()
            .version(0)
            .description("Lists the availability domains of a tenancy")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("compartment_id", AttributeType::String)
                    .description("The OCID of the tenancy")
                    .required()
                    .validator(StringPatternValidator::ocid())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("availability_domains", AttributeType::List(Box::new(domain)))
                    .description("The availability domains, each with name and compartment_id")
                    .computed()
                    .build(),
            )
            .block(filter_block())
            .build()
    }
}

fn domain_to_dynamic(domain: AvailabilityDomain) -> Dynamic {
    Dynamic::Map(HashMap::from([
        ("name".to_string(), Dynamic::String(domain.name)),
        (
            "compartment_id".to_string(),
            Dynamic::String(domain.compartment_id),
        ),
    ]))
}

#[async_trait]
impl DataSource for AvailabilityDomainsDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: validate_config(&Self::schema().block, &request.config),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::error(vec![Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )]);
        };

        let result = async {
            let config = &request.config;
            let compartment_id = config
                .get_string(&AttributePath::new("compartment_id"))
                .map_err(|_| {
                    Diagnostic::error(
                        "Missing required argument",
                        "The argument \"compartment_id\" is required.",
                    )
                    .with_attribute(AttributePath::new("compartment_id"))
                })?;
            let filters = filters_from_config(config)?;

            let domains = provider_data
                .client
                .identity()
                .availability_domains()
                .list(&compartment_id)
                .await
                .map_err(|e| {
                    Diagnostic::error(
                        "Failed to list availability domains",
                        format!("API error: {}", e),
                    )
                })?;
            tracing::debug!("Found {} availability domains", domains.len());

            let items = domains.into_iter().map(domain_to_dynamic).collect();
            let kept = apply_filters(items, &filters)?;

            let mut state = config.clone();
            let _ = state.set_string(&AttributePath::new("id"), generate_data_source_id());
            let _ = state.set_list(&AttributePath::new("availability_domains"), kept);
            Ok::<_, Diagnostic>(state)
        }
        .await;

        match result {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
                deferred: None,
            },
            Err(diag) => ReadDataSourceResponse::error(vec![diag]),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AvailabilityDomainsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        configure_provider_data(&mut self.provider_data, request)
    }
}
