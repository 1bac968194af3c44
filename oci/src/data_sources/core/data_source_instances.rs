//! Instances data source implementation
//!
//! Lists every page of `GET /instances` with the server-side arguments
//! (`availability_domain`, `display_name`, `state`), projects each instance
//! into the `instances` attribute, then applies the `filter` blocks.

use crate::api::core::instances::{Instance, InstanceLifecycleState, ListInstancesParams};
use crate::data_sources::{configure_provider_data, generate_data_source_id};
use crate::filter::{apply_filters, filter_block, filters_from_config};
use crate::provider_data::OciProviderData;
use crate::resources::core::resource_instance::instance_attributes;
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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{StringOneOfValidator, StringPatternValidator};

pub const TYPE_NAME: &str = "oci_core_instances";

/// Attributes resolved from the primary VNIC. Listing never fetches VNICs,
/// so these are always empty in `instances`.
const VNIC_ATTRIBUTES: [&str; 4] = ["subnet_id", "private_ip", "public_ip", "hostname_label"];

#[derive(Default)]
pub struct InstancesDataSource {
    provider_data: Option<OciProviderData>,
}

impl InstancesDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn instance_type() -> AttributeType {
        let string_map = || AttributeType::Map(Box::new(AttributeType::String));
        let mut fields: HashMap<String, AttributeType> = [
            "availability_domain",
            "compartment_id",
            "display_name",
            "id",
            "image",
            "ipxe_script",
            "region",
            "shape",
            "state",
            "time_created",
        ]
        .into_iter()
        .chain(VNIC_ATTRIBUTES)
        .map(|name| (name.to_string(), AttributeType::String))
        .collect();
        fields.insert("metadata".to_string(), string_map());
        fields.insert("extended_metadata".to_string(), string_map());
        AttributeType::Object(fields)
    }

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Lists the compute instances in a compartment")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("compartment_id", AttributeType::String)
                    .description("The OCID of the compartment")
                    .required()
                    .validator(StringPatternValidator::ocid())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("availability_domain", AttributeType::String)
                    .description("Only list instances in this availability domain")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Only list instances with exactly this display name")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Only list instances in this lifecycle state")
                    .optional()
                    .validator(StringOneOfValidator::new(InstanceLifecycleState::ALL))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "instances",
                    AttributeType::List(Box::new(Self::instance_type())),
                )
                .description("The matching instances")
                .computed()
                .build(),
            )
            .block(filter_block())
            .build()
    }

    async fn list(
        &self,
        provider_data: &OciProviderData,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let params = list_params(config)?;
        let filters = filters_from_config(config)?;

        let instances = provider_data
            .client
            .core()
            .instances()
            .list(&params)
            .await
            .map_err(|e| Diagnostic::error("Failed to list instances", format!("API error: {}", e)))?;
        tracing::debug!(
            "Listed {} instances in {}",
            instances.len(),
            params.compartment_id
        );

        let items = instances.iter().map(project_instance).collect();
        let kept = apply_filters(items, &filters)?;

        let mut state = config.clone();
        let _ = state.set_string(&AttributePath::new("id"), generate_data_source_id());
        let _ = state.set_list(&AttributePath::new("instances"), kept);
        Ok(state)
    }
}

fn list_params(config: &DynamicValue) -> Result<ListInstancesParams, Diagnostic> {
    let compartment_id = config
        .get_string(&AttributePath::new("compartment_id"))
        .map_err(|_| {
            Diagnostic::error(
                "Missing required argument",
                "The argument \"compartment_id\" is required.",
            )
            .with_attribute(AttributePath::new("compartment_id"))
        })?;

    let lifecycle_state = config
        .get_optional_string(&AttributePath::new("state"))
        .map(|s| {
            s.parse::<InstanceLifecycleState>().map_err(|e| {
                Diagnostic::error("Invalid instance state", e)
                    .with_attribute(AttributePath::new("state"))
            })
        })
        .transpose()?;

    Ok(ListInstancesParams {
        availability_domain: config.get_optional_string(&AttributePath::new("availability_domain")),
        display_name: config.get_optional_string(&AttributePath::new("display_name")),
        lifecycle_state,
        ..ListInstancesParams::new(&compartment_id)
    })
}

/// One entry of `instances`: the shared instance attributes plus empty
/// VNIC fields. `create_vnic_details` is never part of the listing.
fn project_instance(instance: &Instance) -> Dynamic {
    let mut attributes = instance_attributes(instance);
    for name in VNIC_ATTRIBUTES {
        attributes.insert(name.to_string(), Dynamic::String(String::new()));
    }
    Dynamic::Map(attributes)
}

#[async_trait]
impl DataSource for InstancesDataSource {
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
        tracing::debug!(
            "Reading instances data source, provider_data: {:?}",
            self.provider_data.is_some()
        );

        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::error(vec![Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )]);
        };

        match self.list(provider_data, &request.config).await {
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
impl DataSourceWithConfigure for InstancesDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        configure_provider_data(&mut self.provider_data, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    const COMPARTMENT: &str = "ocid1.compartment.oc1..cccc";

    fn instance_json(id: &str, name: &str, state: &str) -> String {
        format!(
            r#"{{
            "id": "{}",
            "availabilityDomain": "Uocm:PHX-AD-1",
            "compartmentId": "{}",
            "displayName": "{}",
            "shape": "VM.Standard1.1",
            "imageId": "ocid1.image.oc1.phx.mmmm",
            "region": "phx",
            "lifecycleState": "{}",
            "metadata": {{"ssh_authorized_keys": "ssh-rsa AAAA"}},
            "timeCreated": "2018-01-11T18:10:00Z"
        }}"#,
            id, COMPARTMENT, name, state
        )
    }

    fn config() -> DynamicValue {
        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("compartment_id"), COMPARTMENT.to_string())
            .unwrap();
        config
    }

    async fn configured(url: &str) -> InstancesDataSource {
        let mut data_source = InstancesDataSource::new();
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(Arc::new(OciProviderData::new(create_test_client(url)))),
                },
            )
            .await;
        data_source
    }

    #[test]
    fn list_params_carry_server_side_arguments() {
        let mut config = config();
        config
            .set_string(&AttributePath::new("state"), "RUNNING".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("display_name"), "web".to_string())
            .unwrap();

        let params = list_params(&config).unwrap();
        assert_eq!(params.compartment_id, COMPARTMENT);
        assert_eq!(params.lifecycle_state, Some(InstanceLifecycleState::Running));
        assert_eq!(params.display_name.as_deref(), Some("web"));
        assert!(params.availability_domain.is_none());
    }

    #[test]
    fn projection_blanks_vnic_fields_and_defaults_maps() {
        let instance: Instance =
            serde_json::from_str(&instance_json("i1", "web", "RUNNING")).unwrap();
        let projected = project_instance(&instance);
        let map = projected.as_map().unwrap();

        for name in VNIC_ATTRIBUTES {
            assert_eq!(map[name].as_string(), Some(""), "{}", name);
        }
        assert_eq!(map["ipxe_script"].as_string(), Some(""));
        assert_eq!(map["extended_metadata"].as_map().map(|m| m.len()), Some(0));
        assert_eq!(map["image"].as_string(), Some("ocid1.image.oc1.phx.mmmm"));
        assert_eq!(
            map["time_created"].as_string(),
            Some("2018-01-11 18:10:00 +0000 UTC")
        );
        assert!(!map.contains_key("create_vnic_details"));
    }

    #[tokio::test]
    async fn read_follows_pages_and_applies_filters() {
        let mut server = Server::new_async().await;
        let _first = server
            .mock("GET", "/20160918/instances")
            .match_query(Matcher::Regex(format!(
                "^compartmentId={}&lifecycleState=RUNNING$",
                urlencoding::encode(COMPARTMENT)
            )))
            .with_header("opc-next-page", "p2")
            .with_body(format!("[{}]", instance_json("i1", "web-1", "RUNNING")))
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/20160918/instances")
            .match_query(Matcher::UrlEncoded("page".into(), "p2".into()))
            .with_body(format!(
                "[{}, {}]",
                instance_json("i2", "web-2", "RUNNING"),
                instance_json("i3", "db-1", "RUNNING")
            ))
            .create_async()
            .await;

        let data_source = configured(&server.url()).await;
        let mut config = config();
        config
            .set_string(&AttributePath::new("state"), "RUNNING".to_string())
            .unwrap();
        config
            .set_list(
                &AttributePath::new("filter"),
                vec![Dynamic::Map(HashMap::from([
                    ("name".to_string(), Dynamic::from("display_name")),
                    (
                        "values".to_string(),
                        Dynamic::List(vec![Dynamic::from("^web-")]),
                    ),
                    ("regex".to_string(), Dynamic::Bool(true)),
                ]))],
            )
            .unwrap();

        let response = data_source
            .read(Context::new(), ReadDataSourceRequest::new(TYPE_NAME, config))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let instances = response
            .state
            .get_list(&AttributePath::new("instances"))
            .unwrap();
        let ids: Vec<_> = instances
            .iter()
            .filter_map(|i| i.as_map()?.get("id")?.as_string())
            .collect();
        assert_eq!(ids, vec!["i1", "i2"]);
        assert_eq!(
            response
                .state
                .get_string(&AttributePath::new("state"))
                .unwrap(),
            "RUNNING"
        );
    }

    #[tokio::test]
    async fn validate_rejects_unknown_state() {
        let mut config = config();
        config
            .set_string(&AttributePath::new("state"), "SLEEPING".to_string())
            .unwrap();

        let response = InstancesDataSource::new()
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0]
                .attribute
                .as_ref()
                .map(|p| p.to_string())
                .as_deref(),
            Some("state")
        );
    }

    #[tokio::test]
    async fn read_requires_configuration() {
        let response = InstancesDataSource::new()
            .read(Context::new(), ReadDataSourceRequest::new(TYPE_NAME, config()))
            .await;
        assert!(response.state.is_null());
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
