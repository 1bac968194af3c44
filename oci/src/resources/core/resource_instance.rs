//! Compute instance resource
//!
//! Create launches the instance, waits for RUNNING within the create timeout,
//! then resolves the primary VNIC to fill `subnet_id`, `private_ip`,
//! `public_ip` and `hostname_label`.

use crate::api::core::instances::{
    CreateVnicDetails, Instance, InstanceLifecycleState, LaunchInstanceDetails,
    UpdateInstanceDetails,
};
use crate::api::core::vnics::{Vnic, VnicAttachmentLifecycleState};
use crate::api::{ApiError, Client};
use crate::provider_data::OciProviderData;
use crate::resources::{
    configure_provider_data, create_response, format_time, json_map_to_strings,
    provider_not_configured, required_string, set_string_or_empty, state_id, string_map_dynamic,
    strings_to_json_map, CreateFailure,
};
use crate::timeouts::{timeouts_block, ResourceTimeouts};
use crate::waiter::{wait_for_state, StateWait};
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    validate_config, AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema,
    SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{StringLengthValidator, StringPatternValidator};

pub const TYPE_NAME: &str = "oci_core_instance";

#[derive(Default)]
pub struct InstanceResource {
    provider_data: Option<OciProviderData>,
}

impl InstanceResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema() -> Schema {
        let string = |name: &str, desc: &str| {
            AttributeBuilder::new(name, AttributeType::String).description(desc)
        };
        let string_map = |name: &str, desc: &str| {
            AttributeBuilder::new(name, AttributeType::Map(Box::new(AttributeType::String)))
                .description(desc)
                .optional()
                .build()
        };

        let vnic_block = NestedBlockBuilder::new("create_vnic_details", NestingMode::List)
            .description("Details for the primary VNIC")
            .max_items(1)
            .attribute(
                string("subnet_id", "The OCID of the subnet for the VNIC")
                    .required()
                    .validator(StringPatternValidator::ocid())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("assign_public_ip", AttributeType::Bool)
                    .optional()
                    .build(),
            )
            .attribute(string("private_ip", "Private IP to assign").optional().build())
            .attribute(string("hostname_label", "Hostname label").optional().build())
            .attribute(string("display_name", "VNIC display name").optional().build())
            .build();

        SchemaBuilder::new()
            .version(0)
            .description("Launches and manages a compute instance")
            .attribute(string("id", "The OCID of the instance").computed().build())
            .attribute(
                string("availability_domain", "The availability domain of the instance")
                    .required()
                    .build(),
            )
            .attribute(
                string("compartment_id", "The OCID of the compartment")
                    .required()
                    .validator(StringPatternValidator::ocid())
                    .build(),
            )
            .attribute(string("shape", "The instance shape, e.g. VM.Standard1.1").required().build())
            .attribute(
                string("image", "The OCID of the boot image")
                    .required()
                    .validator(StringPatternValidator::ocid())
                    .build(),
            )
            .attribute(
                string("subnet_id", "Subnet of the primary VNIC")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                string("display_name", "A user-friendly name")
                    .optional()
                    .computed()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: Some(255),
                    })
                    .build(),
            )
            .attribute(
                string("hostname_label", "Hostname of the primary VNIC")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(string("ipxe_script", "Custom iPXE script").optional().build())
            .attribute(string_map("metadata", "Custom metadata such as ssh_authorized_keys"))
            .attribute(string_map("extended_metadata", "Additional metadata, values may be JSON"))
            .attribute(string("state", "The instance lifecycle state").computed().build())
            .attribute(string("region", "The region the instance runs in").computed().build())
            .attribute(string("time_created", "Launch time").computed().build())
            .attribute(string("private_ip", "Primary VNIC private IP").computed().build())
            .attribute(string("public_ip", "Primary VNIC public IP").computed().build())
            .block(vnic_block)
            .block(timeouts_block())
            .build()
    }

    fn provider(&self) -> Result<&OciProviderData, Diagnostic> {
        self.provider_data.as_ref().ok_or_else(provider_not_configured)
    }

    async fn launch(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
    ) -> Result<(DynamicValue, Vec<Diagnostic>), CreateFailure> {
        let provider = self.provider()?;
        let config = &request.config;
        let timeouts = ResourceTimeouts::from_config(config)?;

        let details = LaunchInstanceDetails {
            availability_domain: required_string(config, "availability_domain")?,
            compartment_id: required_string(config, "compartment_id")?,
            shape: required_string(config, "shape")?,
            image_id: required_string(config, "image")?,
            subnet_id: config.get_optional_string(&AttributePath::new("subnet_id")),
            display_name: config.get_optional_string(&AttributePath::new("display_name")),
            hostname_label: config.get_optional_string(&AttributePath::new("hostname_label")),
            ipxe_script: config.get_optional_string(&AttributePath::new("ipxe_script")),
            metadata: config.get_string_map(&AttributePath::new("metadata")),
            extended_metadata: config
                .get_string_map(&AttributePath::new("extended_metadata"))
                .map(|m| strings_to_json_map(&m)),
            create_vnic_details: vnic_details_from_config(config),
        };

        let instances = provider.client.core().instances();
        let launched = instances.launch(&details).await.map_err(|e| {
            Diagnostic::error("Failed to launch instance", format!("API error: {}", e))
        })?;
        tracing::info!("Launched instance {}", launched.id);

        let mut state = request.planned_state.clone();
        instance_to_state(&launched, &mut state);

        let wait = StateWait::new(
            vec![InstanceLifecycleState::Running],
            vec![
                InstanceLifecycleState::Provisioning,
                InstanceLifecycleState::Starting,
            ],
            timeouts.create,
        )
        .poll_interval(provider.poll_interval);

        let id = launched.id.as_str();
        let instance = wait_for_state(ctx, id, &wait, || instances.get(id), |i: &Instance| {
            i.lifecycle_state
        })
        .await
        .map_err(|e| Diagnostic::error("Failed waiting for instance", e.to_string()))
        .and_then(|found| {
            found.ok_or_else(|| {
                Diagnostic::error("Instance disappeared", format!("{} was deleted", id))
            })
        })
        .map_err(|diag| CreateFailure::after_create(state.clone(), diag))?;

        instance_to_state(&instance, &mut state);
        let warnings = apply_primary_vnic(&provider.client, &instance, &mut state).await;
        Ok((state, warnings))
    }
}

fn vnic_details_from_config(config: &DynamicValue) -> Option<CreateVnicDetails> {
    let block = config
        .get(&AttributePath::new("create_vnic_details").index(0))?
        .as_map()?;
    let string = |name: &str| block.get(name).and_then(Dynamic::as_string).map(str::to_string);

    Some(CreateVnicDetails {
        subnet_id: string("subnet_id")?,
        assign_public_ip: block.get("assign_public_ip").and_then(Dynamic::as_bool),
        private_ip: string("private_ip"),
        hostname_label: string("hostname_label"),
        display_name: string("display_name"),
    })
}

/// Attributes every view of an instance shares: the resource state and the
/// `instances` entries of the list data source
pub(crate) fn instance_attributes(instance: &Instance) -> HashMap<String, Dynamic> {
    let string = |v: Option<&str>| Dynamic::String(v.unwrap_or_default().to_string());
    let metadata = instance.metadata.clone().unwrap_or_default();
    let extended_metadata = instance
        .extended_metadata
        .as_ref()
        .map(json_map_to_strings)
        .unwrap_or_default();

    HashMap::from([
        ("id".to_string(), string(Some(&instance.id))),
        (
            "availability_domain".to_string(),
            string(Some(&instance.availability_domain)),
        ),
        (
            "compartment_id".to_string(),
            string(Some(&instance.compartment_id)),
        ),
        (
            "display_name".to_string(),
            string(instance.display_name.as_deref()),
        ),
        ("shape".to_string(), string(Some(&instance.shape))),
        ("image".to_string(), string(instance.image_id.as_deref())),
        ("region".to_string(), string(Some(&instance.region))),
        (
            "state".to_string(),
            string(Some(instance.lifecycle_state.as_str())),
        ),
        (
            "ipxe_script".to_string(),
            string(instance.ipxe_script.as_deref()),
        ),
        ("metadata".to_string(), string_map_dynamic(&metadata)),
        (
            "extended_metadata".to_string(),
            string_map_dynamic(&extended_metadata),
        ),
        (
            "time_created".to_string(),
            Dynamic::String(format_time(instance.time_created)),
        ),
    ])
}

fn instance_to_state(instance: &Instance, state: &mut DynamicValue) {
    for (name, value) in instance_attributes(instance) {
        let _ = state.set_value(&AttributePath::new(&name), value);
    }
}

/// Looks up the instance's attached VNICs and copies the primary one's
/// addressing into state. Failures become warnings: the instance exists
/// either way.
async fn apply_primary_vnic(
    client: &Client,
    instance: &Instance,
    state: &mut DynamicValue,
) -> Vec<Diagnostic> {
    match primary_vnic(client, instance).await {
        Ok(vnic) => {
            let vnic = vnic.as_ref();
            set_string_or_empty(state, "subnet_id", vnic.map(|v| v.subnet_id.as_str()));
            set_string_or_empty(state, "private_ip", vnic.and_then(|v| v.private_ip.as_deref()));
            set_string_or_empty(state, "public_ip", vnic.and_then(|v| v.public_ip.as_deref()));
            set_string_or_empty(
                state,
                "hostname_label",
                vnic.and_then(|v| v.hostname_label.as_deref()),
            );
            vec![]
        }
        Err(e) => {
            tracing::warn!("Could not resolve VNIC of {}: {}", instance.id, e);
            vec![Diagnostic::warning(
                "Could not resolve primary VNIC",
                format!("API error: {}", e),
            )]
        }
    }
}

async fn primary_vnic(client: &Client, instance: &Instance) -> Result<Option<Vnic>, ApiError> {
    let attachments = client
        .core()
        .vnic_attachments()
        .list_by_instance(&instance.compartment_id, &instance.id)
        .await?;

    let vnics = client.core().vnics();
    let fetches = attachments
        .iter()
        .filter(|a| a.lifecycle_state == VnicAttachmentLifecycleState::Attached)
        .filter_map(|a| a.vnic_id.as_deref())
        .map(|vnic_id| vnics.get(vnic_id));
    let attached = futures::future::try_join_all(fetches).await?;

    let primary = attached
        .iter()
        .position(|v| v.is_primary == Some(true))
        .unwrap_or(0);
    Ok(attached.into_iter().nth(primary))
}

#[async_trait]
impl Resource for InstanceResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let config = &request.config;
        let mut diagnostics = validate_config(&Self::schema().block, config);

        let top_level = config.get(&AttributePath::new("subnet_id"));
        let in_vnic = config.get(&AttributePath::new("create_vnic_details").index(0));
        let unset = |v: Option<&Dynamic>| v.map_or(true, Dynamic::is_null);
        if unset(top_level) && unset(in_vnic) {
            diagnostics.push(
                Diagnostic::error(
                    "Missing subnet",
                    "One of subnet_id or create_vnic_details.subnet_id must be set",
                )
                .with_attribute(AttributePath::new("subnet_id")),
            );
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result = self.launch(&ctx, &request).await;
        create_response(&request.planned_state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let provider = match self.provider() {
            Ok(p) => p,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                    deferred: None,
                };
            }
        };

        let Ok(id) = state_id(&request.current_state) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            };
        };

        match provider.client.core().instances().get(&id).await {
            Ok(instance) if instance.lifecycle_state == InstanceLifecycleState::Terminated => {
                tracing::info!("Instance {} is terminated, removing from state", id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                }
            }
            Ok(instance) => {
                let mut new_state = request.current_state.clone();
                instance_to_state(&instance, &mut new_state);
                let diagnostics =
                    apply_primary_vnic(&provider.client, &instance, &mut new_state).await;
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) if e.is_not_found() => ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![Diagnostic::error(
                    "Failed to read instance",
                    format!("API error: {}", e),
                )],
                private: request.private,
                deferred: None,
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = async {
            let provider = self.provider()?;
            let id = state_id(&request.prior_state)?;
            let config = &request.config;

            let details = UpdateInstanceDetails {
                display_name: config.get_optional_string(&AttributePath::new("display_name")),
                metadata: config.get_string_map(&AttributePath::new("metadata")),
                extended_metadata: config
                    .get_string_map(&AttributePath::new("extended_metadata"))
                    .map(|m| strings_to_json_map(&m)),
            };

            let instance = provider
                .client
                .core()
                .instances()
                .update(&id, &details)
                .await
                .map_err(|e| {
                    Diagnostic::error("Failed to update instance", format!("API error: {}", e))
                })?;

            let mut new_state = request.planned_state.clone();
            instance_to_state(&instance, &mut new_state);
            for name in ["subnet_id", "private_ip", "public_ip", "hostname_label"] {
                if let Some(prior) = request.prior_state.get_optional_string(&AttributePath::new(name)) {
                    let _ = new_state.set_string(&AttributePath::new(name), prior);
                }
            }
            Ok::<_, Diagnostic>(new_state)
        }
        .await;

        match result {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = async {
            let provider = self.provider()?;
            let id = state_id(&request.prior_state)?;
            let timeouts = ResourceTimeouts::from_config(&request.prior_state)?;
            let instances = provider.client.core().instances();

            match instances.terminate(&id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => {
                    return Err(Diagnostic::error(
                        "Failed to terminate instance",
                        format!("API error: {}", e),
                    ))
                }
            }

            let wait = StateWait::new(
                vec![InstanceLifecycleState::Terminated],
                vec![
                    InstanceLifecycleState::Running,
                    InstanceLifecycleState::Stopping,
                    InstanceLifecycleState::Stopped,
                    InstanceLifecycleState::Starting,
                    InstanceLifecycleState::Provisioning,
                    InstanceLifecycleState::CreatingImage,
                    InstanceLifecycleState::Terminating,
                ],
                timeouts.delete,
            )
            .poll_interval(provider.poll_interval)
            .not_found_is_target();

            wait_for_state(&ctx, &id, &wait, || instances.get(&id), |i: &Instance| {
                i.lifecycle_state
            })
            .await
            .map(|_| ())
            .map_err(|e| Diagnostic::error("Failed waiting for instance termination", e.to_string()))
        }
        .await;

        DeleteResourceResponse {
            diagnostics: result.err().into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for InstanceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        configure_provider_data(&mut self.provider_data, request)
    }
}

#[async_trait]
impl ResourceWithImportState for InstanceResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Mock, Server, ServerGuard};
    use std::sync::Arc;
    use std::time::Duration;

    const INSTANCE_ID: &str = "ocid1.instance.oc1.phx.iiii";
    const SUBNET_ID: &str = "ocid1.subnet.oc1.phx.ssss";

    fn instance_json(state: &str) -> String {
        format!(
            r#"{{
            "id": "{}",
            "availabilityDomain": "Uocm:PHX-AD-1",
            "compartmentId": "ocid1.compartment.oc1..cccc",
            "displayName": "web",
            "shape": "VM.Standard1.1",
            "imageId": "ocid1.image.oc1.phx.mmmm",
            "region": "phx",
            "lifecycleState": "{}",
            "metadata": {{"ssh_authorized_keys": "ssh-rsa AAAA"}},
            "extendedMetadata": {{"nested": {{"a": 1}}}},
            "timeCreated": "2018-01-11T18:10:00.5Z"
        }}"#,
            INSTANCE_ID, state
        )
    }

    async fn mock_vnics(server: &mut ServerGuard) -> Vec<Mock> {
        let attachments = server
            .mock("GET", "/20160918/vnicAttachments")
            .match_query(Matcher::UrlEncoded("instanceId".into(), INSTANCE_ID.into()))
            .with_body(format!(
                r#"[
                {{"id":"a1","instanceId":"{0}","availabilityDomain":"Uocm:PHX-AD-1","compartmentId":"c","vnicId":"v-secondary","lifecycleState":"ATTACHED"}},
                {{"id":"a2","instanceId":"{0}","availabilityDomain":"Uocm:PHX-AD-1","compartmentId":"c","vnicId":"v-primary","lifecycleState":"ATTACHED"}},
                {{"id":"a3","instanceId":"{0}","availabilityDomain":"Uocm:PHX-AD-1","compartmentId":"c","lifecycleState":"ATTACHING"}}
            ]"#,
                INSTANCE_ID
            ))
            .create_async()
            .await;
        let secondary = server
            .mock("GET", "/20160918/vnics/v-secondary")
            .with_body(r#"{"id":"v-secondary","subnetId":"other","privateIp":"10.0.2.5","isPrimary":false}"#)
            .create_async()
            .await;
        let primary = server
            .mock("GET", "/20160918/vnics/v-primary")
            .with_body(format!(
                r#"{{"id":"v-primary","subnetId":"{}","privateIp":"10.0.1.2","publicIp":"129.146.0.1","hostnameLabel":"web","isPrimary":true}}"#,
                SUBNET_ID
            ))
            .create_async()
            .await;
        vec![attachments, secondary, primary]
    }

    async fn configured(url: &str) -> InstanceResource {
        let mut resource = InstanceResource::new();
        let data = OciProviderData::new(create_test_client(url))
            .with_poll_interval(Duration::from_millis(1));
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(data)),
                },
            )
            .await;
        resource
    }

    fn config() -> DynamicValue {
        let mut config = DynamicValue::object();
        for (k, v) in [
            ("availability_domain", "Uocm:PHX-AD-1"),
            ("compartment_id", "ocid1.compartment.oc1..cccc"),
            ("display_name", "web"),
            ("subnet_id", SUBNET_ID),
            ("image", "ocid1.image.oc1.phx.mmmm"),
            ("shape", "VM.Standard1.1"),
        ] {
            config
                .set_string(&AttributePath::new(k), v.to_string())
                .unwrap();
        }
        config
            .set_string_map(
                &AttributePath::new("metadata"),
                &HashMap::from([("ssh_authorized_keys".to_string(), "ssh-rsa AAAA".to_string())]),
            )
            .unwrap();
        config
            .set_string_map(
                &AttributePath::new("timeouts"),
                &HashMap::from([("create".to_string(), "15m".to_string())]),
            )
            .unwrap();
        config
    }

    #[tokio::test]
    async fn launch_waits_for_running_and_resolves_primary_vnic() {
        let mut server = Server::new_async().await;
        let launch = server
            .mock("POST", "/20160918/instances")
            .match_header("opc-retry-token", Matcher::Any)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "imageId": "ocid1.image.oc1.phx.mmmm",
                "subnetId": SUBNET_ID,
                "metadata": {"ssh_authorized_keys": "ssh-rsa AAAA"}
            })))
            .with_body(instance_json("PROVISIONING"))
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("/20160918/instances/{}", INSTANCE_ID).as_str())
            .with_body(instance_json("RUNNING"))
            .create_async()
            .await;
        let _vnics = mock_vnics(&mut server).await;

        let resource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest::from_config(TYPE_NAME, config()),
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        let get = |k: &str| state.get_string(&AttributePath::new(k)).unwrap();
        assert_eq!(get("id"), INSTANCE_ID);
        assert_eq!(get("state"), "RUNNING");
        assert_eq!(get("image"), "ocid1.image.oc1.phx.mmmm");
        assert_eq!(get("region"), "phx");
        assert_eq!(get("private_ip"), "10.0.1.2");
        assert_eq!(get("public_ip"), "129.146.0.1");
        assert_eq!(get("hostname_label"), "web");
        assert_eq!(get("subnet_id"), SUBNET_ID);
        assert_eq!(get("ipxe_script"), "");
        assert_eq!(get("time_created"), "2018-01-11 18:10:00.5 +0000 UTC");
        assert_eq!(
            state
                .get_string(&AttributePath::new("extended_metadata").key("nested"))
                .unwrap(),
            r#"{"a":1}"#
        );
        launch.assert_async().await;
    }

    #[tokio::test]
    async fn failed_wait_still_records_launched_instance() {
        let mut server = Server::new_async().await;
        let _launch = server
            .mock("POST", "/20160918/instances")
            .with_body(instance_json("PROVISIONING"))
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("/20160918/instances/{}", INSTANCE_ID).as_str())
            .with_body(instance_json("STOPPED"))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let mut planned = config();
        for name in ["id", "private_ip", "public_ip"] {
            planned
                .set_value(&AttributePath::new(name), Dynamic::Unknown)
                .unwrap();
        }
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    planned_state: planned,
                    ..CreateResourceRequest::from_config(TYPE_NAME, config())
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Failed waiting for instance");
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), INSTANCE_ID);
        assert_eq!(
            state.get_string(&AttributePath::new("state")).unwrap(),
            "PROVISIONING"
        );
        assert!(state
            .get(&AttributePath::new("private_ip"))
            .unwrap()
            .is_null());
    }

    #[tokio::test]
    async fn read_removes_terminated_instance() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", format!("/20160918/instances/{}", INSTANCE_ID).as_str())
            .with_body(instance_json("TERMINATED"))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let mut state = DynamicValue::object();
        state
            .set_string(&AttributePath::new("id"), INSTANCE_ID.to_string())
            .unwrap();

        let response = resource
            .read(Context::new(), ReadResourceRequest::new(TYPE_NAME, state))
            .await;
        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn read_after_import_fills_everything() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", format!("/20160918/instances/{}", INSTANCE_ID).as_str())
            .with_body(instance_json("RUNNING"))
            .create_async()
            .await;
        let _vnics = mock_vnics(&mut server).await;

        let resource = configured(&server.url()).await;
        let imported = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest::new(TYPE_NAME, INSTANCE_ID),
            )
            .await;
        let state = imported.imported_resources[0].state.clone();

        let response = resource
            .read(Context::new(), ReadResourceRequest::new(TYPE_NAME, state))
            .await;
        let state = response.new_state.unwrap();
        assert_eq!(
            state.get_string(&AttributePath::new("shape")).unwrap(),
            "VM.Standard1.1"
        );
        assert_eq!(
            state
                .get_string(&AttributePath::new("metadata").key("ssh_authorized_keys"))
                .unwrap(),
            "ssh-rsa AAAA"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("private_ip")).unwrap(),
            "10.0.1.2"
        );
    }

    #[tokio::test]
    async fn update_keeps_vnic_fields() {
        let mut server = Server::new_async().await;
        let update = server
            .mock("PUT", format!("/20160918/instances/{}", INSTANCE_ID).as_str())
            .match_body(Matcher::PartialJson(serde_json::json!({"displayName": "renamed"})))
            .with_body(instance_json("RUNNING").replace("\"web\"", "\"renamed\""))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let mut prior = config();
        prior
            .set_string(&AttributePath::new("id"), INSTANCE_ID.to_string())
            .unwrap();
        prior
            .set_string(&AttributePath::new("private_ip"), "10.0.1.2".to_string())
            .unwrap();
        let mut planned = prior.clone();
        planned
            .set_string(&AttributePath::new("display_name"), "renamed".to_string())
            .unwrap();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let get = |k: &str| response.new_state.get_string(&AttributePath::new(k)).unwrap();
        assert_eq!(get("display_name"), "renamed");
        assert_eq!(get("private_ip"), "10.0.1.2");
        update.assert_async().await;
    }

    #[tokio::test]
    async fn delete_waits_for_terminated() {
        let mut server = Server::new_async().await;
        let terminate = server
            .mock("DELETE", format!("/20160918/instances/{}", INSTANCE_ID).as_str())
            .with_status(204)
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("/20160918/instances/{}", INSTANCE_ID).as_str())
            .with_body(instance_json("TERMINATED"))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let mut state = config();
        state
            .set_string(&AttributePath::new("id"), INSTANCE_ID.to_string())
            .unwrap();

        let response = resource
            .delete(Context::new(), DeleteResourceRequest::new(TYPE_NAME, state))
            .await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        terminate.assert_async().await;
    }

    #[tokio::test]
    async fn validate_requires_a_subnet() {
        let resource = InstanceResource::new();
        let mut config = config();
        config.set_null(&AttributePath::new("subnet_id")).unwrap();

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config,
                    client_capabilities: Default::default(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Missing subnet");
    }

    #[test]
    fn vnic_details_read_from_block() {
        let mut config = config();
        config
            .set_list(
                &AttributePath::new("create_vnic_details"),
                vec![Dynamic::Map(HashMap::from([
                    ("subnet_id".to_string(), Dynamic::from(SUBNET_ID)),
                    ("assign_public_ip".to_string(), Dynamic::Bool(false)),
                    ("private_ip".to_string(), Dynamic::Null),
                ]))],
            )
            .unwrap();

        let details = vnic_details_from_config(&config).unwrap();
        assert_eq!(details.subnet_id, SUBNET_ID);
        assert_eq!(details.assign_public_ip, Some(false));
        assert!(details.private_ip.is_none());
        assert!(vnic_details_from_config(&DynamicValue::object()).is_none());
    }
}
