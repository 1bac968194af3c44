//! Virtual cloud network resource

use crate::api::core::vcns::{CreateVcnDetails, UpdateVcnDetails, Vcn, VcnLifecycleState};
use crate::provider_data::OciProviderData;
use crate::resources::{
    configure_provider_data, create_response, format_time, provider_not_configured,
    required_string, set_string_or_empty, state_id, CreateFailure,
};
use crate::timeouts::{timeouts_block, ResourceTimeouts};
use crate::waiter::{wait_for_state, StateWait};
use async_trait::async_trait;
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
use tfplug::schema::{validate_config, AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringPatternValidator;

pub const TYPE_NAME: &str = "oci_core_virtual_network";

#[derive(Default)]
pub struct VirtualNetworkResource {
    provider_data: Option<OciProviderData>,
}

impl VirtualNetworkResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema() -> tfplug::schema::Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a virtual cloud network (VCN)")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The OCID of the VCN")
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
                AttributeBuilder::new("cidr_block", AttributeType::String)
                    .description("The CIDR block of the VCN, e.g. 10.0.0.0/16")
                    .required()
                    .validator(StringPatternValidator::ipv4_cidr())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("A user-friendly name")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dns_label", AttributeType::String)
                    .description("DNS label for hostnames in the VCN")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("The VCN's lifecycle state")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("time_created", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("default_dhcp_options_id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("default_route_table_id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("default_security_list_id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vcn_domain_name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .block(timeouts_block())
            .build()
    }

    fn provider(&self) -> Result<&OciProviderData, Diagnostic> {
        self.provider_data.as_ref().ok_or_else(provider_not_configured)
    }

    fn pending_states() -> Vec<VcnLifecycleState> {
        vec![VcnLifecycleState::Provisioning]
    }

    async fn wait_available(
        &self,
        ctx: &Context,
        provider: &OciProviderData,
        id: &str,
        timeouts: &ResourceTimeouts,
    ) -> Result<Vcn, Diagnostic> {
        let wait = StateWait::new(
            vec![VcnLifecycleState::Available],
            Self::pending_states(),
            timeouts.create,
        )
        .poll_interval(provider.poll_interval);

        let vcns = provider.client.core().vcns();
        wait_for_state(ctx, id, &wait, || vcns.get(id), |v: &Vcn| v.lifecycle_state)
            .await
            .map_err(|e| Diagnostic::error("Failed waiting for VCN", e.to_string()))?
            .ok_or_else(|| Diagnostic::error("VCN disappeared", format!("{} was deleted", id)))
    }

    async fn create_vcn(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
    ) -> Result<DynamicValue, CreateFailure> {
        let provider = self.provider()?;
        let config = &request.config;
        let timeouts = ResourceTimeouts::from_config(config)?;

        let details = CreateVcnDetails {
            compartment_id: required_string(config, "compartment_id")?,
            cidr_block: required_string(config, "cidr_block")?,
            display_name: config.get_optional_string(&AttributePath::new("display_name")),
            dns_label: config.get_optional_string(&AttributePath::new("dns_label")),
        };

        let created = provider
            .client
            .core()
            .vcns()
            .create(&details)
            .await
            .map_err(|e| Diagnostic::error("Failed to create VCN", format!("API error: {}", e)))?;
        tracing::info!("Created VCN {}", created.id);

        let mut state = request.planned_state.clone();
        vcn_to_state(&created, &mut state);

        let vcn = self
            .wait_available(ctx, provider, &created.id, &timeouts)
            .await
            .map_err(|diag| CreateFailure::after_create(state.clone(), diag))?;

        vcn_to_state(&vcn, &mut state);
        Ok(state)
    }
}

pub(crate) fn vcn_to_state(vcn: &Vcn, state: &mut DynamicValue) {
    set_string_or_empty(state, "id", Some(&vcn.id));
    set_string_or_empty(state, "compartment_id", Some(&vcn.compartment_id));
    set_string_or_empty(state, "cidr_block", Some(&vcn.cidr_block));
    set_string_or_empty(state, "display_name", vcn.display_name.as_deref());
    if let Some(dns_label) = &vcn.dns_label {
        let _ = state.set_string(&AttributePath::new("dns_label"), dns_label.clone());
    }
    set_string_or_empty(state, "state", Some(vcn.lifecycle_state.as_str()));
    let _ = state.set_string(
        &AttributePath::new("time_created"),
        format_time(vcn.time_created),
    );
    set_string_or_empty(
        state,
        "default_dhcp_options_id",
        vcn.default_dhcp_options_id.as_deref(),
    );
    set_string_or_empty(
        state,
        "default_route_table_id",
        vcn.default_route_table_id.as_deref(),
    );
    set_string_or_empty(
        state,
        "default_security_list_id",
        vcn.default_security_list_id.as_deref(),
    );
    set_string_or_empty(state, "vcn_domain_name", vcn.vcn_domain_name.as_deref());
}

#[async_trait]
impl Resource for VirtualNetworkResource {
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
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&Self::schema().block, &request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result = self.create_vcn(&ctx, &request).await;
        create_response(&request.planned_state, result.map(|state| (state, vec![])))
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let provider = match self.provider() {
            Ok(p) => p,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                };
            }
        };

        let id = match state_id(&request.current_state) {
            Ok(id) => id,
            Err(_) => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                };
            }
        };

        match provider.client.core().vcns().get(&id).await {
            Ok(vcn) if vcn.lifecycle_state == VcnLifecycleState::Terminated => {
                tracing::info!("VCN {} is terminated, removing from state", id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
            Ok(vcn) => {
                let mut new_state = request.current_state.clone();
                vcn_to_state(&vcn, &mut new_state);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) if e.is_not_found() => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
                deferred: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read VCN",
                    format!("API error: {}", e),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = async {
            let provider = self.provider()?;
            let id = state_id(&request.prior_state)?;
            let details = UpdateVcnDetails {
                display_name: request
                    .config
                    .get_optional_string(&AttributePath::new("display_name")),
            };
            let vcn = provider
                .client
                .core()
                .vcns()
                .update(&id, &details)
                .await
                .map_err(|e| Diagnostic::error("Failed to update VCN", format!("API error: {}", e)))?;

            let mut new_state = request.planned_state.clone();
            vcn_to_state(&vcn, &mut new_state);
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
            let vcns = provider.client.core().vcns();

            match vcns.delete(&id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => {
                    return Err(Diagnostic::error(
                        "Failed to delete VCN",
                        format!("API error: {}", e),
                    ))
                }
            }

            let wait = StateWait::new(
                vec![VcnLifecycleState::Terminated],
                vec![VcnLifecycleState::Available, VcnLifecycleState::Terminating],
                timeouts.delete,
            )
            .poll_interval(provider.poll_interval)
            .not_found_is_target();

            wait_for_state(&ctx, &id, &wait, || vcns.get(&id), |v: &Vcn| v.lifecycle_state)
                .await
                .map(|_| ())
                .map_err(|e| Diagnostic::error("Failed waiting for VCN deletion", e.to_string()))
        }
        .await;

        DeleteResourceResponse {
            diagnostics: result.err().into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for VirtualNetworkResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        configure_provider_data(&mut self.provider_data, request)
    }
}

#[async_trait]
impl ResourceWithImportState for VirtualNetworkResource {
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
