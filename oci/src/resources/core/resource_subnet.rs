use crate::api::core::subnets::{
    CreateSubnetDetails, Subnet, SubnetLifecycleState, UpdateSubnetDetails,
};
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
use tfplug::schema::{validate_config, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringPatternValidator;

pub const TYPE_NAME: &str = "oci_core_subnet";

#[derive(Default)]
pub struct SubnetResource {
    provider_data: Option<OciProviderData>,
}

impl SubnetResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema() -> Schema {
        let ocid = |name: &str, desc: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(desc)
                .required()
                .validator(StringPatternValidator::ocid())
                .build()
        };
        let optional = |name: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .optional()
                .computed()
                .build()
        };
        let computed = |name: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .computed()
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Manages a subnet in a VCN")
            .attribute(computed("id"))
            .attribute(
                AttributeBuilder::new("availability_domain", AttributeType::String)
                    .description("The availability domain of the subnet")
                    .required()
                    .build(),
            )
            .attribute(ocid("compartment_id", "The OCID of the compartment"))
            .attribute(ocid("vcn_id", "The OCID of the VCN"))
            .attribute(
                AttributeBuilder::new("cidr_block", AttributeType::String)
                    .description("The CIDR block of the subnet, e.g. 10.0.1.0/24")
                    .required()
                    .validator(StringPatternValidator::ipv4_cidr())
                    .build(),
            )
            .attribute(optional("display_name"))
            .attribute(optional("dhcp_options_id"))
            .attribute(optional("route_table_id"))
            .attribute(
                AttributeBuilder::new(
                    "security_list_ids",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("OCIDs of the security lists for the subnet")
                .optional()
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("dns_label", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("prohibit_public_ip_on_vnic", AttributeType::Bool)
                    .description("Disallow public IPs on VNICs in this subnet")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(computed("state"))
            .attribute(computed("time_created"))
            .attribute(computed("virtual_router_ip"))
            .attribute(computed("virtual_router_mac"))
            .block(timeouts_block())
            .build()
    }

    fn provider(&self) -> Result<&OciProviderData, Diagnostic> {
        self.provider_data.as_ref().ok_or_else(provider_not_configured)
    }

    async fn create_subnet(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
    ) -> Result<DynamicValue, CreateFailure> {
        let provider = self.provider()?;
        let config = &request.config;
        let timeouts = ResourceTimeouts::from_config(config)?;
        let optional = |name: &str| config.get_optional_string(&AttributePath::new(name));

        let details = CreateSubnetDetails {
            availability_domain: required_string(config, "availability_domain")?,
            compartment_id: required_string(config, "compartment_id")?,
            vcn_id: required_string(config, "vcn_id")?,
            cidr_block: required_string(config, "cidr_block")?,
            display_name: optional("display_name"),
            dhcp_options_id: optional("dhcp_options_id"),
            route_table_id: optional("route_table_id"),
            security_list_ids: config.get_string_list(&AttributePath::new("security_list_ids")),
            dns_label: optional("dns_label"),
            prohibit_public_ip_on_vnic: config
                .get_bool(&AttributePath::new("prohibit_public_ip_on_vnic"))
                .ok(),
        };

        let subnets = provider.client.core().subnets();
        let created = subnets.create(&details).await.map_err(|e| {
            Diagnostic::error("Failed to create subnet", format!("API error: {}", e))
        })?;
        tracing::info!("Created subnet {}", created.id);

        let mut state = request.planned_state.clone();
        subnet_to_state(&created, &mut state);

        let wait = StateWait::new(
            vec![SubnetLifecycleState::Available],
            vec![SubnetLifecycleState::Provisioning],
            timeouts.create,
        )
        .poll_interval(provider.poll_interval);

        let id = created.id.as_str();
        let subnet = wait_for_state(ctx, id, &wait, || subnets.get(id), |s: &Subnet| {
            s.lifecycle_state
        })
        .await
        .map_err(|e| Diagnostic::error("Failed waiting for subnet", e.to_string()))
        .and_then(|found| {
            found.ok_or_else(|| {
                Diagnostic::error("Subnet disappeared", format!("{} was deleted", id))
            })
        })
        .map_err(|diag| CreateFailure::after_create(state.clone(), diag))?;

        subnet_to_state(&subnet, &mut state);
        Ok(state)
    }
}

fn subnet_to_state(subnet: &Subnet, state: &mut DynamicValue) {
    set_string_or_empty(state, "id", Some(&subnet.id));
    set_string_or_empty(state, "availability_domain", Some(&subnet.availability_domain));
    set_string_or_empty(state, "compartment_id", Some(&subnet.compartment_id));
    set_string_or_empty(state, "vcn_id", Some(&subnet.vcn_id));
    set_string_or_empty(state, "cidr_block", Some(&subnet.cidr_block));
    set_string_or_empty(state, "display_name", subnet.display_name.as_deref());
    set_string_or_empty(state, "dhcp_options_id", subnet.dhcp_options_id.as_deref());
    set_string_or_empty(state, "route_table_id", subnet.route_table_id.as_deref());
    let _ = state.set_list(
        &AttributePath::new("security_list_ids"),
        subnet
            .security_list_ids
            .iter()
            .map(|id| Dynamic::String(id.clone()))
            .collect(),
    );
    if let Some(dns_label) = &subnet.dns_label {
        let _ = state.set_string(&AttributePath::new("dns_label"), dns_label.clone());
    }
    let _ = state.set_bool(
        &AttributePath::new("prohibit_public_ip_on_vnic"),
        subnet.prohibit_public_ip_on_vnic.unwrap_or(false),
    );
    set_string_or_empty(state, "state", Some(subnet.lifecycle_state.as_str()));
    let _ = state.set_string(
        &AttributePath::new("time_created"),
        format_time(subnet.time_created),
    );
    set_string_or_empty(state, "virtual_router_ip", subnet.virtual_router_ip.as_deref());
    set_string_or_empty(state, "virtual_router_mac", subnet.virtual_router_mac.as_deref());
}

#[async_trait]
impl Resource for SubnetResource {
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
        let result = self.create_subnet(&ctx, &request).await;
        create_response(&request.planned_state, result.map(|state| (state, vec![])))
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

        let (new_state, diagnostics) = match provider.client.core().subnets().get(&id).await {
            Ok(subnet) if subnet.lifecycle_state == SubnetLifecycleState::Terminated => {
                (None, vec![])
            }
            Ok(subnet) => {
                let mut state = request.current_state.clone();
                subnet_to_state(&subnet, &mut state);
                (Some(state), vec![])
            }
            Err(e) if e.is_not_found() => (None, vec![]),
            Err(e) => (
                Some(request.current_state),
                vec![Diagnostic::error(
                    "Failed to read subnet",
                    format!("API error: {}", e),
                )],
            ),
        };

        ReadResourceResponse {
            new_state,
            diagnostics,
            private: request.private,
            deferred: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = async {
            let provider = self.provider()?;
            let id = state_id(&request.prior_state)?;
            let details = UpdateSubnetDetails {
                display_name: request
                    .config
                    .get_optional_string(&AttributePath::new("display_name")),
            };
            let subnet = provider
                .client
                .core()
                .subnets()
                .update(&id, &details)
                .await
                .map_err(|e| {
                    Diagnostic::error("Failed to update subnet", format!("API error: {}", e))
                })?;

            let mut new_state = request.planned_state.clone();
            subnet_to_state(&subnet, &mut new_state);
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
            let subnets = provider.client.core().subnets();

            match subnets.delete(&id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => {
                    return Err(Diagnostic::error(
                        "Failed to delete subnet",
                        format!("API error: {}", e),
                    ))
                }
            }

            let wait = StateWait::new(
                vec![SubnetLifecycleState::Terminated],
                vec![
                    SubnetLifecycleState::Available,
                    SubnetLifecycleState::Terminating,
                ],
                timeouts.delete,
            )
            .poll_interval(provider.poll_interval)
            .not_found_is_target();

            wait_for_state(&ctx, &id, &wait, || subnets.get(&id), |s: &Subnet| {
                s.lifecycle_state
            })
            .await
            .map(|_| ())
            .map_err(|e| Diagnostic::error("Failed waiting for subnet deletion", e.to_string()))
        }
        .await;

        DeleteResourceResponse {
            diagnostics: result.err().into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for SubnetResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        configure_provider_data(&mut self.provider_data, request)
    }
}

#[async_trait]
impl ResourceWithImportState for SubnetResource {
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
