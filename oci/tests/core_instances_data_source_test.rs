//! `oci_core_instances` against a faked OCI API.
//!
//! Provisions a VCN, a subnet and an instance named with a random token,
//! then lists instances by display name and id filter, queries by lifecycle
//! state, verifies import of the instance and finally destroys everything.

use mockito::{Matcher, Mock, Server, ServerGuard};
use oci::OciProvider;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, DataSource, DataSourceWithConfigure, ReadDataSourceRequest,
    ValidateDataSourceConfigRequest,
};
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, Resource, ResourceWithConfigure,
    ResourceWithImportState, ValidateResourceConfigRequest,
};
use tfplug::testing::{
    check_no_resource_attr, check_resource_attr, check_resource_attr_set, compose_checks,
    random_token, verify_import_state, TestState,
};
use tfplug::types::{has_errors, AttributePath, Dynamic, DynamicValue};

const COMPARTMENT: &str = "ocid1.compartment.oc1..aaaaaaaacomp";
const AD: &str = "Uocm:PHX-AD-1";
const VCN_ID: &str = "ocid1.vcn.oc1.phx.aaaaaaaavcn";
const SUBNET_ID: &str = "ocid1.subnet.oc1.phx.aaaaaaaasubnet";
const INSTANCE_ID: &str = "ocid1.instance.oc1.phx.aaaaaaaainstance";
const OTHER_INSTANCE_ID: &str = "ocid1.instance.oc1.phx.aaaaaaaaother";
const IMAGE_ID: &str = "ocid1.image.oc1.phx.aaaaaaaasc56hnpnx7swoyd2fw5gyvbn3kcdmqc2guiiuvnztl2erth62xnq";
const SSH_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC test@example";

const DATA_T: &str = "data.oci_core_instances.t";
const DATA_T2: &str = "data.oci_core_instances.t2";

struct Harness {
    provider: OciProvider,
    provider_data: Arc<dyn Any + Send + Sync>,
    state: TestState,
}

impl Harness {
    async fn new(endpoint: &str) -> Self {
        tfplug::init_logging(tfplug::LogLevel::from_env());
        let mut provider = OciProvider::new().with_poll_interval(Duration::from_millis(1));

        let mut config = DynamicValue::object();
        for (name, value) in [
            ("region", "us-phoenix-1"),
            ("endpoint", endpoint),
            ("security_token", "test-token"),
        ] {
            config
                .set_string(&AttributePath::new(name), value.to_string())
                .unwrap();
        }
        config
            .set_number(&AttributePath::new("retry_max_attempts"), 1.0)
            .unwrap();

        let response = provider
            .configure(Context::new(), ConfigureProviderRequest::new(config))
            .await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);

        Self {
            provider,
            provider_data: response.provider_data.unwrap(),
            state: TestState::new(),
        }
    }

    async fn apply_resource(&mut self, type_name: &str, name: &str, config: DynamicValue) -> DynamicValue {
        let factories = self.provider.resources();
        let mut resource = factories[type_name]();
        let configured = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(self.provider_data.clone()),
                },
            )
            .await;
        assert!(configured.diagnostics.is_empty());

        let validated = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: type_name.to_string(),
                    config: config.clone(),
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert!(
            validated.diagnostics.is_empty(),
            "{}: {:?}",
            type_name,
            validated.diagnostics
        );

        let created = resource
            .create(
                Context::new(),
                CreateResourceRequest::from_config(type_name, config),
            )
            .await;
        assert!(
            !has_errors(&created.diagnostics),
            "{}: {:?}",
            type_name,
            created.diagnostics
        );

        self.state
            .insert(&format!("{}.{}", type_name, name), created.new_state.clone());
        created.new_state
    }

    async fn read_data_source(&mut self, type_name: &str, name: &str, config: DynamicValue) {
        let factories = self.provider.data_sources();
        let mut data_source = factories[type_name]();
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(self.provider_data.clone()),
                },
            )
            .await;

        let validated = data_source
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: type_name.to_string(),
                    config: config.clone(),
                },
            )
            .await;
        assert!(
            validated.diagnostics.is_empty(),
            "{}: {:?}",
            type_name,
            validated.diagnostics
        );

        let read = data_source
            .read(Context::new(), ReadDataSourceRequest::new(type_name, config))
            .await;
        assert!(read.diagnostics.is_empty(), "{}: {:?}", type_name, read.diagnostics);

        self.state
            .insert(&format!("data.{}.{}", type_name, name), read.state);
    }

    /// Imports `id` and refreshes it, as `terraform import` would
    async fn import_resource(&self, type_name: &str, id: &str) -> Option<DynamicValue> {
        let factories = self.provider.resources();
        let mut resource = factories[type_name]();
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(self.provider_data.clone()),
                },
            )
            .await;

        let imported = resource
            .import_state(Context::new(), ImportResourceStateRequest::new(type_name, id))
            .await;
        assert!(imported.diagnostics.is_empty());
        let state = imported.imported_resources.into_iter().next()?.state;

        resource
            .read(Context::new(), ReadResourceRequest::new(type_name, state))
            .await
            .new_state
    }

    async fn destroy_resource(&mut self, type_name: &str, name: &str) {
        let address = format!("{}.{}", type_name, name);
        let prior = self.state.remove(&address).unwrap();

        let factories = self.provider.resources();
        let mut resource = factories[type_name]();
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(self.provider_data.clone()),
                },
            )
            .await;

        let deleted = resource
            .delete(Context::new(), DeleteResourceRequest::new(type_name, prior))
            .await;
        assert!(deleted.diagnostics.is_empty(), "{}: {:?}", address, deleted.diagnostics);
    }
}

fn object(entries: &[(&str, Dynamic)]) -> DynamicValue {
    DynamicValue::new(Dynamic::Map(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    ))
}

fn id_filter(id: &str) -> Dynamic {
    Dynamic::List(vec![Dynamic::Map(HashMap::from([
        ("name".to_string(), Dynamic::from("id")),
        ("values".to_string(), Dynamic::List(vec![Dynamic::from(id)])),
    ]))])
}

fn instances_config(token: &str, state: Option<&str>) -> DynamicValue {
    let mut config = object(&[
        ("compartment_id", Dynamic::from(COMPARTMENT)),
        ("availability_domain", Dynamic::from(AD)),
        ("display_name", Dynamic::from(token)),
        ("filter", id_filter(INSTANCE_ID)),
    ]);
    if let Some(state) = state {
        config
            .set_string(&AttributePath::new("state"), state.to_string())
            .unwrap();
    }
    config
}

fn vcn_json(state: &str) -> String {
    format!(
        r#"{{
        "id": "{VCN_ID}",
        "compartmentId": "{COMPARTMENT}",
        "cidrBlock": "10.0.0.0/16",
        "displayName": "-tf-vcn",
        "lifecycleState": "{state}",
        "defaultDhcpOptionsId": "ocid1.dhcpoptions.oc1.phx.aaaaaaaadhcp",
        "defaultRouteTableId": "ocid1.routetable.oc1.phx.aaaaaaaaroute",
        "defaultSecurityListId": "ocid1.securitylist.oc1.phx.aaaaaaaaseclist",
        "timeCreated": "2018-01-11T18:02:03.123Z"
    }}"#
    )
}

fn subnet_json(state: &str) -> String {
    format!(
        r#"{{
        "id": "{SUBNET_ID}",
        "availabilityDomain": "{AD}",
        "compartmentId": "{COMPARTMENT}",
        "vcnId": "{VCN_ID}",
        "cidrBlock": "10.0.1.0/24",
        "displayName": "-tf-subnet",
        "dhcpOptionsId": "ocid1.dhcpoptions.oc1.phx.aaaaaaaadhcp",
        "routeTableId": "ocid1.routetable.oc1.phx.aaaaaaaaroute",
        "securityListIds": ["ocid1.securitylist.oc1.phx.aaaaaaaaseclist"],
        "lifecycleState": "{state}",
        "virtualRouterIp": "10.0.1.1",
        "virtualRouterMac": "00:00:17:B6:4D:DD",
        "timeCreated": "2018-01-11T18:04:00.000Z"
    }}"#
    )
}

fn instance_json(id: &str, display_name: &str, state: &str) -> String {
    format!(
        r#"{{
        "id": "{id}",
        "availabilityDomain": "{AD}",
        "compartmentId": "{COMPARTMENT}",
        "displayName": "{display_name}",
        "shape": "VM.Standard1.1",
        "imageId": "{IMAGE_ID}",
        "region": "phx",
        "lifecycleState": "{state}",
        "metadata": {{"ssh_authorized_keys": "{SSH_KEY}"}},
        "timeCreated": "2018-01-11T18:10:00.456Z"
    }}"#
    )
}

async fn get_mock(server: &mut ServerGuard, path: &str, status: usize, body: String) -> Mock {
    server
        .mock("GET", format!("/20160918{}", path).as_str())
        .match_header("authorization", "Bearer test-token")
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

fn list_query(token: &str, state: Option<&str>) -> Matcher {
    let mut query = format!(
        "compartmentId={}&availabilityDomain={}&displayName={}",
        urlencoding::encode(COMPARTMENT),
        urlencoding::encode(AD),
        urlencoding::encode(token)
    );
    if let Some(state) = state {
        query.push_str(&format!("&lifecycleState={}", state));
    }
    Matcher::Regex(format!("^{}$", regex::escape(&query)))
}

#[tokio::test]
async fn datasource_core_instances_basic() {
    let mut server = Server::new_async().await;
    let token = random_token();
    let not_found = r#"{"code":"NotAuthorizedOrNotFound","message":"resource not found"}"#;

    let _availability_domains = server
        .mock("GET", "/20160918/availabilityDomains")
        .match_query(Matcher::UrlEncoded("compartmentId".into(), COMPARTMENT.into()))
        .with_body(format!(
            r#"[{{"name":"{AD}","compartmentId":"{COMPARTMENT}"}},{{"name":"Uocm:PHX-AD-2","compartmentId":"{COMPARTMENT}"}}]"#
        ))
        .create_async()
        .await;

    let create_vcn = server
        .mock("POST", "/20160918/vcns")
        .match_header("opc-retry-token", Matcher::Any)
        .match_body(Matcher::PartialJson(serde_json::json!({
            "compartmentId": COMPARTMENT,
            "cidrBlock": "10.0.0.0/16",
            "displayName": "-tf-vcn"
        })))
        .with_body(vcn_json("PROVISIONING"))
        .create_async()
        .await;
    let vcn_available = get_mock(&mut server, &format!("/vcns/{}", VCN_ID), 200, vcn_json("AVAILABLE")).await;

    let create_subnet = server
        .mock("POST", "/20160918/subnets")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "vcnId": VCN_ID,
            "availabilityDomain": AD,
            "securityListIds": ["ocid1.securitylist.oc1.phx.aaaaaaaaseclist"]
        })))
        .with_body(subnet_json("PROVISIONING"))
        .create_async()
        .await;
    let subnet_available = get_mock(
        &mut server,
        &format!("/subnets/{}", SUBNET_ID),
        200,
        subnet_json("AVAILABLE"),
    ).await;

    let launch = server
        .mock("POST", "/20160918/instances")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "displayName": token,
            "subnetId": SUBNET_ID,
            "imageId": IMAGE_ID,
            "shape": "VM.Standard1.1",
            "metadata": {"ssh_authorized_keys": SSH_KEY}
        })))
        .with_body(instance_json(INSTANCE_ID, &token, "PROVISIONING"))
        .create_async()
        .await;
    let instance_running = get_mock(
        &mut server,
        &format!("/instances/{}", INSTANCE_ID),
        200,
        instance_json(INSTANCE_ID, &token, "RUNNING"),
    ).await;

    let _vnic_attachments = server
        .mock("GET", "/20160918/vnicAttachments")
        .match_query(Matcher::UrlEncoded("instanceId".into(), INSTANCE_ID.into()))
        .with_body(format!(
            r#"[{{"id":"ocid1.vnicattachment.oc1.phx.aaaa","instanceId":"{INSTANCE_ID}","availabilityDomain":"{AD}","compartmentId":"{COMPARTMENT}","subnetId":"{SUBNET_ID}","vnicId":"ocid1.vnic.oc1.phx.aaaa","lifecycleState":"ATTACHED"}}]"#
        ))
        .create_async()
        .await;
    let _vnic = get_mock(
        &mut server,
        "/vnics/ocid1.vnic.oc1.phx.aaaa",
        200,
        format!(
            r#"{{"id":"ocid1.vnic.oc1.phx.aaaa","subnetId":"{SUBNET_ID}","privateIp":"10.0.1.2","publicIp":"129.146.10.20","hostnameLabel":"{token}","isPrimary":true}}"#
        ),
    ).await;

    let listing = format!(
        "[{}, {}]",
        instance_json(INSTANCE_ID, &token, "RUNNING"),
        instance_json(OTHER_INSTANCE_ID, &token, "RUNNING")
    );
    let _list = server
        .mock("GET", "/20160918/instances")
        .match_query(list_query(&token, None))
        .with_body(listing.clone())
        .create_async()
        .await;
    let _list_running = server
        .mock("GET", "/20160918/instances")
        .match_query(list_query(&token, Some("RUNNING")))
        .with_body(listing)
        .create_async()
        .await;
    let _list_terminated = server
        .mock("GET", "/20160918/instances")
        .match_query(list_query(&token, Some("TERMINATED")))
        .with_body("[]")
        .create_async()
        .await;

    let mut harness = Harness::new(&server.url()).await;

    // Fixture: availability domains, VCN, subnet, instance
    harness
        .read_data_source(
            "oci_identity_availability_domains",
            "ADs",
            object(&[("compartment_id", Dynamic::from(COMPARTMENT))]),
        )
        .await;
    let first_ad = harness
        .state
        .get("data.oci_identity_availability_domains.ADs")
        .unwrap()
        .get_string(&AttributePath::new("availability_domains").index(0).attribute("name"))
        .unwrap();
    assert_eq!(first_ad, AD);

    let vcn = harness
        .apply_resource(
            "oci_core_virtual_network",
            "t",
            object(&[
                ("compartment_id", Dynamic::from(COMPARTMENT)),
                ("display_name", Dynamic::from("-tf-vcn")),
                ("cidr_block", Dynamic::from("10.0.0.0/16")),
            ]),
        )
        .await;
    let vcn_attr = |name: &str| vcn.get_string(&AttributePath::new(name)).unwrap();

    let subnet = harness
        .apply_resource(
            "oci_core_subnet",
            "t",
            object(&[
                ("availability_domain", Dynamic::from(first_ad.as_str())),
                ("compartment_id", Dynamic::from(COMPARTMENT)),
                ("vcn_id", Dynamic::String(vcn_attr("id"))),
                ("display_name", Dynamic::from("-tf-subnet")),
                ("cidr_block", Dynamic::from("10.0.1.0/24")),
                ("dhcp_options_id", Dynamic::String(vcn_attr("default_dhcp_options_id"))),
                ("route_table_id", Dynamic::String(vcn_attr("default_route_table_id"))),
                (
                    "security_list_ids",
                    Dynamic::List(vec![Dynamic::String(vcn_attr("default_security_list_id"))]),
                ),
            ]),
        )
        .await;

    let instance = harness
        .apply_resource(
            "oci_core_instance",
            "t",
            object(&[
                ("availability_domain", Dynamic::from(first_ad.as_str())),
                ("compartment_id", Dynamic::from(COMPARTMENT)),
                ("display_name", Dynamic::from(token.as_str())),
                (
                    "subnet_id",
                    Dynamic::String(subnet.get_string(&AttributePath::new("id")).unwrap()),
                ),
                ("image", Dynamic::from(IMAGE_ID)),
                ("shape", Dynamic::from("VM.Standard1.1")),
                (
                    "metadata",
                    Dynamic::Map(HashMap::from([(
                        "ssh_authorized_keys".to_string(),
                        Dynamic::from(SSH_KEY),
                    )])),
                ),
                (
                    "timeouts",
                    Dynamic::Map(HashMap::from([("create".to_string(), Dynamic::from("15m"))])),
                ),
            ]),
        )
        .await;
    assert_eq!(
        instance.get_string(&AttributePath::new("private_ip")).unwrap(),
        "10.0.1.2"
    );

    // Step 1: list by display name, narrowed to the instance by id
    harness
        .read_data_source("oci_core_instances", "t", instances_config(&token, None))
        .await;

    let check = compose_checks(vec![
        check_resource_attr(DATA_T, "instances.#", "1"),
        check_resource_attr(DATA_T, "instances.0.display_name", &token),
        check_resource_attr(DATA_T, "instances.0.state", "RUNNING"),
        check_resource_attr(DATA_T, "instances.0.shape", "VM.Standard1.1"),
        check_resource_attr_set(DATA_T, "instances.0.availability_domain"),
        check_resource_attr_set(DATA_T, "instances.0.id"),
        check_resource_attr_set(DATA_T, "instances.0.region"),
        check_resource_attr_set(DATA_T, "instances.0.image"),
        check_resource_attr_set(DATA_T, "instances.0.time_created"),
        check_resource_attr_set(DATA_T, "instances.0.metadata.%"),
        check_resource_attr_set(DATA_T, "instances.0.metadata.ssh_authorized_keys"),
        check_resource_attr(DATA_T, "instances.0.ipxe_script", ""),
        check_resource_attr(DATA_T, "instances.0.extended_metadata.%", "0"),
        check_no_resource_attr(DATA_T, "instances.0.create_vnic_details"),
        check_resource_attr(DATA_T, "instances.0.subnet_id", ""),
        check_resource_attr(DATA_T, "instances.0.private_ip", ""),
        check_resource_attr(DATA_T, "instances.0.public_ip", ""),
        check_resource_attr(DATA_T, "instances.0.hostname_label", ""),
    ]);
    check(&harness.state).unwrap();
    assert_eq!(
        harness
            .state
            .get(DATA_T)
            .unwrap()
            .get_string(&AttributePath::new("instances").index(0).attribute("id"))
            .unwrap(),
        INSTANCE_ID
    );

    let imported = harness
        .import_resource("oci_core_instance", INSTANCE_ID)
        .await
        .unwrap();
    let diffs = verify_import_state(&instance, &imported, &["timeouts"]);
    assert!(diffs.is_empty(), "import mismatch: {:#?}", diffs);

    // Step 2: the optional state argument is passed through to the API
    harness
        .read_data_source("oci_core_instances", "t", instances_config(&token, Some("RUNNING")))
        .await;
    harness
        .read_data_source("oci_core_instances", "t2", instances_config(&token, Some("TERMINATED")))
        .await;

    let check = compose_checks(vec![
        check_resource_attr(DATA_T, "instances.#", "1"),
        check_resource_attr(DATA_T2, "instances.#", "0"),
    ]);
    check(&harness.state).unwrap();

    // Destroy in reverse dependency order
    instance_running.remove_async().await;
    let terminate = server
        .mock("DELETE", format!("/20160918/instances/{}", INSTANCE_ID).as_str())
        .with_status(204)
        .create_async()
        .await;
    let _instance_terminated = get_mock(
        &mut server,
        &format!("/instances/{}", INSTANCE_ID),
        200,
        instance_json(INSTANCE_ID, &token, "TERMINATED"),
    ).await;
    harness.destroy_resource("oci_core_instance", "t").await;
    assert!(harness
        .import_resource("oci_core_instance", INSTANCE_ID)
        .await
        .is_none());

    subnet_available.remove_async().await;
    let delete_subnet = server
        .mock("DELETE", format!("/20160918/subnets/{}", SUBNET_ID).as_str())
        .with_status(204)
        .create_async()
        .await;
    let _subnet_gone = get_mock(
        &mut server,
        &format!("/subnets/{}", SUBNET_ID),
        404,
        not_found.to_string(),
    ).await;
    harness.destroy_resource("oci_core_subnet", "t").await;

    vcn_available.remove_async().await;
    let delete_vcn = server
        .mock("DELETE", format!("/20160918/vcns/{}", VCN_ID).as_str())
        .with_status(204)
        .create_async()
        .await;
    let _vcn_gone = get_mock(&mut server, &format!("/vcns/{}", VCN_ID), 404, not_found.to_string()).await;
    harness.destroy_resource("oci_core_virtual_network", "t").await;

    for mock in [
        create_vcn,
        create_subnet,
        launch,
        terminate,
        delete_subnet,
        delete_vcn,
    ] {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn datasource_core_instances_rejects_invalid_state() {
    let server = Server::new_async().await;
    let harness = Harness::new(&server.url()).await;

    let factories = harness.provider.data_sources();
    let data_source = factories["oci_core_instances"]();
    let validated = data_source
        .validate(
            Context::new(),
            ValidateDataSourceConfigRequest {
                type_name: "oci_core_instances".to_string(),
                config: instances_config("token", Some("RUNNNING")),
            },
        )
        .await;

    assert_eq!(validated.diagnostics.len(), 1);
    assert_eq!(
        validated.diagnostics[0]
            .attribute
            .as_ref()
            .map(|p| p.to_string())
            .as_deref(),
        Some("state")
    );
}
