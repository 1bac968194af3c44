//! Compute instance API implementation

use crate::api::common::{lifecycle_state, ApiQueryParams};
use crate::api::{ApiError, Client, Service};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

lifecycle_state!(InstanceLifecycleState {
    Provisioning => "PROVISIONING",
    Running => "RUNNING",
    Starting => "STARTING",
    Stopping => "STOPPING",
    Stopped => "STOPPED",
    CreatingImage => "CREATING_IMAGE",
    Terminating => "TERMINATING",
    Terminated => "TERMINATED",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub availability_domain: String,
    pub compartment_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub shape: String,
    #[serde(default)]
    pub image_id: Option<String>,
    pub region: String,
    pub lifecycle_state: InstanceLifecycleState,
    #[serde(default)]
    pub ipxe_script: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    /// Values may be nested JSON objects
    #[serde(default)]
    pub extended_metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVnicDetails {
    pub subnet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_public_ip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Request body for POST /instances
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchInstanceDetails {
    pub availability_domain: String,
    pub compartment_id: String,
    pub shape: String,
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipxe_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_vnic_details: Option<CreateVnicDetails>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstanceDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Server-side filters for GET /instances
#[derive(Debug, Clone, Default)]
pub struct ListInstancesParams {
    pub compartment_id: String,
    pub availability_domain: Option<String>,
    pub display_name: Option<String>,
    pub lifecycle_state: Option<InstanceLifecycleState>,
    pub limit: Option<u32>,
}

impl ListInstancesParams {
    pub fn new(compartment_id: &str) -> Self {
        Self {
            compartment_id: compartment_id.to_string(),
            ..Default::default()
        }
    }

    pub fn to_query_params(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add("compartmentId", &self.compartment_id)
            .add_optional("availabilityDomain", self.availability_domain.as_deref())
            .add_optional("displayName", self.display_name.as_deref())
            .add_optional("lifecycleState", self.lifecycle_state.map(|s| s.as_str()))
            .add_optional("limit", self.limit)
    }
}

pub struct InstancesApi<'a> {
    client: &'a Client,
}

impl<'a> InstancesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /instances
    pub async fn launch(&self, details: &LaunchInstanceDetails) -> Result<Instance, ApiError> {
        self.client.post(Service::Core, "/instances", details).await
    }

    /// GET /instances/{instanceId}
    pub async fn get(&self, instance_id: &str) -> Result<Instance, ApiError> {
        let path = format!("/instances/{}", instance_id);
        self.client
            .get(Service::Core, &path, &ApiQueryParams::new())
            .await
    }

    /// PUT /instances/{instanceId}
    pub async fn update(
        &self,
        instance_id: &str,
        details: &UpdateInstanceDetails,
    ) -> Result<Instance, ApiError> {
        let path = format!("/instances/{}", instance_id);
        self.client.put(Service::Core, &path, details).await
    }

    /// DELETE /instances/{instanceId}
    pub async fn terminate(&self, instance_id: &str) -> Result<(), ApiError> {
        let path = format!("/instances/{}", instance_id);
        self.client
            .delete(Service::Core, &path, &ApiQueryParams::new())
            .await
    }

    /// GET /instances, every page
    pub async fn list(&self, params: &ListInstancesParams) -> Result<Vec<Instance>, ApiError> {
        self.client
            .list_all(Service::Core, "/instances", &params.to_query_params())
            .await
    }
}
