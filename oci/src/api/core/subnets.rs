//! Subnet API implementation

use crate::api::common::{lifecycle_state, ApiQueryParams};
use crate::api::{ApiError, Client, Service};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

lifecycle_state!(SubnetLifecycleState {
    Provisioning => "PROVISIONING",
    Available => "AVAILABLE",
    Terminating => "TERMINATING",
    Terminated => "TERMINATED",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub id: String,
    pub availability_domain: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub cidr_block: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub dhcp_options_id: Option<String>,
    #[serde(default)]
    pub route_table_id: Option<String>,
    #[serde(default)]
    pub security_list_ids: Vec<String>,
    #[serde(default)]
    pub dns_label: Option<String>,
    #[serde(default)]
    pub prohibit_public_ip_on_vnic: Option<bool>,
    pub lifecycle_state: SubnetLifecycleState,
    #[serde(default)]
    pub virtual_router_ip: Option<String>,
    #[serde(default)]
    pub virtual_router_mac: Option<String>,
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubnetDetails {
    pub availability_domain: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_options_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_table_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_list_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prohibit_public_ip_on_vnic: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubnetDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

pub struct SubnetsApi<'a> {
    client: &'a Client,
}

impl<'a> SubnetsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /subnets
    pub async fn create(&self, details: &CreateSubnetDetails) -> Result<Subnet, ApiError> {
        self.client.post(Service::Core, "/subnets", details).await
    }

    /// GET /subnets/{subnetId}
    pub async fn get(&self, subnet_id: &str) -> Result<Subnet, ApiError> {
        let path = format!("/subnets/{}", subnet_id);
        self.client
            .get(Service::Core, &path, &ApiQueryParams::new())
            .await
    }

    /// PUT /subnets/{subnetId}
    pub async fn update(
        &self,
        subnet_id: &str,
        details: &UpdateSubnetDetails,
    ) -> Result<Subnet, ApiError> {
        let path = format!("/subnets/{}", subnet_id);
        self.client.put(Service::Core, &path, details).await
    }

    /// DELETE /subnets/{subnetId}
    pub async fn delete(&self, subnet_id: &str) -> Result<(), ApiError> {
        let path = format!("/subnets/{}", subnet_id);
        self.client
            .delete(Service::Core, &path, &ApiQueryParams::new())
            .await
    }
}
