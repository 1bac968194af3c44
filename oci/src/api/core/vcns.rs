//! Virtual cloud network (VCN) API implementation

use crate::api::common::{lifecycle_state, ApiQueryParams};
use crate::api::{ApiError, Client, Service};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

lifecycle_state!(VcnLifecycleState {
    Provisioning => "PROVISIONING",
    Available => "AVAILABLE",
    Terminating => "TERMINATING",
    Terminated => "TERMINATED",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vcn {
    pub id: String,
    pub compartment_id: String,
    pub cidr_block: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub dns_label: Option<String>,
    pub lifecycle_state: VcnLifecycleState,
    #[serde(default)]
    pub default_dhcp_options_id: Option<String>,
    #[serde(default)]
    pub default_route_table_id: Option<String>,
    #[serde(default)]
    pub default_security_list_id: Option<String>,
    #[serde(default)]
    pub vcn_domain_name: Option<String>,
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
}

/// Request body for POST /vcns
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVcnDetails {
    pub compartment_id: String,
    pub cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_label: Option<String>,
}

/// Request body for PUT /vcns/{vcnId}
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVcnDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

pub struct VcnsApi<'a> {
    client: &'a Client,
}

impl<'a> VcnsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /vcns
    pub async fn create(&self, details: &CreateVcnDetails) -> Result<Vcn, ApiError> {
        self.client.post(Service::Core, "/vcns", details).await
    }

    /// GET /vcns/{vcnId}
    pub async fn get(&self, vcn_id: &str) -> Result<Vcn, ApiError> {
        let path = format!("/vcns/{}", vcn_id);
        self.client
            .get(Service::Core, &path, &ApiQueryParams::new())
            .await
    }

    /// PUT /vcns/{vcnId}
    pub async fn update(&self, vcn_id: &str, details: &UpdateVcnDetails) -> Result<Vcn, ApiError> {
        let path = format!("/vcns/{}", vcn_id);
        self.client.put(Service::Core, &path, details).await
    }

    /// DELETE /vcns/{vcnId}
    pub async fn delete(&self, vcn_id: &str) -> Result<(), ApiError> {
        let path = format!("/vcns/{}", vcn_id);
        self.client
            .delete(Service::Core, &path, &ApiQueryParams::new())
            .await
    }
}
