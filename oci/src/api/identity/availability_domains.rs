//! Availability domain API implementation

use crate::api::common::ApiQueryParams;
use crate::api::{ApiError, Client, Service};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDomain {
    pub name: String,
    pub compartment_id: String,
}

pub struct AvailabilityDomainsApi<'a> {
    client: &'a Client,
}

impl<'a> AvailabilityDomainsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /availabilityDomains
    pub async fn list(&self, compartment_id: &str) -> Result<Vec<AvailabilityDomain>, ApiError> {
        let params = ApiQueryParams::new().add("compartmentId", compartment_id);
        self.client
            .list_all(Service::Identity, "/availabilityDomains", &params)
            .await
    }
}
