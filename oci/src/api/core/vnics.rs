//! VNIC and VNIC attachment API implementation

use crate::api::common::{lifecycle_state, ApiQueryParams};
use crate::api::{ApiError, Client, Service};
use serde::{Deserialize, Serialize};

lifecycle_state!(VnicAttachmentLifecycleState {
    Attaching => "ATTACHING",
    Attached => "ATTACHED",
    Detaching => "DETACHING",
    Detached => "DETACHED",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnicAttachment {
    pub id: String,
    pub instance_id: String,
    pub availability_domain: String,
    pub compartment_id: String,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub vnic_id: Option<String>,
    pub lifecycle_state: VnicAttachmentLifecycleState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vnic {
    pub id: String,
    pub subnet_id: String,
    #[serde(default)]
    pub private_ip: Option<String>,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub hostname_label: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_primary: Option<bool>,
}

pub struct VnicAttachmentsApi<'a> {
    client: &'a Client,
}

impl<'a> VnicAttachmentsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /vnicAttachments for one instance, every page
    pub async fn list_by_instance(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, ApiError> {
        let params = ApiQueryParams::new()
            .add("compartmentId", compartment_id)
            .add("instanceId", instance_id);
        self.client
            .list_all(Service::Core, "/vnicAttachments", &params)
            .await
    }
}

pub struct VnicsApi<'a> {
    client: &'a Client,
}

impl<'a> VnicsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /vnics/{vnicId}
    pub async fn get(&self, vnic_id: &str) -> Result<Vnic, ApiError> {
        let path = format!("/vnics/{}", vnic_id);
        self.client
            .get(Service::Core, &path, &ApiQueryParams::new())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn list_attachments_filters_by_instance() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/20160918/vnicAttachments")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("compartmentId".into(), "c".into()),
                Matcher::UrlEncoded("instanceId".into(), "i".into()),
            ]))
            .with_body(
                r#"[{
                "id": "ocid1.vnicattachment.oc1.phx.aaaa",
                "instanceId": "i",
                "availabilityDomain": "Uocm:PHX-AD-1",
                "compartmentId": "c",
                "subnetId": "s",
                "vnicId": "ocid1.vnic.oc1.phx.vvvv",
                "lifecycleState": "ATTACHED"
            }]"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let attachments = client
            .core()
            .vnic_attachments()
            .list_by_instance("c", "i")
            .await
            .unwrap();

        assert_eq!(attachments.len(), 1);
        assert_eq!(
            attachments[0].lifecycle_state,
            VnicAttachmentLifecycleState::Attached
        );
        assert_eq!(attachments[0].vnic_id.as_deref(), Some("ocid1.vnic.oc1.phx.vvvv"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_vnic() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/20160918/vnics/v")
            .with_body(
                r#"{"id":"v","subnetId":"s","privateIp":"10.0.1.2","publicIp":"129.146.0.1","hostnameLabel":"web","isPrimary":true}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let vnic = client.core().vnics().get("v").await.unwrap();
        assert_eq!(vnic.private_ip.as_deref(), Some("10.0.1.2"));
        assert_eq!(vnic.is_primary, Some(true));
    }
}
