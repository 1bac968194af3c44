pub mod instances;
pub mod subnets;
pub mod vcns;
pub mod vnics;

use crate::api::Client;

/// Core services API: networking and compute
pub struct CoreApi<'a> {
    client: &'a Client,
}

impl<'a> CoreApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn vcns(&self) -> vcns::VcnsApi<'a> {
        vcns::VcnsApi::new(self.client)
    }

    pub fn subnets(&self) -> subnets::SubnetsApi<'a> {
        subnets::SubnetsApi::new(self.client)
    }

    pub fn instances(&self) -> instances::InstancesApi<'a> {
        instances::InstancesApi::new(self.client)
    }

    pub fn vnic_attachments(&self) -> vnics::VnicAttachmentsApi<'a> {
        vnics::VnicAttachmentsApi::new(self.client)
    }

    pub fn vnics(&self) -> vnics::VnicsApi<'a> {
        vnics::VnicsApi::new(self.client)
    }
}
