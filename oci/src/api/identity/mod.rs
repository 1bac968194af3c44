pub mod availability_domains;

use crate::api::Client;

/// Identity API
pub struct IdentityApi<'a> {
    client: &'a Client,
}

impl<'a> IdentityApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn availability_domains(&self) -> availability_domains::AvailabilityDomainsApi<'a> {
        availability_domains::AvailabilityDomainsApi::new(self.client)
    }
}
