//! Data source implementations

pub mod core;
pub mod identity;

pub use self::core::InstancesDataSource;
pub use self::identity::AvailabilityDomainsDataSource;

use crate::provider_data::OciProviderData;
use chrono::Utc;
use tfplug::data_source::{ConfigureDataSourceRequest, ConfigureDataSourceResponse};
use tfplug::types::Diagnostic;

/// Shared body of `DataSourceWithConfigure::configure`
pub(crate) fn configure_provider_data(
    slot: &mut Option<OciProviderData>,
    request: ConfigureDataSourceRequest,
) -> ConfigureDataSourceResponse {
    let mut diagnostics = vec![];

    match request.provider_data {
        Some(data) => match data.downcast_ref::<OciProviderData>() {
            Some(provider_data) => *slot = Some(provider_data.clone()),
            None => diagnostics.push(Diagnostic::error(
                "Invalid provider data",
                "Failed to extract OciProviderData from provider data",
            )),
        },
        None => diagnostics.push(Diagnostic::error(
            "No provider data",
            "No provider data was provided to the data source",
        )),
    }

    ConfigureDataSourceResponse { diagnostics }
}

/// List data sources have no natural id; each read gets the current time
pub(crate) fn generate_data_source_id() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.9f +0000 UTC").to_string()
}
