pub mod data_source_availability_domains;

pub use data_source_availability_domains::AvailabilityDomainsDataSource;
