pub mod data_source_instances;

pub use data_source_instances::InstancesDataSource;
