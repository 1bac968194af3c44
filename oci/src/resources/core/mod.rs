pub mod resource_instance;
pub mod resource_subnet;
pub mod resource_virtual_network;

pub use resource_instance::InstanceResource;
pub use resource_subnet::SubnetResource;
pub use resource_virtual_network::VirtualNetworkResource;
