pub mod config;
pub mod container;
pub mod errors;
pub mod foundation;

// Re-export key types for convenience (specific exports to avoid ambiguity)
pub use config::{
    Color, Configuration, ConversionService, Maybe, Representation, StandardConversions, ValueType,
};
pub use container::{
    ObjectConfigurer, ObjectKey, Pending, PropertyDescriptor, PropertyType, ProxyFactory,
    ProxyRegistry, Target,
};
pub use errors::CoreError;
pub use foundation::{
    ComponentRef, Configurable, ConfigurationProxy, Container, ContainerAware, ContainerRef,
    ObjectAware, ObjectFactory, Resource, SelfConfiguring, UriResolver, Value,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework information
pub const FRAMEWORK_NAME: &str = "trellis";

/// Get framework version
pub fn version() -> &'static str {
    VERSION
}

/// Get framework name
pub fn name() -> &'static str {
    FRAMEWORK_NAME
}
