pub mod configurer;
pub mod object_key;
pub mod pending;
pub mod properties;
pub mod proxy;

pub use configurer::{ObjectConfigurer, FACTORY_KEY, PLATFORM_PREFIX, TYPE_KEY};
pub use object_key::ObjectKey;
pub use pending::Pending;
pub use properties::{ListRef, MapRef, PropertyDescriptor, PropertyType, Target};
pub use proxy::{ProxyFactory, ProxyRegistry};
