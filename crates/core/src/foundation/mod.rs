pub mod traits;
pub mod value;

pub use traits::{
    Configurable, ConfigurationProxy, Container, ContainerAware, ContainerRef, ObjectAware,
    ObjectFactory, Resource, SelfConfiguring, UriResolver,
};
pub use value::{ComponentRef, Value};
