use std::any::Any;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::config::conversions::Representation;
use crate::config::Configuration;
use crate::container::object_key::ObjectKey;
use crate::container::pending::Pending;
use crate::container::properties::PropertyDescriptor;
use crate::container::proxy::ProxyRegistry;
use crate::errors::CoreError;
use crate::foundation::value::Value;

/// Shared reference to the container collaborating in graph construction.
pub type ContainerRef = Rc<dyn Container>;

/// The capability interface of a configurable component.
///
/// Each configurable type carries an explicit property table — descriptor
/// lookup plus get/set — in place of runtime method discovery. Get and set
/// fail silently (`None` / `false`) rather than raise. The `as_*` accessors
/// expose the optional capabilities a component may additionally support;
/// they default to `None`.
pub trait Configurable: Any {
    /// Stable tag identifying the component's type, used for proxy lookup
    /// and instantiation hints.
    fn type_tag(&self) -> &'static str;

    /// Supertype tags, nearest first, used for proxy fallback and
    /// assignability checks.
    fn super_tags(&self) -> &'static [&'static str] {
        &[]
    }

    /// Descriptor for a named configurable property.
    fn property(&self, name: &str) -> Option<PropertyDescriptor>;

    /// Current value of a named property, when readable.
    fn get_property(&self, name: &str) -> Option<Value>;

    /// Set a named property. Returns false when the property is unknown or
    /// the value cannot be accepted.
    fn set_property(&mut self, name: &str, value: Value) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Components that want configuration lifecycle notifications.
    fn as_container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        None
    }

    /// Components that perform their own configuration.
    fn as_self_configuring(&mut self) -> Option<&mut dyn SelfConfiguring> {
        None
    }

    /// Components notified of the object they are injected into.
    fn as_object_aware(&mut self) -> Option<&mut dyn ObjectAware> {
        None
    }

    /// Components acting as object factories for `*factory` hints.
    fn as_factory(&self) -> Option<&dyn ObjectFactory> {
        None
    }

    /// Components acting as configuration proxies for another value.
    fn as_proxy(&self) -> Option<&dyn ConfigurationProxy> {
        None
    }
}

/// Configuration lifecycle hooks around generic property injection.
pub trait ContainerAware {
    /// Invoked with the raw configuration before any property is injected.
    fn before_configure(&mut self, configuration: &Configuration);

    /// Invoked once configuration completes. Deferred while pending named
    /// references still target the object.
    fn after_configure(&mut self, configuration: &Configuration);
}

/// Components that configure themselves from their configuration, bypassing
/// generic property iteration.
pub trait SelfConfiguring {
    fn configure(&mut self, configuration: &Configuration, container: &dyn Container);
}

/// Values notified of the owner they are about to be injected into.
pub trait ObjectAware {
    /// `owner` is absent when the owning target is the container itself.
    fn notify_owner(&mut self, owner: Option<&Value>, property: &str);
}

/// Object factory referenced through a `*factory` configuration hint.
///
/// Factory products skip the standard dependency-injection pass; the
/// container's post-instantiation and post-configuration hooks still run.
pub trait ObjectFactory {
    fn build_object(
        &self,
        configuration: &Configuration,
        container: &dyn Container,
        identifier: &str,
    ) -> Option<Value>;
}

/// A proxy presenting an injectable configuration interface over an
/// otherwise-unconfigurable value. Proxies pass through the same
/// configuration pipeline as ordinary components and are unwrapped at
/// injection time.
pub trait ConfigurationProxy {
    /// The value the proxy stands in for.
    fn unwrap_value(&self) -> Value;
}

/// The object container consumed by the configurer.
///
/// The engine drives construction; the container supplies named-object
/// lookup, type-tag instantiation, the proxy registry, and the bookkeeping
/// for pending named references.
pub trait Container {
    /// The container's proxy registry.
    fn proxies(&self) -> &ProxyRegistry;

    /// Look up a named object.
    fn get_named(&self, name: &str) -> Option<Value>;

    /// Register or replace a named object.
    fn set_named(&self, name: &str, value: Value);

    /// Declared properties of the container itself; named-object entries are
    /// the fallback when no declared property matches.
    fn property(&self, name: &str) -> Option<PropertyDescriptor> {
        let _ = name;
        None
    }

    /// Read a declared container property.
    fn get_property(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }

    /// Write a declared container property.
    fn set_property(&self, name: &str, value: Value) -> bool {
        let _ = (name, value);
        false
    }

    /// Build an object from the configuration's instantiation hints, if any.
    fn build_object(&self, configuration: &Configuration, identifier: &str) -> Option<Value>;

    /// Instantiate a default instance of a concrete type by its type tag.
    fn new_instance(&self, type_tag: &str, configuration: &Configuration)
        -> Result<Value, CoreError>;

    /// Whether pending named references are waiting on the given object.
    fn has_pending_refs(&self, key: &ObjectKey) -> bool;

    /// Record a configuration whose post-configure hook must be replayed
    /// once the object's pending references resolve.
    fn record_pending_configuration(&self, key: ObjectKey, configuration: Configuration);

    /// Count a new pending reference against the object it waits on.
    fn add_pending_ref(&self, pending: &Pending);

    /// Hook invoked after an object is instantiated.
    fn post_instantiate(&self, value: &Value) {
        let _ = value;
    }

    /// Hook invoked after an object is configured.
    fn post_configure(&self, value: &Value) {
        let _ = value;
    }
}

/// Dereferences internal URIs appearing as `@` value references.
pub trait UriResolver {
    fn dereference(&self, uri: &str) -> Option<Value>;
}

/// A resolver-produced handle on external data.
pub trait Resource {
    /// The resource's data in plain JSON form.
    fn as_json(&self) -> Json;

    /// Convert the resource to the named representation.
    fn as_representation(&self, representation: Representation) -> Option<Value> {
        match representation {
            Representation::Json => Some(Value::Json(self.as_json())),
            _ => None,
        }
    }

    /// The URI the resource was resolved from.
    fn uri(&self) -> &str;
}
