use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::value::{ComponentRef, Value};

/// Factory instantiating a proxy component initialized with the value it
/// stands in for.
pub type ProxyFactory = Rc<dyn Fn(Value) -> ComponentRef>;

#[derive(Clone)]
enum ProxyEntry {
    Proxy(ProxyFactory),
    /// Explicit "no proxy" marker; also cached after a full-chain miss.
    NoProxy,
}

/// Registry of configuration proxies keyed by type tag.
///
/// A proxy presents an injectable configuration interface over an
/// otherwise-opaque value. The registry is owned by the container, built
/// once at startup and read thereafter; it is not `Sync` and concurrent use
/// requires external locking.
pub struct ProxyRegistry {
    entries: RefCell<HashMap<String, ProxyEntry>>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        ProxyRegistry {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Register a proxy factory for a proxied type.
    ///
    /// Registration must complete before the first lookup for the type or
    /// any of its subtypes: a miss caches a negative entry that later
    /// registrations along the supertype chain will not displace.
    pub fn register(&self, type_tag: impl Into<String>, factory: ProxyFactory) {
        self.entries
            .borrow_mut()
            .insert(type_tag.into(), ProxyEntry::Proxy(factory));
    }

    /// Register an explicit no-proxy marker for a type.
    pub fn register_no_proxy(&self, type_tag: impl Into<String>) {
        self.entries
            .borrow_mut()
            .insert(type_tag.into(), ProxyEntry::NoProxy);
    }

    /// Look up the proxy factory for a type, trying the exact tag first and
    /// then each supertype tag in order. A hit along the chain is recorded
    /// against the specific tag; a full miss caches a negative entry so
    /// later lookups complete without re-walking the chain.
    pub fn lookup(&self, type_tag: &str, super_tags: &[&str]) -> Option<ProxyFactory> {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.get(type_tag) {
            return match entry {
                ProxyEntry::Proxy(factory) => Some(Rc::clone(factory)),
                ProxyEntry::NoProxy => None,
            };
        }
        for tag in super_tags {
            if let Some(entry) = entries.get(*tag).cloned() {
                let factory = match &entry {
                    ProxyEntry::Proxy(factory) => Some(Rc::clone(factory)),
                    ProxyEntry::NoProxy => None,
                };
                entries.insert(type_tag.to_string(), entry);
                return factory;
            }
        }
        entries.insert(type_tag.to_string(), ProxyEntry::NoProxy);
        None
    }

    /// Wrap a component value in its registered proxy, if one is registered
    /// for its type; any other value is returned unchanged.
    pub fn apply(&self, value: Value) -> Value {
        let factory = match &value {
            Value::Object(component) => {
                let (type_tag, super_tags) = {
                    let component = component.borrow();
                    (component.type_tag(), component.super_tags())
                };
                self.lookup(type_tag, super_tags)
            }
            _ => None,
        };
        match factory {
            Some(factory) => Value::Object(factory(value)),
            None => value,
        }
    }
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::properties::PropertyDescriptor;
    use crate::foundation::traits::{Configurable, ConfigurationProxy};
    use std::any::Any;

    struct Opaque;

    impl Configurable for Opaque {
        fn type_tag(&self) -> &'static str {
            "opaque"
        }
        fn super_tags(&self) -> &'static [&'static str] {
            &["base"]
        }
        fn property(&self, _name: &str) -> Option<PropertyDescriptor> {
            None
        }
        fn get_property(&self, _name: &str) -> Option<Value> {
            None
        }
        fn set_property(&mut self, _name: &str, _value: Value) -> bool {
            false
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct OpaqueProxy {
        wrapped: Value,
    }

    impl Configurable for OpaqueProxy {
        fn type_tag(&self) -> &'static str {
            "opaque-proxy"
        }
        fn property(&self, _name: &str) -> Option<PropertyDescriptor> {
            None
        }
        fn get_property(&self, _name: &str) -> Option<Value> {
            None
        }
        fn set_property(&mut self, _name: &str, _value: Value) -> bool {
            false
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
        fn as_proxy(&self) -> Option<&dyn ConfigurationProxy> {
            Some(self)
        }
    }

    impl ConfigurationProxy for OpaqueProxy {
        fn unwrap_value(&self) -> Value {
            self.wrapped.clone()
        }
    }

    fn proxy_factory() -> ProxyFactory {
        Rc::new(|value| {
            Rc::new(RefCell::new(OpaqueProxy { wrapped: value })) as ComponentRef
        })
    }

    #[test]
    fn test_exact_lookup() {
        let registry = ProxyRegistry::new();
        registry.register("opaque", proxy_factory());
        assert!(registry.lookup("opaque", &[]).is_some());
        assert!(registry.lookup("other", &[]).is_none());
    }

    #[test]
    fn test_supertype_lookup_caches_under_specific_tag() {
        let registry = ProxyRegistry::new();
        registry.register("base", proxy_factory());
        assert!(registry.lookup("opaque", &["base"]).is_some());
        // the hit was recorded against the specific tag
        assert!(registry.lookup("opaque", &[]).is_some());
    }

    #[test]
    fn test_negative_result_is_cached() {
        let registry = ProxyRegistry::new();
        // first lookup misses the whole chain and caches the miss
        assert!(registry.lookup("opaque", &["base"]).is_none());
        // registering the supertype proxy afterwards does not displace the
        // cached class-specific entry
        registry.register("base", proxy_factory());
        assert!(registry.lookup("opaque", &["base"]).is_none());
        // a type not yet queried still finds the supertype proxy
        assert!(registry.lookup("fresh", &["base"]).is_some());
    }

    #[test]
    fn test_explicit_no_proxy_marker() {
        let registry = ProxyRegistry::new();
        registry.register("base", proxy_factory());
        registry.register_no_proxy("opaque");
        assert!(registry.lookup("opaque", &["base"]).is_none());
    }

    #[test]
    fn test_apply_wraps_and_proxy_unwraps() {
        let registry = ProxyRegistry::new();
        registry.register("opaque", proxy_factory());
        let original = Value::object(Opaque);
        let wrapped = registry.apply(original.clone());
        let component = wrapped.as_component().unwrap().borrow();
        assert_eq!(component.type_tag(), "opaque-proxy");
        let unwrapped = component.as_proxy().unwrap().unwrap_value();
        assert!(Rc::ptr_eq(
            original.as_component().unwrap(),
            unwrapped.as_component().unwrap()
        ));
    }

    #[test]
    fn test_apply_leaves_unregistered_values_unchanged() {
        let registry = ProxyRegistry::new();
        let value = registry.apply(Value::Json(serde_json::json!(1)));
        assert!(matches!(value, Value::Json(_)));
        let original = Value::object(Opaque);
        let value = registry.apply(original.clone());
        assert!(Rc::ptr_eq(
            original.as_component().unwrap(),
            value.as_component().unwrap()
        ));
    }
}
