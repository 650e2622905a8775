use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::config::configuration::{Configuration, Maybe};
use crate::config::conversions::Representation;
use crate::container::object_key::ObjectKey;
use crate::container::properties::{ListRef, MapRef, Property, PropertyType, Target};
use crate::foundation::traits::Container;
use crate::foundation::value::Value;

/// Reserved instantiation-hint key owned by the container.
pub const TYPE_KEY: &str = "*type";
/// Reserved key naming an object factory for a value.
pub const FACTORY_KEY: &str = "*factory";
/// Platform qualifier prefix for property-name overrides.
pub const PLATFORM_PREFIX: &str = "*rs-";

/// Drives the configuration of a single object: resolves a value for each
/// property named by the object's configuration and injects it.
#[derive(Clone)]
pub struct ObjectConfigurer {
    /// The object being configured.
    target: Target,
    /// The object container.
    container: Rc<dyn Container>,
    /// The key path to the object's configuration.
    key_path: String,
    /// Member-type hint for the target's entries, when the target is a
    /// collection.
    member_hint: Option<PropertyType>,
}

impl ObjectConfigurer {
    /// Create a configurer driving values into `target`.
    pub fn new(target: Target, container: Rc<dyn Container>, key_path: impl Into<String>) -> Self {
        ObjectConfigurer {
            target,
            container,
            key_path: key_path.into(),
            member_hint: None,
        }
    }

    /// Set the member-type hint used when the target is a collection.
    pub fn with_member_hint(mut self, member_hint: Option<PropertyType>) -> Self {
        self.member_hint = member_hint;
        self
    }

    /// Create a configurer for the container itself: a collection of named
    /// objects with unconstrained member type.
    pub fn for_container(container: Rc<dyn Container>) -> Self {
        ObjectConfigurer {
            target: Target::Container(Rc::clone(&container)),
            container,
            key_path: String::new(),
            member_hint: Some(PropertyType::Any),
        }
    }

    /// The object being configured.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Perform the object configuration.
    pub fn configure_with(&self, configuration: &Configuration) {
        if let Target::Component(component) = &self.target {
            let mut component = component.borrow_mut();
            if let Some(aware) = component.as_container_aware() {
                aware.before_configure(configuration);
            }
        }

        // fully self-configuring objects perform their own injection
        let self_configured = match &self.target {
            Target::Component(component) => {
                let mut component = component.borrow_mut();
                match component.as_self_configuring() {
                    Some(object) => {
                        object.configure(configuration, self.container.as_ref());
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        };

        if !self_configured {
            match &self.target {
                // List items won't necessarily be presented in list order, so
                // configure through an index-keyed scratch map and write the
                // result back in index order afterwards.
                Target::List(list) => {
                    let scratch: MapRef = Rc::new(RefCell::new(HashMap::new()));
                    let sub = ObjectConfigurer {
                        target: Target::Map(Rc::clone(&scratch)),
                        container: Rc::clone(&self.container),
                        key_path: self.key_path.clone(),
                        member_hint: self.member_hint.clone(),
                    };
                    sub.configure_entries(configuration);
                    write_back_list(&scratch, list);
                }
                _ => self.configure_entries(configuration),
            }
        }

        // Post configuration. When pending named references still target
        // this exact instance, the hook is deferred and the configuration
        // recorded for replay once they resolve.
        if let Target::Component(component) = &self.target {
            let is_aware = component.borrow_mut().as_container_aware().is_some();
            if is_aware {
                let key = ObjectKey::of_component(component);
                if self.container.has_pending_refs(&key) {
                    self.container
                        .record_pending_configuration(key, configuration.clone());
                } else {
                    let mut component = component.borrow_mut();
                    if let Some(aware) = component.as_container_aware() {
                        aware.after_configure(configuration);
                    }
                }
            }
        }
        if let Some(value) = self.target.as_value() {
            self.container.post_configure(&value);
        }
    }

    fn configure_entries(&self, configuration: &Configuration) {
        for name in configuration.value_names() {
            if let Some(property_name) = normalize_property_name(&name) {
                self.configure_property(property_name, configuration);
            }
        }
    }

    /// Configure a single property from the object configuration. Returns
    /// the value the property was configured with, if any.
    pub fn configure_property(&self, name: &str, configuration: &Configuration) -> Option<Value> {
        let property = Property::of(&self.target, name, self.member_hint.as_ref())?;
        let mut value = self.typed_value(property.ty(), name, configuration);

        if value.is_none() {
            if let Some(maybe) = configuration.get_maybe(name) {
                if let Some(value_config) = maybe.configuration() {
                    value = self.build_value(&property, name, value_config, &maybe);
                }
                // still nothing; use whatever underlying value the maybe holds
                if value.is_none() {
                    value = Some(maybe.bare().clone());
                }
            }
        }
        match value {
            Some(value) => self.inject_value(name, value),
            None => None,
        }
    }

    /// Fetch a primitive-like property value through the matching typed
    /// accessor. Declared collection/object/any types resolve elsewhere.
    fn typed_value(
        &self,
        ty: &PropertyType,
        name: &str,
        configuration: &Configuration,
    ) -> Option<Value> {
        match ty {
            PropertyType::Bool => configuration
                .get_bool(name)
                .map(|b| Value::Json(Json::Bool(b))),
            PropertyType::Int => configuration
                .get_number(name)
                .map(|n| Value::Json(Json::from(n as i64))),
            PropertyType::Float => configuration
                .get_number(name)
                .and_then(serde_json::Number::from_f64)
                .map(|n| Value::Json(Json::Number(n))),
            PropertyType::String => configuration
                .get_string(name)
                .map(|s| Value::Json(Json::String(s))),
            PropertyType::Date => configuration.get_date(name).map(Value::Date),
            PropertyType::Image => configuration.value_as(name, Representation::Image),
            PropertyType::Color => configuration.get_color(name).map(Value::Color),
            PropertyType::Config => configuration.get_configuration(name).map(Value::Config),
            PropertyType::Data => configuration.value_as(name, Representation::Json),
            _ => None,
        }
    }

    /// Build a property value from its nested configuration.
    fn build_value(
        &self,
        property: &Property,
        name: &str,
        value_config: &Configuration,
        maybe: &Maybe,
    ) -> Option<Value> {
        // An explicit factory takes priority over everything else, including
        // any in-place value.
        if let Some(factory_value) = value_config.value(FACTORY_KEY) {
            return self.build_with_factory(factory_value, name, value_config);
        }

        let ty = property.ty();
        let mut configure_value = true;

        // try building from the container's instantiation hints
        let mut value = self.container.build_object(value_config, name);
        if value.is_none() {
            // no instantiation hint; fall back to an in-place value
            value = property.get(&self.target);
        }
        if let Some(built) = value.take() {
            // apply the configuration proxy wrapper, if one is registered
            value = Some(self.container.proxies().apply(built));
        }

        // A collection property without member-type info takes the plain
        // data value as-is; it is assumed to contain no configurables, so
        // the recursive configuration step is skipped.
        let is_list_prop = ty.is_list_like();
        let is_map_prop = !is_list_prop && ty.is_map_like();
        if value.is_none() && (is_list_prop || is_map_prop) && ty.member().is_none() {
            value = Some(Value::Json(maybe.data().clone()));
            configure_value = false;
        }

        if value.is_none() {
            value = match ty {
                PropertyType::List(_) => Some(Value::List(Rc::new(RefCell::new(Vec::new())))),
                PropertyType::Map(_) => Some(Value::Map(Rc::new(RefCell::new(HashMap::new())))),
                // use the declared type as an instantiation hint, but only
                // when it names a concrete type
                PropertyType::Object(type_tag) => {
                    match self.container.new_instance(type_tag, value_config) {
                        Ok(instance) => Some(instance),
                        Err(error) => {
                            tracing::error!(
                                "error creating new instance of inferred type {}: {}",
                                type_tag,
                                error
                            );
                            None
                        }
                    }
                }
                _ => None,
            };
        }

        // recursively configure the resolved value
        if configure_value {
            if let Some(target) = value.as_ref().and_then(Target::from_value) {
                let configurer = ObjectConfigurer {
                    target,
                    container: Rc::clone(&self.container),
                    key_path: self.child_key_path(name),
                    member_hint: ty.member().cloned(),
                };
                configurer.configure_with(value_config);
            }
        }
        value
    }

    fn build_with_factory(
        &self,
        factory_value: Value,
        name: &str,
        value_config: &Configuration,
    ) -> Option<Value> {
        if let Value::Object(component) = &factory_value {
            let component = component.borrow();
            if let Some(factory) = component.as_factory() {
                let value = factory.build_object(value_config, self.container.as_ref(), name)?;
                // factory products skip the standard dependency-injection
                // pass; container hooks still run
                self.container.post_instantiate(&value);
                self.container.post_configure(&value);
                return Some(value);
            }
        }
        tracing::warn!(
            "invalid {} value ({}) referenced at {}",
            FACTORY_KEY,
            factory_value.type_name(),
            self.child_key_path(name)
        );
        None
    }

    /// Inject a resolved value into a named property of the target.
    pub fn inject_value(&self, name: &str, value: Value) -> Option<Value> {
        // Object-aware values learn their owner and property ahead of the
        // injection, so that proxies receive the notification before being
        // unwrapped.
        if let Value::Object(component) = &value {
            let owner = self.target.as_value();
            let mut component = component.borrow_mut();
            if let Some(aware) = component.as_object_aware() {
                aware.notify_owner(owner.as_ref(), name);
            }
        }
        // unwrap proxies to the value they represent
        let mut value = value;
        if let Value::Object(component) = &value {
            let unwrapped = component
                .borrow()
                .as_proxy()
                .map(|proxy| proxy.unwrap_value());
            if let Some(unwrapped) = unwrapped {
                value = unwrapped;
            }
        }
        if let Value::Pending(pending) = &value {
            // Record the deferred injection and let the container count the
            // reference; the assignment happens when the awaited object
            // completes its configuration.
            pending.defer(name, self.clone());
            self.container.add_pending_ref(pending);
            return Some(value);
        }
        let property = Property::of(&self.target, name, self.member_hint.as_ref())?;
        if property.ty().accepts(&value) {
            property.set(&self.target, value.clone());
        }
        // non-assignable values are dropped without error
        Some(value)
    }

    fn child_key_path(&self, name: &str) -> String {
        if self.key_path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.key_path, name)
        }
    }
}

/// Normalize a configuration key into a property name. Reserved `*` names
/// are dropped unless qualified with the platform prefix, which is stripped;
/// a qualified name resolving to an instantiation hint stays with the
/// container.
fn normalize_property_name(name: &str) -> Option<&str> {
    if let Some(stripped) = name.strip_prefix(PLATFORM_PREFIX) {
        if stripped == "type" {
            None
        } else {
            Some(stripped)
        }
    } else if name.starts_with('*') {
        None
    } else {
        Some(name)
    }
}

/// Write configured list entries back into the target list in index order,
/// interpolating over existing items and appending past the end.
fn write_back_list(scratch: &MapRef, list: &ListRef) {
    let mut entries: Vec<(usize, Value)> = scratch
        .borrow()
        .iter()
        .filter_map(|(key, value)| key.parse::<usize>().ok().map(|index| (index, value.clone())))
        .collect();
    entries.sort_by_key(|(index, _)| *index);
    let mut list = list.borrow_mut();
    for (index, item) in entries {
        if index < list.len() {
            list[index] = item;
        } else {
            list.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::conversions::Color;
    use crate::container::pending::Pending;
    use crate::container::properties::PropertyDescriptor;
    use crate::container::proxy::ProxyRegistry;
    use crate::errors::CoreError;
    use crate::foundation::traits::Configurable;
    use serde_json::json;
    use std::any::Any;

    struct StubContainer {
        proxies: ProxyRegistry,
    }

    impl StubContainer {
        fn new() -> Rc<Self> {
            Rc::new(StubContainer {
                proxies: ProxyRegistry::new(),
            })
        }
    }

    impl Container for StubContainer {
        fn proxies(&self) -> &ProxyRegistry {
            &self.proxies
        }
        fn get_named(&self, _name: &str) -> Option<Value> {
            None
        }
        fn set_named(&self, _name: &str, _value: Value) {}
        fn build_object(&self, _configuration: &Configuration, _identifier: &str) -> Option<Value> {
            None
        }
        fn new_instance(
            &self,
            type_tag: &str,
            _configuration: &Configuration,
        ) -> Result<Value, CoreError> {
            Err(CoreError::unknown_type(type_tag))
        }
        fn has_pending_refs(&self, _key: &ObjectKey) -> bool {
            false
        }
        fn record_pending_configuration(&self, _key: ObjectKey, _configuration: Configuration) {}
        fn add_pending_ref(&self, _pending: &Pending) {}
    }

    #[derive(Default)]
    struct Widget {
        title: String,
        count: i64,
        ratio: f64,
        visible: bool,
        color: Option<Color>,
        style: Option<Configuration>,
        tags: Option<Json>,
        extra: Option<Value>,
    }

    impl Configurable for Widget {
        fn type_tag(&self) -> &'static str {
            "widget"
        }
        fn property(&self, name: &str) -> Option<PropertyDescriptor> {
            let ty = match name {
                "title" => PropertyType::String,
                "count" => PropertyType::Int,
                "ratio" => PropertyType::Float,
                "visible" => PropertyType::Bool,
                "color" => PropertyType::Color,
                "style" => PropertyType::Config,
                "tags" => PropertyType::List(None),
                "extra" => PropertyType::Any,
                _ => return None,
            };
            Some(PropertyDescriptor::new(name, ty))
        }
        fn get_property(&self, name: &str) -> Option<Value> {
            match name {
                "title" => Some(Value::Json(Json::String(self.title.clone()))),
                "count" => Some(Value::Json(Json::from(self.count))),
                _ => None,
            }
        }
        fn set_property(&mut self, name: &str, value: Value) -> bool {
            match name {
                "title" => match value.as_str() {
                    Some(s) => {
                        self.title = s.to_string();
                        true
                    }
                    None => false,
                },
                "count" => match value.as_json().and_then(|j| j.as_i64()) {
                    Some(n) => {
                        self.count = n;
                        true
                    }
                    None => false,
                },
                "ratio" => match value.as_json().and_then(|j| j.as_f64()) {
                    Some(n) => {
                        self.ratio = n;
                        true
                    }
                    None => false,
                },
                "visible" => match value.as_json().and_then(|j| j.as_bool()) {
                    Some(b) => {
                        self.visible = b;
                        true
                    }
                    None => false,
                },
                "color" => match value {
                    Value::Color(color) => {
                        self.color = Some(color);
                        true
                    }
                    _ => false,
                },
                "style" => match value {
                    Value::Config(config) => {
                        self.style = Some(config);
                        true
                    }
                    _ => false,
                },
                "tags" => match value.as_json() {
                    Some(json) => {
                        self.tags = Some(json);
                        true
                    }
                    None => false,
                },
                "extra" => {
                    self.extra = Some(value);
                    true
                }
                _ => false,
            }
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn configure_widget(data: Json) -> Rc<RefCell<dyn Configurable>> {
        let container = StubContainer::new();
        let widget = Rc::new(RefCell::new(Widget::default()));
        let target = Target::Component(widget.clone() as Rc<RefCell<dyn Configurable>>);
        ObjectConfigurer::new(target, container, "widget")
            .configure_with(&Configuration::new(data));
        widget
    }

    #[test]
    fn test_primitive_property_injection() {
        let widget = configure_widget(json!({
            "title": "Home",
            "count": 3,
            "ratio": 0.5,
            "visible": true,
            "color": "#102030"
        }));
        let widget = widget.borrow();
        let widget = widget.as_any().downcast_ref::<Widget>().unwrap();
        assert_eq!(widget.title, "Home");
        assert_eq!(widget.count, 3);
        assert_eq!(widget.ratio, 0.5);
        assert!(widget.visible);
        assert_eq!(widget.color, Some(Color(0xff102030)));
    }

    #[test]
    fn test_nested_configuration_property() {
        let widget = configure_widget(json!({"style": {"font": "mono"}}));
        let widget = widget.borrow();
        let widget = widget.as_any().downcast_ref::<Widget>().unwrap();
        let style = widget.style.as_ref().unwrap();
        assert_eq!(style.get_string("font"), Some("mono".to_string()));
    }

    #[test]
    fn test_collection_without_member_info_takes_raw_data() {
        let widget = configure_widget(json!({"tags": ["a", "b"]}));
        let widget = widget.borrow();
        let widget = widget.as_any().downcast_ref::<Widget>().unwrap();
        assert_eq!(widget.tags, Some(json!(["a", "b"])));
    }

    #[test]
    fn test_untyped_property_takes_bare_value() {
        let widget = configure_widget(json!({"extra": "plain"}));
        let widget = widget.borrow();
        let widget = widget.as_any().downcast_ref::<Widget>().unwrap();
        assert_eq!(
            widget.extra.as_ref().and_then(|v| v.as_str()),
            Some("plain")
        );
    }

    #[test]
    fn test_unknown_properties_are_skipped() {
        let widget = configure_widget(json!({"title": "T", "nope": 1}));
        let widget = widget.borrow();
        let widget = widget.as_any().downcast_ref::<Widget>().unwrap();
        assert_eq!(widget.title, "T");
    }

    #[test]
    fn test_non_assignable_value_is_silently_dropped() {
        let container = StubContainer::new();
        let widget = Rc::new(RefCell::new(Widget {
            count: 42,
            ..Widget::default()
        }));
        let target = Target::Component(widget.clone() as Rc<RefCell<dyn Configurable>>);
        let configurer = ObjectConfigurer::new(target, container, "widget");
        // a resolved string is not assignable to the Int-declared property
        configurer.inject_value("count", Value::Json(json!("not a number")));
        assert_eq!(
            widget.borrow().as_any().downcast_ref::<Widget>().unwrap().count,
            42
        );
    }

    #[test]
    fn test_reserved_names_are_normalized() {
        assert_eq!(normalize_property_name("title"), Some("title"));
        assert_eq!(normalize_property_name("*type"), None);
        assert_eq!(normalize_property_name("*factory"), None);
        assert_eq!(normalize_property_name("*extends"), None);
        // platform-qualified names strip down to plain property names
        assert_eq!(normalize_property_name("*rs-title"), Some("title"));
        // unless the plain name is itself an instantiation hint
        assert_eq!(normalize_property_name("*rs-type"), None);
    }

    #[test]
    fn test_platform_qualified_property_overrides() {
        let widget = configure_widget(json!({"*rs-title": "Qualified"}));
        let widget = widget.borrow();
        let widget = widget.as_any().downcast_ref::<Widget>().unwrap();
        assert_eq!(widget.title, "Qualified");
    }

    #[test]
    fn test_list_target_configured_in_index_order() {
        let container = StubContainer::new();
        let list: ListRef = Rc::new(RefCell::new(Vec::new()));
        let target = Target::List(Rc::clone(&list));
        ObjectConfigurer::new(target, container, "items")
            .configure_with(&Configuration::new(json!(["x", "y", "z"])));
        let list = list.borrow();
        let items: Vec<_> = list
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(items, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_map_target_entries() {
        let container = StubContainer::new();
        let map: MapRef = Rc::new(RefCell::new(HashMap::new()));
        let target = Target::Map(Rc::clone(&map));
        ObjectConfigurer::new(target, container, "entries")
            .configure_with(&Configuration::new(json!({"a": 1, "b": "two"})));
        let map = map.borrow();
        assert_eq!(map["a"].as_json(), Some(json!(1)));
        assert_eq!(map["b"].as_str(), Some("two"));
    }
}
