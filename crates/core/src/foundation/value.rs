use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use url::Url;

use crate::config::conversions::Color;
use crate::config::Configuration;
use crate::container::pending::Pending;
use crate::foundation::traits::{Configurable, Resource};

/// Shared reference to a constructed component.
pub type ComponentRef = Rc<RefCell<dyn Configurable>>;

/// A value produced by configuration resolution and driven into object
/// properties during graph construction.
///
/// Values start out as raw JSON data and are progressively refined — wrapped
/// as child configurations, dereferenced into resources, converted into
/// scalars, or built out into components — as the object graph comes
/// together.
#[derive(Clone)]
pub enum Value {
    /// Raw configuration data.
    Json(Json),
    /// A child configuration.
    Config(Configuration),
    /// A resolver-produced resource handle.
    Resource(Rc<dyn Resource>),
    /// A converted date value.
    Date(DateTime<Utc>),
    /// A converted colour value.
    Color(Color),
    /// A converted external URL.
    Url(Url),
    /// Binary data.
    Data(Vec<u8>),
    /// A shared mutable list under construction.
    List(Rc<RefCell<Vec<Value>>>),
    /// A shared mutable keyed collection under construction.
    Map(Rc<RefCell<HashMap<String, Value>>>),
    /// A constructed component.
    Object(ComponentRef),
    /// A deferred reference to an object still under construction.
    Pending(Pending),
}

impl Value {
    /// Wrap a configurable component as a value.
    pub fn object(component: impl Configurable) -> Value {
        Value::Object(Rc::new(RefCell::new(component)))
    }

    /// The value's plain data view, for kinds that have one.
    pub fn as_json(&self) -> Option<Json> {
        match self {
            Value::Json(json) => Some(json.clone()),
            Value::Resource(resource) => Some(resource.as_json()),
            Value::Config(config) => Some(Json::Object(config.data().clone())),
            _ => None,
        }
    }

    /// The value as a string slice, when it is string data.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Json(Json::String(s)) => Some(s),
            _ => None,
        }
    }

    /// The value as a component reference, when it is one.
    pub fn as_component(&self) -> Option<&ComponentRef> {
        match self {
            Value::Object(component) => Some(component),
            _ => None,
        }
    }

    /// Short kind name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Json(_) => "json",
            Value::Config(_) => "configuration",
            Value::Resource(_) => "resource",
            Value::Date(_) => "date",
            Value::Color(_) => "color",
            Value::Url(_) => "url",
            Value::Data(_) => "data",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Pending(_) => "pending",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Json(json) => write!(f, "Json({})", json),
            Value::Config(config) => write!(f, "Config({:?})", config),
            Value::Resource(resource) => write!(f, "Resource({})", resource.uri()),
            Value::Date(date) => write!(f, "Date({})", date),
            Value::Color(color) => write!(f, "Color({})", color),
            Value::Url(url) => write!(f, "Url({})", url),
            Value::Data(bytes) => write!(f, "Data({} bytes)", bytes.len()),
            Value::List(list) => write!(f, "List(len: {})", list.borrow().len()),
            Value::Map(map) => write!(f, "Map(len: {})", map.borrow().len()),
            Value::Object(component) => match component.try_borrow() {
                Ok(component) => write!(f, "Object({})", component.type_tag()),
                Err(_) => write!(f, "Object(<in use>)"),
            },
            Value::Pending(pending) => write!(f, "{:?}", pending),
        }
    }
}
