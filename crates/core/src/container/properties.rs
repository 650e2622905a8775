use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::foundation::traits::Container;
use crate::foundation::value::{ComponentRef, Value};

/// Shared reference to a list under construction.
pub type ListRef = Rc<RefCell<Vec<Value>>>;
/// Shared reference to a keyed collection under construction.
pub type MapRef = Rc<RefCell<HashMap<String, Value>>>;

/// Declared type of a configurable property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyType {
    Bool,
    /// Numeric, narrowed to an integer before injection.
    Int,
    /// Numeric, narrowed to a float before injection.
    Float,
    String,
    Date,
    Color,
    Image,
    /// A nested configuration, injected without being built out.
    Config,
    /// Raw configuration data, injected without interpretation.
    Data,
    /// A list, with optional member-type info.
    List(Option<Box<PropertyType>>),
    /// A keyed collection, with optional member-type info.
    Map(Option<Box<PropertyType>>),
    /// A concrete component type, named by its type tag.
    Object(&'static str),
    /// Accepts a value of any type.
    Any,
}

impl PropertyType {
    /// Member-type info for collection properties, when declared.
    pub fn member(&self) -> Option<&PropertyType> {
        match self {
            PropertyType::List(member) | PropertyType::Map(member) => member.as_deref(),
            _ => None,
        }
    }

    /// Whether list-shaped data may be assigned. `Any` counts: an untyped
    /// property accepts collection data as-is.
    pub(crate) fn is_list_like(&self) -> bool {
        matches!(self, PropertyType::List(_) | PropertyType::Any)
    }

    pub(crate) fn is_map_like(&self) -> bool {
        matches!(self, PropertyType::Map(_))
    }

    /// Test whether a resolved value is assignable to this property type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (PropertyType::Any, _) => true,
            (PropertyType::Bool, Value::Json(Json::Bool(_))) => true,
            (PropertyType::Int | PropertyType::Float, Value::Json(Json::Number(_))) => true,
            (PropertyType::String, Value::Json(Json::String(_))) => true,
            (PropertyType::Date, Value::Date(_)) => true,
            (PropertyType::Color, Value::Color(_)) => true,
            (PropertyType::Image, Value::Data(_) | Value::Resource(_)) => true,
            (PropertyType::Config, Value::Config(_)) => true,
            (PropertyType::Data, Value::Json(_)) => true,
            (PropertyType::List(_), Value::List(_) | Value::Json(Json::Array(_))) => true,
            (PropertyType::Map(_), Value::Map(_) | Value::Json(Json::Object(_))) => true,
            (PropertyType::Object(type_tag), Value::Object(component)) => {
                let component = component.borrow();
                component.type_tag() == *type_tag || component.super_tags().contains(type_tag)
            }
            _ => false,
        }
    }
}

/// Descriptor for a configurable property: its name and declared type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: PropertyType,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        PropertyDescriptor {
            name: name.into(),
            ty,
        }
    }
}

/// The object a configurer drives values into.
#[derive(Clone)]
pub enum Target {
    /// A constructed component with a property table.
    Component(ComponentRef),
    /// A list under construction.
    List(ListRef),
    /// A keyed collection under construction.
    Map(MapRef),
    /// The container itself, treated as a collection of named objects.
    Container(Rc<dyn Container>),
}

impl Target {
    /// View the target as a value, for hooks and identity bookkeeping.
    /// The container target has no value form.
    pub fn as_value(&self) -> Option<Value> {
        match self {
            Target::Component(component) => Some(Value::Object(Rc::clone(component))),
            Target::List(list) => Some(Value::List(Rc::clone(list))),
            Target::Map(map) => Some(Value::Map(Rc::clone(map))),
            Target::Container(_) => None,
        }
    }

    /// Derive a target from a value; only components and collections can be
    /// driven by a configurer.
    pub fn from_value(value: &Value) -> Option<Target> {
        match value {
            Value::Object(component) => Some(Target::Component(Rc::clone(component))),
            Value::List(list) => Some(Target::List(Rc::clone(list))),
            Value::Map(map) => Some(Target::Map(Rc::clone(map))),
            _ => None,
        }
    }
}

/// How a resolved property reaches its storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Access {
    /// A declared property, reached through the target's property table.
    Declared,
    /// A keyed entry of a collection target.
    Entry,
    /// An entry backed by the container's named-object registry.
    Named,
}

/// A get/set-capable handle on a single property of a target.
///
/// Generalizes over declared component properties, map-entry-backed
/// pseudo-properties of collection targets, and the container's named-object
/// entries. Get and set fail silently rather than raise.
pub(crate) struct Property {
    descriptor: PropertyDescriptor,
    access: Access,
}

impl Property {
    /// Resolve the property handle for a named property of a target. For
    /// collection targets the descriptor takes the collection's member-type
    /// hint; for the container, named-object entries are the fallback when
    /// no declared container property matches.
    pub(crate) fn of(
        target: &Target,
        name: &str,
        member_hint: Option<&PropertyType>,
    ) -> Option<Property> {
        match target {
            Target::Component(component) => component
                .borrow()
                .property(name)
                .map(|descriptor| Property {
                    descriptor,
                    access: Access::Declared,
                }),
            Target::List(_) | Target::Map(_) => Some(Property {
                descriptor: PropertyDescriptor::new(
                    name,
                    member_hint.cloned().unwrap_or(PropertyType::Any),
                ),
                access: Access::Entry,
            }),
            Target::Container(container) => match container.property(name) {
                Some(descriptor) => Some(Property {
                    descriptor,
                    access: Access::Declared,
                }),
                None => Some(Property {
                    descriptor: PropertyDescriptor::new(name, PropertyType::Any),
                    access: Access::Named,
                }),
            },
        }
    }

    pub(crate) fn ty(&self) -> &PropertyType {
        &self.descriptor.ty
    }

    /// Current value of the property, if readable.
    pub(crate) fn get(&self, target: &Target) -> Option<Value> {
        match (self.access, target) {
            (Access::Declared, Target::Component(component)) => {
                component.borrow().get_property(&self.descriptor.name)
            }
            (Access::Declared, Target::Container(container)) => {
                container.get_property(&self.descriptor.name)
            }
            (Access::Entry, Target::Map(map)) => {
                map.borrow().get(&self.descriptor.name).cloned()
            }
            (Access::Entry, Target::List(list)) => self
                .descriptor
                .name
                .parse::<usize>()
                .ok()
                .and_then(|index| list.borrow().get(index).cloned()),
            (Access::Named, Target::Container(container)) => {
                container.get_named(&self.descriptor.name)
            }
            _ => None,
        }
    }

    /// Set the property. Returns false when the value cannot be written.
    pub(crate) fn set(&self, target: &Target, value: Value) -> bool {
        match (self.access, target) {
            (Access::Declared, Target::Component(component)) => component
                .borrow_mut()
                .set_property(&self.descriptor.name, value),
            (Access::Declared, Target::Container(container)) => {
                container.set_property(&self.descriptor.name, value)
            }
            (Access::Entry, Target::Map(map)) => {
                map.borrow_mut().insert(self.descriptor.name.clone(), value);
                true
            }
            (Access::Entry, Target::List(list)) => {
                let Ok(index) = self.descriptor.name.parse::<usize>() else {
                    return false;
                };
                let mut list = list.borrow_mut();
                if index < list.len() {
                    list[index] = value;
                } else {
                    // pad sparse writes so the entry lands at its index
                    while list.len() < index {
                        list.push(Value::Json(Json::Null));
                    }
                    list.push(value);
                }
                true
            }
            (Access::Named, Target::Container(container)) => {
                container.set_named(&self.descriptor.name, value);
                true
            }
            _ => false,
        }
    }
}
