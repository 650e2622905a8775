use std::rc::Rc;

use crate::foundation::value::{ComponentRef, Value};

/// Identity-based map key for constructed objects.
///
/// Pending-reference and post-configuration bookkeeping must distinguish
/// object instances even when they compare equal by value, so keys are
/// derived from the address of the shared allocation backing the object
/// rather than from its content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ObjectKey(usize);

impl ObjectKey {
    /// Identity key for a component reference.
    pub fn of_component(component: &ComponentRef) -> Self {
        ObjectKey(Rc::as_ptr(component) as *const () as usize)
    }

    /// Identity key for a value, for value kinds that have identity. Plain
    /// data values carry value semantics only and yield no key.
    pub fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(component) => Some(Self::of_component(component)),
            Value::List(list) => Some(ObjectKey(Rc::as_ptr(list) as *const () as usize)),
            Value::Map(map) => Some(ObjectKey(Rc::as_ptr(map) as *const () as usize)),
            _ => None,
        }
    }
}
