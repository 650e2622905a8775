use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::container::configurer::ObjectConfigurer;
use crate::container::object_key::ObjectKey;
use crate::foundation::value::Value;

/// Placeholder for a named object still under construction.
///
/// When a named reference cannot resolve because its referent is mid-build,
/// a pending value is produced instead and travels through the injection
/// pipeline. At injection time the configurer records the target property
/// and itself on the pending and the container counts the reference; once
/// the referent finishes configuration, the container replays the deferred
/// injection through `complete`.
#[derive(Clone)]
pub struct Pending {
    state: Rc<RefCell<PendingState>>,
}

struct PendingState {
    awaiting: ObjectKey,
    property: Option<String>,
    injector: Option<ObjectConfigurer>,
}

impl Pending {
    /// Create a pending reference awaiting the object with the given
    /// identity.
    pub fn new(awaiting: ObjectKey) -> Self {
        Pending {
            state: Rc::new(RefCell::new(PendingState {
                awaiting,
                property: None,
                injector: None,
            })),
        }
    }

    /// Identity of the object this reference waits on.
    pub fn awaiting(&self) -> ObjectKey {
        self.state.borrow().awaiting
    }

    /// The property the resolved value will be injected into, once known.
    pub fn property(&self) -> Option<String> {
        self.state.borrow().property.clone()
    }

    /// Whether the deferred injection has been recorded.
    pub fn is_deferred(&self) -> bool {
        self.state.borrow().injector.is_some()
    }

    /// Record the property and configurer used to replay the injection.
    pub(crate) fn defer(&self, property: &str, injector: ObjectConfigurer) {
        let mut state = self.state.borrow_mut();
        state.property = Some(property.to_string());
        state.injector = Some(injector);
    }

    /// Replay the deferred injection with the now-configured value.
    pub fn complete(&self, value: Value) -> Option<Value> {
        let (property, injector) = {
            let state = self.state.borrow();
            (state.property.clone()?, state.injector.clone()?)
        };
        injector.inject_value(&property, value)
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        write!(
            f,
            "Pending(awaiting: {:?}, property: {:?})",
            state.awaiting, state.property
        )
    }
}
