//! Opaque host objects
//!
//! Host objects carry property descriptors and a prototype link, the same way
//! a browser exposes DOM nodes or windows. Properties may be accessors whose
//! getters run arbitrary code, so readers must check descriptors first.

use super::{CallResult, ErrorValue, Value};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type Getter = Rc<dyn Fn() -> CallResult>;
pub type Setter = Rc<dyn Fn(&Value) -> Result<(), Value>>;

/// Where a property's value comes from.
#[derive(Clone)]
pub enum PropertySlot {
    Data(Value),
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
}

impl fmt::Debug for PropertySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertySlot::Data(value) => f.debug_tuple("Data").field(value).finish(),
            PropertySlot::Accessor { get, set } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub slot: PropertySlot,
    pub enumerable: bool,
    pub configurable: bool,
    pub writable: bool,
}

impl PropertyDescriptor {
    /// An enumerable, configurable, writable data property.
    pub fn data(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            slot: PropertySlot::Data(value.into()),
            enumerable: true,
            configurable: true,
            writable: true,
        }
    }

    /// An enumerable, configurable accessor property.
    pub fn accessor(name: impl Into<String>, get: Option<Getter>, set: Option<Setter>) -> Self {
        Self {
            name: name.into(),
            slot: PropertySlot::Accessor { get, set },
            enumerable: true,
            configurable: true,
            writable: false,
        }
    }

    pub fn non_configurable(mut self) -> Self {
        self.configurable = false;
        self
    }

    pub fn non_enumerable(mut self) -> Self {
        self.enumerable = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }
}

struct HostInner {
    class: String,
    properties: RefCell<Vec<PropertyDescriptor>>,
    prototype: RefCell<Option<HostObject>>,
    /// Marks the `Object.prototype` equivalent that ends every chain
    prototype_root: bool,
    internal: Option<Rc<dyn Any>>,
}

/// A reference-counted host object. Clones share identity.
#[derive(Clone)]
pub struct HostObject(Rc<HostInner>);

impl HostObject {
    pub fn new(class: impl Into<String>) -> Self {
        Self::build(class.into(), false, None)
    }

    /// A host object carrying a hidden native slot, readable with
    /// [`HostObject::internal`] but invisible to property enumeration.
    pub fn with_internal(class: impl Into<String>, internal: Rc<dyn Any>) -> Self {
        Self::build(class.into(), false, Some(internal))
    }

    /// A fresh root prototype. Lookups stop when they reach it.
    pub fn object_prototype() -> Self {
        Self::build("Object".to_string(), true, None)
    }

    fn build(class: String, prototype_root: bool, internal: Option<Rc<dyn Any>>) -> Self {
        Self(Rc::new(HostInner {
            class,
            properties: RefCell::new(Vec::new()),
            prototype: RefCell::new(None),
            prototype_root,
            internal,
        }))
    }

    pub fn class(&self) -> &str {
        &self.0.class
    }

    pub fn is_prototype_root(&self) -> bool {
        self.0.prototype_root
    }

    pub fn internal<T: 'static>(&self) -> Option<&T> {
        self.0.internal.as_ref()?.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Define or redefine an own property.
    pub fn define(&self, descriptor: PropertyDescriptor) -> &Self {
        {
            let mut properties = self.0.properties.borrow_mut();
            match properties.iter_mut().find(|p| p.name == descriptor.name) {
                Some(existing) => *existing = descriptor,
                None => properties.push(descriptor),
            }
        }
        self
    }

    pub fn set_prototype(&self, prototype: Option<HostObject>) -> &Self {
        *self.0.prototype.borrow_mut() = prototype;
        self
    }

    pub fn prototype(&self) -> Option<HostObject> {
        self.0.prototype.borrow().clone()
    }

    pub fn own_property(&self, name: &str) -> Option<PropertyDescriptor> {
        self.0
            .properties
            .borrow()
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    pub fn own_property_names(&self) -> Vec<String> {
        self.0
            .properties
            .borrow()
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    /// This object followed by its ancestors, stopping before the root
    /// prototype. A prototype cycle ends the walk at the first repeat.
    fn chain(&self) -> Vec<HostObject> {
        let mut chain = vec![self.clone()];
        let mut next = self.prototype();
        while let Some(proto) = next {
            if proto.is_prototype_root() || chain.iter().any(|seen| seen.ptr_eq(&proto)) {
                break;
            }
            next = proto.prototype();
            chain.push(proto);
        }
        chain
    }

    /// Names visited by a `for ... in` loop: own enumerable properties first,
    /// then inherited ones. A name shadowed lower in the chain is reported
    /// once, and not at all if the shadowing property is non-enumerable.
    pub fn enumerable_keys(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut keys = Vec::new();
        for object in self.chain() {
            for property in object.0.properties.borrow().iter() {
                if seen.contains(&property.name) {
                    continue;
                }
                seen.push(property.name.clone());
                if property.enumerable {
                    keys.push(property.name.clone());
                }
            }
        }
        keys
    }

    /// Find the descriptor that owns `name`, walking up the prototype chain.
    pub fn find_property(&self, name: &str) -> Option<PropertyDescriptor> {
        self.chain()
            .iter()
            .find_map(|object| object.own_property(name))
    }

    /// Read a property, running its getter if it has one.
    pub fn get(&self, name: &str) -> CallResult {
        match self.find_property(name).map(|p| p.slot) {
            Some(PropertySlot::Data(value)) => Ok(value),
            Some(PropertySlot::Accessor { get: Some(get), .. }) => get(),
            Some(PropertySlot::Accessor { get: None, .. }) | None => Ok(Value::Undefined),
        }
    }

    /// Assign a property, running its setter if it has one.
    pub fn set(&self, name: &str, value: Value) -> Result<(), Value> {
        match self.find_property(name) {
            Some(PropertyDescriptor {
                slot: PropertySlot::Accessor { set: Some(set), .. },
                ..
            }) => set(&value),
            Some(PropertyDescriptor {
                slot: PropertySlot::Accessor { set: None, .. },
                ..
            }) => Err(Value::Error(ErrorValue::type_error(format!(
                "setting getter-only property \"{name}\""
            )))),
            Some(descriptor) if !descriptor.writable => Err(Value::Error(
                ErrorValue::type_error(format!("\"{name}\" is read-only")),
            )),
            _ => {
                let own = self.own_property(name);
                let descriptor = match own {
                    Some(mut existing) => {
                        existing.slot = PropertySlot::Data(value);
                        existing
                    }
                    None => PropertyDescriptor::data(name, value),
                };
                self.define(descriptor);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Properties may point back at this object, so only the class is shown.
        f.debug_struct("HostObject")
            .field("class", &self.0.class)
            .finish_non_exhaustive()
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn inherited_properties_resolve_through_the_chain() {
        let root = HostObject::object_prototype();
        let proto = HostObject::new("NodePrototype");
        proto.define(PropertyDescriptor::data("nodeType", 9));
        proto.set_prototype(Some(root));
        let node = HostObject::new("HTMLDocument");
        node.define(PropertyDescriptor::data("title", "Test"));
        node.set_prototype(Some(proto));

        assert_eq!(node.enumerable_keys(), ["title", "nodeType"]);
        assert_eq!(node.get("nodeType").unwrap(), Value::Number(9.0));
        assert!(node.own_property("nodeType").is_none());
    }

    #[test]
    fn shadowing_non_enumerable_hides_inherited_key() {
        let proto = HostObject::new("Proto");
        proto.define(PropertyDescriptor::data("hidden", 1));
        let object = HostObject::new("Thing");
        object.define(PropertyDescriptor::data("hidden", 2).non_enumerable());
        object.set_prototype(Some(proto));

        assert!(object.enumerable_keys().is_empty());
        assert_eq!(object.get("hidden").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn prototype_cycle_terminates() {
        let a = HostObject::new("A");
        let b = HostObject::new("B");
        a.set_prototype(Some(b.clone()));
        b.set_prototype(Some(a.clone()));
        a.define(PropertyDescriptor::data("x", 1));

        assert_eq!(a.enumerable_keys(), ["x"]);
        assert!(a.find_property("missing").is_none());
    }

    #[test]
    fn accessors_run_on_get_and_set() {
        let stored = Rc::new(Cell::new(0.0));
        let read = stored.clone();
        let write = stored.clone();
        let object = HostObject::new("Settings");
        object.define(PropertyDescriptor::accessor(
            "level",
            Some(Rc::new(move || -> CallResult { Ok(Value::Number(read.get())) })),
            Some(Rc::new(move |value: &Value| -> Result<(), Value> {
                write.set(value.as_number().unwrap_or_default());
                Ok(())
            })),
        ));

        object.set("level", Value::Number(4.0)).unwrap();
        assert_eq!(stored.get(), 4.0);
        assert_eq!(object.get("level").unwrap(), Value::Number(4.0));
    }

    #[test]
    fn getter_only_property_rejects_assignment() {
        let object = HostObject::new("Thing");
        object.define(PropertyDescriptor::accessor(
            "id",
            Some(Rc::new(|| -> CallResult { Ok(Value::from("x")) })),
            None,
        ));
        assert!(object.set("id", Value::Null).is_err());
    }

    #[test]
    fn internal_slot_downcasts() {
        let object = HostObject::with_internal("Native", Rc::new(42u32));
        assert_eq!(object.internal::<u32>(), Some(&42));
        assert_eq!(object.internal::<String>(), None);
        assert!(object.own_property_names().is_empty());
    }
}
