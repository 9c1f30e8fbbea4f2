// Logical action definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A category of physical input hardware, each with its own binding catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceClass {
    Controller,
    Keyboard,
}

impl DeviceClass {
    /// All device classes, in declaration order
    pub const ALL: [DeviceClass; 2] = [DeviceClass::Controller, DeviceClass::Keyboard];

    /// Name used in persisted files and log output
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Controller => "Controller",
            DeviceClass::Keyboard => "Keyboard",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping label used to organize actions for display and rebinding
///
/// `Unset` only exists so callers can express "no category"; registering an
/// action with it is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Category {
    #[default]
    Unset,
    Movement,
    Interaction,
    Accessibility,
    Social,
    Menus,
}

impl Category {
    /// Every category an action may be stored under, in display order
    pub const ALL: [Category; 5] = [
        Category::Movement,
        Category::Interaction,
        Category::Accessibility,
        Category::Social,
        Category::Menus,
    ];

    pub fn is_unset(&self) -> bool {
        matches!(self, Category::Unset)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Unset => "Unset",
            Category::Movement => "Movement",
            Category::Interaction => "Interaction",
            Category::Accessibility => "Accessibility",
            Category::Social => "Social",
            Category::Menus => "Menus",
        };
        f.write_str(name)
    }
}

/// Whether an action exposes a 2-D value or a debounced button state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Value,
    Button,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Value => f.write_str("Value"),
            ValueKind::Button => f.write_str("Button"),
        }
    }
}

/// One rebindable action
///
/// Actions are only mutated through the registry by id; callers hold ids,
/// never copies of the action.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalAction {
    id: String,
    display_name: String,
    category: Category,
    kind: ValueKind,
    allow_rebind: bool,

    /// Symbolic binding (catalog key) per device class
    bindings: HashMap<DeviceClass, String>,
}

impl LogicalAction {
    pub(crate) fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: Category,
        kind: ValueKind,
        allow_rebind: bool,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category,
            kind,
            allow_rebind,
            bindings: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn allow_rebind(&self) -> bool {
        self.allow_rebind
    }

    /// The configured binding key for a device class, if any
    pub fn binding(&self, device_class: DeviceClass) -> Option<&str> {
        self.bindings.get(&device_class).map(String::as_str)
    }

    /// Whether a binding has been configured for a device class
    pub fn is_bound(&self, device_class: DeviceClass) -> bool {
        self.bindings.contains_key(&device_class)
    }

    /// Set the binding key for a device class, returning the previous one
    pub(crate) fn set_binding(
        &mut self,
        device_class: DeviceClass,
        key: impl Into<String>,
    ) -> Option<String> {
        self.bindings.insert(device_class, key.into())
    }

    /// Default catalog key used when no binding is configured for a device class
    pub fn default_binding(&self, device_class: DeviceClass) -> &'static str {
        match (self.kind, device_class) {
            (ValueKind::Value, DeviceClass::Keyboard) => "WASD",
            (ValueKind::Value, DeviceClass::Controller) => "LeftStick",
            (ValueKind::Button, DeviceClass::Keyboard) => "Alpha0",
            (ValueKind::Button, DeviceClass::Controller) => "A",
        }
    }

    /// The binding key in effect for a device class and whether it was configured
    pub fn effective_binding(&self, device_class: DeviceClass) -> (&str, bool) {
        match self.binding(device_class) {
            Some(key) => (key, true),
            None => (self.default_binding(device_class), false),
        }
    }
}
