// Action registry

use super::action::{Category, DeviceClass, LogicalAction, ValueKind};
use super::catalog::{Catalogs, DeviceCatalog};
use super::InputError;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

/// The set of registered logical actions, keyed by unique id
///
/// Actions keep their registration order, which drives tick processing and
/// the per-category layout shown by the UI.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    /// Actions in registration order
    actions: Vec<LogicalAction>,

    /// Action id -> index into `actions`
    index: HashMap<String, usize>,

    /// Category -> action ids in registration order
    by_category: HashMap<Category, Vec<String>>,

    /// Binding tables used to validate symbolic bindings
    catalogs: Catalogs,
}

impl ActionRegistry {
    /// Create an empty registry using the built-in catalogs
    pub fn new() -> Self {
        Self::with_catalogs(Catalogs::default())
    }

    /// Create an empty registry using custom catalogs
    pub fn with_catalogs(catalogs: Catalogs) -> Self {
        Self {
            actions: Vec::new(),
            index: HashMap::new(),
            by_category: HashMap::new(),
            catalogs,
        }
    }

    /// Register an action producing a 2-D value
    ///
    /// Value actions are never offered for interactive rebinding.
    pub fn register_value_action(
        &mut self,
        id: &str,
        display_name: &str,
        category: Category,
    ) -> Result<&LogicalAction, InputError> {
        self.register(LogicalAction::new(
            id,
            display_name,
            category,
            ValueKind::Value,
            false,
        ))
    }

    /// Register an action producing a debounced button state
    pub fn register_button_action(
        &mut self,
        id: &str,
        display_name: &str,
        category: Category,
        allow_rebind: bool,
    ) -> Result<&LogicalAction, InputError> {
        self.register(LogicalAction::new(
            id,
            display_name,
            category,
            ValueKind::Button,
            allow_rebind,
        ))
    }

    /// Register an action; an id that is already present returns the stored action unchanged
    fn register(&mut self, action: LogicalAction) -> Result<&LogicalAction, InputError> {
        if action.category().is_unset() {
            return Err(InputError::InvalidCategory(action.id().to_string()));
        }

        let index = match self.index.get(action.id()) {
            Some(&index) => {
                debug!("{} is already registered, keeping existing action", action.id());
                index
            }
            None => {
                let index = self.actions.len();
                self.index.insert(action.id().to_string(), index);
                self.by_category
                    .entry(action.category())
                    .or_default()
                    .push(action.id().to_string());
                info!("Registered {} action {}", action.kind(), action.id());
                self.actions.push(action);
                index
            }
        };

        Ok(&self.actions[index])
    }

    /// Look up an action by id
    pub fn get(&self, id: &str) -> Result<&LogicalAction, InputError> {
        self.index
            .get(id)
            .map(|&index| &self.actions[index])
            .ok_or_else(|| InputError::UnknownAction(id.to_string()))
    }

    /// Check if an action id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of registered actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All actions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &LogicalAction> {
        self.actions.iter()
    }

    /// Action ids grouped by category, in registration order
    ///
    /// Every storable category is present, even when empty.
    pub fn actions_by_category(
        &self,
        include_non_rebindable: bool,
    ) -> BTreeMap<Category, Vec<String>> {
        Category::ALL
            .iter()
            .map(|category| {
                let ids = self
                    .by_category
                    .get(category)
                    .map(|ids| {
                        ids.iter()
                            .filter(|id| {
                                include_non_rebindable
                                    || self.get(id).map(|a| a.allow_rebind()).unwrap_or(false)
                            })
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                (*category, ids)
            })
            .collect()
    }

    /// Set the symbolic binding of an action for a device class
    ///
    /// Returns the previously configured key, if any.
    pub fn set_binding(
        &mut self,
        id: &str,
        device_class: DeviceClass,
        key: &str,
    ) -> Result<Option<String>, InputError> {
        self.catalogs.get(device_class).validate(key)?;
        let index = *self
            .index
            .get(id)
            .ok_or_else(|| InputError::UnknownAction(id.to_string()))?;

        let previous = self.actions[index].set_binding(device_class, key);
        match &previous {
            Some(old) => warn!(
                "Overwriting {} binding for {} ({} -> {})",
                device_class, id, old, key
            ),
            None => info!("Adding {} binding for {} ({})", device_class, id, key),
        }
        Ok(previous)
    }

    /// Binding tables for every device class
    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Binding table for one device class
    pub fn catalog(&self, device_class: DeviceClass) -> &DeviceCatalog {
        self.catalogs.get(device_class)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
