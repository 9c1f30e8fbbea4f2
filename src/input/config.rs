// Per-player physical action maps

use super::action::DeviceClass;
use super::catalog::{ApplyOutcome, CompositeAssembly, ControlPath};
use super::registry::ActionRegistry;
use super::PlayerId;
use glam::Vec2;
use log::{debug, error, info};
use std::collections::HashMap;

/// Source of raw per-control samples, supplied by the host's polling layer
pub trait ControlSampler {
    /// Analog magnitude of a physical control for a player (0.0 when idle)
    fn sample(&self, player: PlayerId, path: &ControlPath) -> f32;
}

impl<F> ControlSampler for F
where
    F: Fn(PlayerId, &ControlPath) -> f32,
{
    fn sample(&self, player: PlayerId, path: &ControlPath) -> f32 {
        self(player, path)
    }
}

/// A physical control attached to an action
#[derive(Debug, Clone, PartialEq)]
pub enum BoundControl {
    Simple(ControlPath),
    Composite(CompositeAssembly),
}

impl BoundControl {
    /// Every physical path this control reads
    pub fn paths(&self) -> Vec<&ControlPath> {
        match self {
            BoundControl::Simple(path) => vec![path],
            BoundControl::Composite(assembly) => assembly.paths().collect(),
        }
    }

    /// Evaluate the control for one player
    pub fn evaluate(&self, player: PlayerId, sampler: &dyn ControlSampler) -> Vec2 {
        match self {
            BoundControl::Simple(path) => Vec2::new(sampler.sample(player, path), 0.0),
            BoundControl::Composite(assembly) => {
                assembly.evaluate(|path| sampler.sample(player, path))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ActionSlot {
    controls: Vec<BoundControl>,
    enabled: bool,
}

impl Default for ActionSlot {
    fn default() -> Self {
        Self {
            controls: Vec::new(),
            enabled: true,
        }
    }
}

/// Physical bindings of every action for one player and device class
#[derive(Debug, Clone)]
pub struct ActionMap {
    device_class: DeviceClass,

    /// Action ids in the order they were added
    order: Vec<String>,

    /// Action id -> bound controls and enabled flag
    slots: HashMap<String, ActionSlot>,

    /// Reverse mapping for quick lookups (path -> actions reading it)
    path_to_actions: HashMap<ControlPath, Vec<String>>,
}

impl ActionMap {
    /// Create an empty map
    pub fn new(device_class: DeviceClass) -> Self {
        Self {
            device_class,
            order: Vec::new(),
            slots: HashMap::new(),
            path_to_actions: HashMap::new(),
        }
    }

    /// Build a map with every registered action bound for a device class
    ///
    /// Actions without a configured binding get the default key and start
    /// disabled. A key that fails to apply is logged and skipped so one bad
    /// action never blocks the rest.
    pub fn build(registry: &ActionRegistry, device_class: DeviceClass) -> Self {
        let catalog = registry.catalog(device_class);
        let mut map = Self::new(device_class);

        for action in registry.iter() {
            let (key, configured) = action.effective_binding(device_class);
            if !configured {
                debug!("Applying default binding {} for {}", key, action.id());
            }
            map.ensure(action.id());
            match catalog.apply(key, action.id(), &mut map) {
                Ok(ApplyOutcome::Applied) => {}
                Ok(ApplyOutcome::Skipped(diagnostic)) => {
                    debug!("Skipped binding for {}: {:?}", action.id(), diagnostic);
                }
                Err(e) => error!("Failed to apply binding for {}: {}", action.id(), e),
            }
            map.set_enabled(action.id(), configured);
        }

        info!(
            "Built {} action map with {} actions",
            device_class,
            map.order.len()
        );
        map
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    fn ensure(&mut self, action: &str) -> &mut ActionSlot {
        if !self.slots.contains_key(action) {
            self.order.push(action.to_string());
        }
        self.slots.entry(action.to_string()).or_default()
    }

    fn index_paths(&mut self, action: &str, control: &BoundControl) {
        for path in control.paths() {
            let actions = self.path_to_actions.entry(path.clone()).or_default();
            if !actions.iter().any(|a| a == action) {
                actions.push(action.to_string());
            }
        }
    }

    fn unindex_paths(&mut self, action: &str, controls: &[BoundControl]) {
        for control in controls {
            for path in control.paths() {
                if let Some(actions) = self.path_to_actions.get_mut(path) {
                    actions.retain(|a| a != action);
                    if actions.is_empty() {
                        self.path_to_actions.remove(path);
                    }
                }
            }
        }
    }

    /// Attach a control to an action
    pub fn add_control(&mut self, action: &str, control: BoundControl) {
        self.index_paths(action, &control);
        self.ensure(action).controls.push(control);
    }

    /// Replace every control of an action, returning the previous controls
    pub fn replace_controls(
        &mut self,
        action: &str,
        controls: Vec<BoundControl>,
    ) -> Vec<BoundControl> {
        let previous = std::mem::take(&mut self.ensure(action).controls);
        self.unindex_paths(action, &previous);
        for control in &controls {
            self.index_paths(action, control);
        }
        self.ensure(action).controls = controls;
        previous
    }

    /// Controls bound to an action
    pub fn controls(&self, action: &str) -> &[BoundControl] {
        self.slots
            .get(action)
            .map(|slot| slot.controls.as_slice())
            .unwrap_or_default()
    }

    /// Number of controls bound to an action
    pub fn binding_count(&self, action: &str) -> usize {
        self.controls(action).len()
    }

    /// Every physical path read by an action
    pub fn paths(&self, action: &str) -> Vec<&ControlPath> {
        self.controls(action)
            .iter()
            .flat_map(|control| control.paths())
            .collect()
    }

    /// Actions reading a physical path
    pub fn actions_for_path(&self, path: &ControlPath) -> &[String] {
        self.path_to_actions
            .get(path)
            .map(|actions| actions.as_slice())
            .unwrap_or_default()
    }

    /// Check if a physical path is bound to any action
    pub fn is_bound(&self, path: &ControlPath) -> bool {
        self.path_to_actions.contains_key(path)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.slots.contains_key(action)
    }

    /// Action ids in the order they were added
    pub fn action_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Whether an action is enabled (unknown actions are disabled)
    pub fn is_enabled(&self, action: &str) -> bool {
        self.slots.get(action).map(|slot| slot.enabled).unwrap_or(false)
    }

    /// Enable or disable an action, returning the previous flag
    pub fn set_enabled(&mut self, action: &str, enabled: bool) -> Option<bool> {
        self.slots
            .get_mut(action)
            .map(|slot| std::mem::replace(&mut slot.enabled, enabled))
    }

    /// Current value of an action for a player
    ///
    /// Disabled actions read as zero. With several controls bound, the one
    /// with the greatest magnitude wins.
    pub fn read(&self, action: &str, player: PlayerId, sampler: &dyn ControlSampler) -> Vec2 {
        let Some(slot) = self.slots.get(action) else {
            return Vec2::ZERO;
        };
        if !slot.enabled {
            return Vec2::ZERO;
        }
        slot.controls
            .iter()
            .map(|control| control.evaluate(player, sampler))
            .fold(Vec2::ZERO, |best, value| {
                if value.length_squared() > best.length_squared() {
                    value
                } else {
                    best
                }
            })
    }

    /// Read every action in the map for a player
    pub fn sample_all(&self, player: PlayerId, sampler: &dyn ControlSampler) -> HashMap<String, Vec2> {
        self.order
            .iter()
            .map(|action| (action.clone(), self.read(action, player, sampler)))
            .collect()
    }
}

/// Action maps for every player, one per player for its current device class
#[derive(Debug, Default)]
pub struct PlayerBindings {
    maps: HashMap<PlayerId, ActionMap>,
}

impl PlayerBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a player's map
    pub fn get(&self, player: PlayerId) -> Option<&ActionMap> {
        self.maps.get(&player)
    }

    /// Get a mutable reference to a player's map
    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut ActionMap> {
        self.maps.get_mut(&player)
    }

    /// Make sure a player has a map for a device class
    ///
    /// Returns true when a map was (re)built, i.e. the player is new or
    /// switched device class.
    pub fn ensure(
        &mut self,
        player: PlayerId,
        device_class: DeviceClass,
        registry: &ActionRegistry,
    ) -> bool {
        match self.maps.get(&player) {
            Some(map) if map.device_class() == device_class => false,
            _ => {
                info!("Building {} bindings for player {}", device_class, player);
                self.maps
                    .insert(player, ActionMap::build(registry, device_class));
                true
            }
        }
    }

    /// Drop maps for players not in the active set
    pub fn retain_players(&mut self, active: &[PlayerId]) {
        self.maps.retain(|player, _| active.contains(player));
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::action::Category;
    use approx::assert_relative_eq;

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry
            .register_value_action("Move", "Move", Category::Movement)
            .unwrap();
        registry
            .register_button_action("Jump", "Jump", Category::Movement, true)
            .unwrap();
        registry
            .set_binding("Move", DeviceClass::Keyboard, "WASD")
            .unwrap();
        registry
            .set_binding("Jump", DeviceClass::Keyboard, "Space")
            .unwrap();
        registry
    }

    fn pressed<'a>(paths: &'a [&'a str]) -> impl Fn(PlayerId, &ControlPath) -> f32 + 'a {
        move |_: PlayerId, path: &ControlPath| {
            if paths.contains(&path.as_str()) {
                1.0
            } else {
                0.0
            }
        }
    }

    #[test]
    fn test_build_applies_configured_bindings() {
        let map = ActionMap::build(&registry(), DeviceClass::Keyboard);

        assert!(map.is_enabled("Move"));
        assert!(map.is_enabled("Jump"));
        assert_eq!(map.paths("Jump"), vec![&ControlPath::from("<Keyboard>/space")]);
        assert_eq!(map.paths("Move").len(), 4);
    }

    #[test]
    fn test_build_defaults_start_disabled() {
        let map = ActionMap::build(&registry(), DeviceClass::Controller);

        assert!(!map.is_enabled("Jump"));
        assert!(!map.is_enabled("Move"));
        assert_eq!(
            map.paths("Jump"),
            vec![&ControlPath::from("<Gamepad>/buttonSouth")]
        );
    }

    #[test]
    fn test_action_order_follows_registry() {
        let map = ActionMap::build(&registry(), DeviceClass::Keyboard);
        let ids: Vec<_> = map.action_ids().collect();
        assert_eq!(ids, vec!["Move", "Jump"]);
    }

    #[test]
    fn test_reverse_lookup() {
        let map = ActionMap::build(&registry(), DeviceClass::Keyboard);
        let w = ControlPath::from("<Keyboard>/w");

        assert!(map.is_bound(&w));
        assert_eq!(map.actions_for_path(&w), &["Move".to_string()]);
        assert!(!map.is_bound(&ControlPath::from("<Keyboard>/q")));
    }

    #[test]
    fn test_replace_controls_updates_reverse_mapping() {
        let mut map = ActionMap::build(&registry(), DeviceClass::Keyboard);
        let space = ControlPath::from("<Keyboard>/space");
        let e = ControlPath::from("<Keyboard>/e");

        let previous = map.replace_controls("Jump", vec![BoundControl::Simple(e.clone())]);

        assert_eq!(previous, vec![BoundControl::Simple(space.clone())]);
        assert!(!map.is_bound(&space));
        assert_eq!(map.actions_for_path(&e), &["Jump".to_string()]);
    }

    #[test]
    fn test_set_enabled_returns_previous() {
        let mut map = ActionMap::build(&registry(), DeviceClass::Keyboard);
        assert_eq!(map.set_enabled("Jump", false), Some(true));
        assert_eq!(map.set_enabled("Jump", false), Some(false));
        assert_eq!(map.set_enabled("Nope", true), None);
        assert!(!map.is_enabled("Nope"));
    }

    #[test]
    fn test_read_composite_and_simple() {
        let map = ActionMap::build(&registry(), DeviceClass::Keyboard);
        let sampler = pressed(&["<Keyboard>/w", "<Keyboard>/d", "<Keyboard>/space"]);

        let movement = map.read("Move", 0, &sampler);
        assert_relative_eq!(movement.length(), 1.0, epsilon = 1e-6);
        assert!(movement.x > 0.0 && movement.y > 0.0);

        assert_eq!(map.read("Jump", 0, &sampler), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_disabled_action_reads_zero() {
        let mut map = ActionMap::build(&registry(), DeviceClass::Keyboard);
        map.set_enabled("Jump", false);
        let sampler = pressed(&["<Keyboard>/space"]);
        assert_eq!(map.read("Jump", 0, &sampler), Vec2::ZERO);
    }

    #[test]
    fn test_greatest_magnitude_wins() {
        let mut map = ActionMap::new(DeviceClass::Controller);
        map.add_control("Throttle", BoundControl::Simple("<Gamepad>/leftTrigger".into()));
        map.add_control("Throttle", BoundControl::Simple("<Gamepad>/rightTrigger".into()));

        let sampler = |_: PlayerId, path: &ControlPath| match path.as_str() {
            "<Gamepad>/leftTrigger" => 0.3,
            "<Gamepad>/rightTrigger" => 0.8,
            _ => 0.0,
        };
        assert_eq!(map.read("Throttle", 0, &sampler), Vec2::new(0.8, 0.0));
    }

    #[test]
    fn test_player_bindings_rebuild_on_class_change() {
        let registry = registry();
        let mut bindings = PlayerBindings::new();

        assert!(bindings.ensure(1, DeviceClass::Keyboard, &registry));
        assert!(!bindings.ensure(1, DeviceClass::Keyboard, &registry));
        assert!(bindings.ensure(1, DeviceClass::Controller, &registry));
        assert_eq!(
            bindings.get(1).unwrap().device_class(),
            DeviceClass::Controller
        );

        bindings.ensure(2, DeviceClass::Keyboard, &registry);
        bindings.retain_players(&[2]);
        assert!(bindings.get(1).is_none());
        assert_eq!(bindings.len(), 1);
    }
}
