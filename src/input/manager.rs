// Input context - coordinates registry, bindings, state, persistence and rebinding

use super::action::{Category, DeviceClass};
use super::config::{ActionMap, ControlSampler, PlayerBindings};
use super::persist::ProfileStore;
use super::player::ActionStateCache;
use super::rebind::{PollEvent, RebindNegotiator, RebindRequest, RebindResult};
use super::registry::ActionRegistry;
use super::roster::{PlayerInfo, RosterProvider, RosterWatch};
use super::state::ButtonState;
use super::{InputError, PlayerId};
use crate::settings::Settings;
use glam::Vec2;
use log::{error, info};
use std::collections::BTreeMap;

/// The single context object owning every piece of input state
///
/// Construct once at startup, register actions, then call [`InputContext::tick`]
/// once per frame.
pub struct InputContext {
    settings: Settings,

    /// Registered actions and their symbolic bindings
    registry: ActionRegistry,

    /// Physical action map for each player
    bindings: PlayerBindings,

    /// Debounced state for each player
    cache: ActionStateCache,

    /// Persisted enabled flags per profile
    store: ProfileStore,

    /// Detects roster changes that force a store reload
    roster: RosterWatch,

    negotiator: RebindNegotiator,

    /// Roster as seen on the last tick
    players: Vec<PlayerInfo>,
}

impl InputContext {
    /// Create a context with an empty registry
    pub fn new(settings: Settings) -> Self {
        let store = ProfileStore::new(settings.store_path());
        let negotiator = RebindNegotiator::new(settings.rebind.clone());
        info!("Profile store at {}", store.path().display());

        Self {
            settings,
            registry: ActionRegistry::new(),
            bindings: PlayerBindings::new(),
            cache: ActionStateCache::new(),
            store,
            roster: RosterWatch::new(),
            negotiator,
            players: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Mutable registry, for registering actions and configuring bindings at startup
    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn cache(&self) -> &ActionStateCache {
        &self.cache
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Roster as seen on the last tick
    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    /// A player's physical action map
    pub fn action_map(&self, player: PlayerId) -> Result<&ActionMap, InputError> {
        self.bindings
            .get(player)
            .ok_or(InputError::UnknownPlayer(player))
    }

    /// Run one frame
    ///
    /// Rebinds of players that left or switched device class are cancelled
    /// first. A roster change reloads the store; new players and players that
    /// switched device class get a rebuilt map with stored flags re-applied.
    /// Players are then updated in roster order, or reset to neutral when
    /// unfocused or without a usable device.
    pub fn tick(&mut self, roster: &dyn RosterProvider, sampler: &dyn ControlSampler, focused: bool) {
        let players = roster.players();
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();

        // Open rebinds end when their player leaves or switches device class
        for (player, device_class) in self.negotiator.session_owners() {
            let current = players
                .iter()
                .find(|p| p.id == player)
                .and_then(|p| p.device_class());
            if current != Some(device_class) {
                let cancelled = self.negotiator.cancel_for_player(player, &mut self.bindings);
                info!(
                    "Player {} no longer uses {}, cancelled rebinds {:?}",
                    player, device_class, cancelled
                );
            }
        }

        let roster_changed = self.roster.is_changed(&ids, true);
        if roster_changed {
            info!("Roster changed ({} players), reloading profiles", ids.len());
            self.bindings.retain_players(&ids);
            self.cache.retain_players(&ids);
            self.store.load();
        }

        let mut rebuilt = false;
        for player in &players {
            if let Some(device_class) = player.device_class() {
                rebuilt |= self.bindings.ensure(player.id, device_class, &self.registry);
            }
        }
        if rebuilt && !roster_changed {
            self.store.load();
        }
        if rebuilt || roster_changed {
            self.store.apply(&players, &mut self.bindings);
            self.negotiator.hold_targets_disabled(&mut self.bindings);
        }

        for player in &players {
            let map = self
                .bindings
                .get(player.id)
                .filter(|map| Some(map.device_class()) == player.device_class());
            match map {
                Some(map) if focused => {
                    let samples = map.sample_all(player.id, sampler);
                    self.cache.update(&self.registry, player.id, &samples);
                }
                _ => self.cache.set_neutral(&self.registry, player.id),
            }
        }

        self.players = players;
    }

    /// Current state of a button-kind action
    pub fn button_state(&self, player: PlayerId, action: &str) -> Result<ButtonState, InputError> {
        self.cache.button_state(&self.registry, player, action)
    }

    /// Current value of a value-kind action
    pub fn value_state(&self, player: PlayerId, action: &str) -> Result<Vec2, InputError> {
        self.cache.value_state(&self.registry, player, action)
    }

    /// Button state of an action for every player
    pub fn button_states(&self, action: &str) -> Result<Vec<(PlayerId, ButtonState)>, InputError> {
        self.cache.button_states(&self.registry, action)
    }

    /// Value of an action for every player
    pub fn value_states(&self, action: &str) -> Result<Vec<(PlayerId, Vec2)>, InputError> {
        self.cache.value_states(&self.registry, action)
    }

    /// Mark a press as handled
    pub fn consume(&mut self, player: PlayerId, action: &str) -> Result<(), InputError> {
        self.cache.consume(&self.registry, player, action)
    }

    /// Action ids per category, for the UI
    pub fn actions_by_category(&self, include_non_rebindable: bool) -> BTreeMap<Category, Vec<String>> {
        self.registry.actions_by_category(include_non_rebindable)
    }

    /// Whether an action is enabled for a player's current device class
    pub fn action_enabled(&self, player: PlayerId, action: &str) -> Result<bool, InputError> {
        self.registry.get(action)?;
        Ok(self.action_map(player)?.is_enabled(action))
    }

    /// Device class of a player's current map
    pub fn device_class(&self, player: PlayerId) -> Result<DeviceClass, InputError> {
        Ok(self.action_map(player)?.device_class())
    }

    /// Enable or disable an action for a player, optionally saving profiles
    pub fn set_action_enabled(
        &mut self,
        player: PlayerId,
        action: &str,
        enabled: bool,
        save: bool,
    ) -> Result<(), InputError> {
        self.registry.get(action)?;
        self.bindings
            .get_mut(player)
            .ok_or(InputError::UnknownPlayer(player))?
            .set_enabled(action, enabled);
        if save {
            self.save_profiles();
        }
        Ok(())
    }

    /// Disable an action and save
    pub fn unbind(&mut self, player: PlayerId, action: &str) -> Result<(), InputError> {
        self.set_action_enabled(player, action, false, true)
    }

    /// Start capturing a new control for an action, from the player's active device
    pub fn begin_rebind(&mut self, player: PlayerId, action: &str) -> Result<(), InputError> {
        let device = self
            .players
            .iter()
            .find(|p| p.id == player)
            .and_then(|p| p.device)
            .ok_or(InputError::UnknownPlayer(player))?;

        self.negotiator.begin(
            RebindRequest {
                player,
                action: action.to_string(),
                device,
            },
            &self.registry,
            &mut self.bindings,
        )
    }

    /// Feed a polling event to an action's rebind session; saves on success
    pub fn advance_rebind(
        &mut self,
        action: &str,
        event: &PollEvent,
    ) -> Result<Vec<RebindResult>, InputError> {
        let results =
            self.negotiator
                .advance(action, event, &mut self.registry, &mut self.bindings)?;
        if results
            .iter()
            .any(|result| matches!(result, RebindResult::Success { .. }))
        {
            self.save_profiles();
        }
        Ok(results)
    }

    /// Abort an action's rebind session
    pub fn cancel_rebind(&mut self, action: &str) -> Result<RebindResult, InputError> {
        self.negotiator.cancel(action, &mut self.bindings)
    }

    pub fn is_rebinding(&self, action: &str) -> bool {
        self.negotiator.is_active(action)
    }

    /// Save every genuine profile; failures are logged
    pub fn save_profiles(&mut self) {
        if let Err(e) = self
            .store
            .save(&self.players, &self.registry, &self.bindings)
        {
            error!("Failed to save profiles: {}", e);
        }
    }

    /// Reload the store and re-apply it to every player
    pub fn load_profiles(&mut self) {
        self.store.load();
        self.store.apply(&self.players, &mut self.bindings);
    }
}
