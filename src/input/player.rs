// Per-player action state cache

use super::action::ValueKind;
use super::registry::ActionRegistry;
use super::state::ButtonState;
use super::{InputError, PlayerId};
use glam::Vec2;
use log::debug;
use std::collections::HashMap;

/// The latest debounced state of every registered action for one player
#[derive(Debug, Clone)]
pub struct PlayerActionState {
    /// Player ID as reported by the roster
    player_id: PlayerId,

    /// Value-kind actions -> latest 2-D sample
    values: HashMap<String, Vec2>,

    /// Button-kind actions -> latest automaton state
    buttons: HashMap<String, ButtonState>,
}

impl PlayerActionState {
    /// Create a player state with every registered action at rest
    pub fn new(player_id: PlayerId, registry: &ActionRegistry) -> Self {
        let mut state = Self {
            player_id,
            values: HashMap::new(),
            buttons: HashMap::new(),
        };
        state.set_neutral(registry);
        state
    }

    /// Get the player ID
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Latest value of a value-kind action
    pub fn value(&self, action: &str) -> Option<Vec2> {
        self.values.get(action).copied()
    }

    /// Latest state of a button-kind action
    pub fn button(&self, action: &str) -> Option<ButtonState> {
        self.buttons.get(action).copied()
    }

    /// All value-kind states
    pub fn values(&self) -> &HashMap<String, Vec2> {
        &self.values
    }

    /// All button-kind states
    pub fn buttons(&self) -> &HashMap<String, ButtonState> {
        &self.buttons
    }

    /// Run one tick: value actions store the sample, button actions advance the automaton
    ///
    /// Actions missing from `samples` read as zero.
    pub(crate) fn update(&mut self, registry: &ActionRegistry, samples: &HashMap<String, Vec2>) {
        for action in registry.iter() {
            let sample = samples.get(action.id()).copied().unwrap_or(Vec2::ZERO);
            match action.kind() {
                ValueKind::Value => {
                    self.values.insert(action.id().to_string(), sample);
                }
                ValueKind::Button => {
                    let state = self.buttons.entry(action.id().to_string()).or_default();
                    *state = state.next_from_magnitude(sample.length());
                }
            }
        }
    }

    /// Force every action back to rest, regardless of automaton history
    pub(crate) fn set_neutral(&mut self, registry: &ActionRegistry) {
        for action in registry.iter() {
            match action.kind() {
                ValueKind::Value => {
                    self.values.insert(action.id().to_string(), Vec2::ZERO);
                }
                ValueKind::Button => {
                    self.buttons.insert(action.id().to_string(), ButtonState::Up);
                }
            }
        }
    }

    pub(crate) fn consume(&mut self, action: &str) {
        let state = self.buttons.entry(action.to_string()).or_default();
        *state = state.consume();
    }
}

/// Per player id, the latest debounced state for every registered action
///
/// Players keep the order in which they were first seen.
#[derive(Debug, Default)]
pub struct ActionStateCache {
    players: Vec<PlayerActionState>,
    index: HashMap<PlayerId, usize>,
}

impl ActionStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, player: PlayerId, registry: &ActionRegistry) -> &mut PlayerActionState {
        let index = match self.index.get(&player) {
            Some(&index) => index,
            None => {
                debug!("Tracking action state for player {}", player);
                self.players.push(PlayerActionState::new(player, registry));
                self.index.insert(player, self.players.len() - 1);
                self.players.len() - 1
            }
        };
        &mut self.players[index]
    }

    /// Live tick for a player: drives the automaton and stores value samples
    pub fn update(
        &mut self,
        registry: &ActionRegistry,
        player: PlayerId,
        samples: &HashMap<String, Vec2>,
    ) {
        self.entry(player, registry).update(registry, samples);
    }

    /// Hard reset of a player's actions to `Up` / zero
    pub fn set_neutral(&mut self, registry: &ActionRegistry, player: PlayerId) {
        self.entry(player, registry).set_neutral(registry);
    }

    /// Cached state of a player
    pub fn player(&self, player: PlayerId) -> Result<&PlayerActionState, InputError> {
        self.index
            .get(&player)
            .map(|&index| &self.players[index])
            .ok_or(InputError::UnknownPlayer(player))
    }

    /// Player ids in the order they were first seen
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|p| p.player_id())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Latest value of a value-kind action for a player
    pub fn value_state(
        &self,
        registry: &ActionRegistry,
        player: PlayerId,
        action: &str,
    ) -> Result<Vec2, InputError> {
        expect_kind(registry, action, ValueKind::Value)?;
        Ok(self.player(player)?.value(action).unwrap_or(Vec2::ZERO))
    }

    /// Latest state of a button-kind action for a player
    pub fn button_state(
        &self,
        registry: &ActionRegistry,
        player: PlayerId,
        action: &str,
    ) -> Result<ButtonState, InputError> {
        expect_kind(registry, action, ValueKind::Button)?;
        Ok(self.player(player)?.button(action).unwrap_or_default())
    }

    /// Value of an action for every known player
    pub fn value_states(
        &self,
        registry: &ActionRegistry,
        action: &str,
    ) -> Result<Vec<(PlayerId, Vec2)>, InputError> {
        expect_kind(registry, action, ValueKind::Value)?;
        Ok(self
            .players
            .iter()
            .map(|p| (p.player_id(), p.value(action).unwrap_or(Vec2::ZERO)))
            .collect())
    }

    /// Button state of an action for every known player
    pub fn button_states(
        &self,
        registry: &ActionRegistry,
        action: &str,
    ) -> Result<Vec<(PlayerId, ButtonState)>, InputError> {
        expect_kind(registry, action, ValueKind::Button)?;
        Ok(self
            .players
            .iter()
            .map(|p| (p.player_id(), p.button(action).unwrap_or_default()))
            .collect())
    }

    /// Mark a press as handled; the action stays `Consumed` until released
    pub fn consume(
        &mut self,
        registry: &ActionRegistry,
        player: PlayerId,
        action: &str,
    ) -> Result<(), InputError> {
        expect_kind(registry, action, ValueKind::Button)?;
        let index = *self
            .index
            .get(&player)
            .ok_or(InputError::UnknownPlayer(player))?;
        self.players[index].consume(action);
        Ok(())
    }

    /// Drop cached state for players not in the active set
    pub fn retain_players(&mut self, active: &[PlayerId]) {
        self.players.retain(|p| active.contains(&p.player_id()));
        self.index = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| (p.player_id(), i))
            .collect();
    }
}

fn expect_kind(registry: &ActionRegistry, action: &str, expected: ValueKind) -> Result<(), InputError> {
    let actual = registry.get(action)?.kind();
    if actual != expected {
        return Err(InputError::WrongAccessorForActionKind {
            action: action.to_string(),
            actual,
        });
    }
    Ok(())
}
