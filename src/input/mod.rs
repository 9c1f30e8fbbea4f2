// Rebindable input actions
//
// This module lets an application declare logical actions once and have them
// bound per player, per device class and per profile, with a debounced state
// exposed to game logic every tick.
//
// ## Architecture
//
// - `action`: Logical actions, categories, device classes and value kinds
// - `catalog`: Per device class table of binding keys and composite specs
// - `registry`: The set of registered actions and their symbolic bindings
// - `config`: Per-player physical action maps built from the registry
// - `state`: The button automaton
// - `player`: Per-player cached action state
// - `persist`: Profile enable/disable persistence
// - `roster`: Roster provider interface and change detection
// - `rebind`: Interactive rebind sessions
// - `manager`: The context object coordinating everything
//
// ## Usage Example
//
// ```rust
// use actionbind::input::{Category, InputContext};
// use actionbind::settings::Settings;
//
// let mut ctx = InputContext::new(Settings::default());
// ctx.registry_mut()
//     .register_button_action("Interact", "Interact", Category::Interaction, true)?;
//
// // Once per frame, with the host's roster and polling source
// ctx.tick(&roster, &poller, window_focused);
//
// if ctx.button_state(player_id, "Interact")?.is_pressed() {
//     // Player just pressed interact
// }
// ```

pub mod action;
pub mod catalog;
pub mod config;
pub mod manager;
pub mod persist;
pub mod player;
pub mod rebind;
pub mod registry;
pub mod roster;
pub mod state;

// Re-export commonly used types
pub use action::{Category, DeviceClass, LogicalAction, ValueKind};
pub use catalog::{
    ApplyOutcome, AxisBias, CatalogEntry, CompositeKind, CompositeSpec, ControlPath,
    DeviceCatalog, Diagnostic, Vector2Mode,
};
pub use config::{ActionMap, BoundControl, ControlSampler, PlayerBindings};
pub use manager::InputContext;
pub use persist::{PersistError, ProfileStore};
pub use player::{ActionStateCache, PlayerActionState};
pub use rebind::{Candidate, PollEvent, RebindNegotiator, RebindRequest, RebindResult};
pub use registry::ActionRegistry;
pub use roster::{DeviceHandle, DeviceKind, PlayerInfo, RosterProvider, RosterWatch};
pub use state::ButtonState;

/// Identifier of a local player as reported by the roster provider
pub type PlayerId = u32;

/// Hard errors: these indicate an integration bug, not a runtime data condition
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InputError {
    #[error("Action {0} cannot be registered with the unset category")]
    InvalidCategory(String),

    #[error("{key} is not a valid binding key for {device_class}")]
    InvalidBindingKey {
        key: String,
        device_class: DeviceClass,
    },

    #[error("{0} is not a registered action")]
    UnknownAction(String),

    #[error("Player {0} is not in the local session")]
    UnknownPlayer(PlayerId),

    #[error("Wrong accessor for {action}: it is a {actual} action")]
    WrongAccessorForActionKind { action: String, actual: ValueKind },

    #[error("A rebind for {0} is already in progress")]
    RebindInProgress(String),

    #[error("{0} does not allow rebinding")]
    RebindNotAllowed(String),

    #[error("No rebind session is active for {0}")]
    NoActiveSession(String),
}
