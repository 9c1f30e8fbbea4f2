// Interactive rebind sessions

use super::action::DeviceClass;
use super::catalog::ControlPath;
use super::config::{ActionMap, BoundControl, PlayerBindings};
use super::registry::ActionRegistry;
use super::roster::DeviceHandle;
use super::{InputError, PlayerId};
use crate::settings::RebindSettings;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// A request to capture a new control for one action
#[derive(Debug, Clone, PartialEq)]
pub struct RebindRequest {
    pub player: PlayerId,
    pub action: String,

    /// Device that initiated the rebind
    pub device: DeviceHandle,
}

/// A control observed by the polling layer while a rebind is in progress
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub device: DeviceHandle,
    pub path: ControlPath,

    /// Virtual or derived control (e.g. "any key")
    pub synthetic: bool,
}

impl Candidate {
    pub fn new(device: DeviceHandle, path: impl Into<ControlPath>) -> Self {
        Self {
            device,
            path: path.into(),
            synthetic: false,
        }
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }
}

/// One polling event fed to a session
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Controls observed this tick; may be empty
    Candidates(Vec<Candidate>),
    /// The polling layer could not read input
    ReadFailure,
}

/// Outcome reported while advancing a session
#[derive(Debug, Clone, PartialEq)]
pub enum RebindResult {
    /// The control was captured and bound
    Success { path: ControlPath, key: String },
    /// A candidate was already reserved; the session keeps waiting
    RejectedInUse { path: ControlPath },
    /// Reading input failed; capture restarts
    Failed,
    /// The session was aborted and the previous state restored
    Cancelled,
}

impl RebindResult {
    /// Whether the session has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, RebindResult::Success { .. } | RebindResult::Cancelled)
    }
}

/// One in-flight rebind
#[derive(Debug, Clone)]
pub struct RebindSession {
    request: RebindRequest,
    device_class: DeviceClass,
    cancel_paths: HashSet<ControlPath>,
    excluded_paths: HashSet<ControlPath>,
    previous_controls: Vec<BoundControl>,
    previous_enabled: bool,

    /// First acceptable candidate and its catalog key
    pending: Option<(ControlPath, String)>,
    ticks_waited: u32,
}

impl RebindSession {
    pub fn request(&self) -> &RebindRequest {
        &self.request
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    /// Paths that abort the session
    pub fn cancel_paths(&self) -> &HashSet<ControlPath> {
        &self.cancel_paths
    }

    /// Paths that can never be captured (includes the cancel paths)
    pub fn excluded_paths(&self) -> &HashSet<ControlPath> {
        &self.excluded_paths
    }

    /// Accepted candidate waiting out the grace window
    pub fn pending(&self) -> Option<&ControlPath> {
        self.pending.as_ref().map(|(path, _)| path)
    }
}

/// Runs rebind sessions, at most one per action
#[derive(Debug, Default)]
pub struct RebindNegotiator {
    settings: RebindSettings,
    sessions: HashMap<String, RebindSession>,
}

impl RebindNegotiator {
    pub fn new(settings: RebindSettings) -> Self {
        Self {
            settings,
            sessions: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &RebindSettings {
        &self.settings
    }

    /// Whether a session for the action is awaiting a candidate
    pub fn is_active(&self, action: &str) -> bool {
        self.sessions.contains_key(action)
    }

    pub fn session(&self, action: &str) -> Option<&RebindSession> {
        self.sessions.get(action)
    }

    /// Player and device class of every open session
    pub fn session_owners(&self) -> Vec<(PlayerId, DeviceClass)> {
        let mut owners: Vec<_> = self
            .sessions
            .values()
            .map(|session| (session.request.player, session.device_class))
            .collect();
        owners.sort();
        owners.dedup();
        owners
    }

    /// Cancel every open session of a player, returning the cancelled action ids
    pub fn cancel_for_player(&mut self, player: PlayerId, bindings: &mut PlayerBindings) -> Vec<String> {
        let actions: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.request.player == player)
            .map(|(action, _)| action.clone())
            .collect();
        for action in &actions {
            // The session exists, so cancel cannot fail
            let _ = self.cancel(action, bindings);
        }
        actions
    }

    /// Disable every action under capture again, e.g. after stored flags were re-applied
    pub fn hold_targets_disabled(&self, bindings: &mut PlayerBindings) {
        for (action, session) in &self.sessions {
            if let Some(map) = session_map(session, bindings) {
                map.set_enabled(action, false);
            }
        }
    }

    /// Start a session: disables the action and snapshots what a cancel restores
    pub fn begin(
        &mut self,
        request: RebindRequest,
        registry: &ActionRegistry,
        bindings: &mut PlayerBindings,
    ) -> Result<(), InputError> {
        let action = registry.get(&request.action)?;
        if !action.allow_rebind() {
            return Err(InputError::RebindNotAllowed(request.action));
        }
        if self.sessions.contains_key(&request.action) {
            return Err(InputError::RebindInProgress(request.action));
        }
        let map = bindings
            .get(request.player)
            .ok_or(InputError::UnknownPlayer(request.player))?;

        let cancel_paths: HashSet<ControlPath> = map
            .paths(&self.settings.menu_action)
            .into_iter()
            .cloned()
            .collect();
        let mut excluded_paths: HashSet<ControlPath> = self
            .settings
            .exclusive_actions
            .iter()
            .filter(|exclusive| **exclusive != request.action)
            .flat_map(|exclusive| map.paths(exclusive))
            .cloned()
            .collect();
        excluded_paths.extend(cancel_paths.iter().cloned());

        let device_class = map.device_class();
        let previous_controls = map.controls(&request.action).to_vec();
        let previous_enabled = bindings
            .get_mut(request.player)
            .and_then(|map| map.set_enabled(&request.action, false))
            .unwrap_or(false);

        info!(
            "Rebinding {} for player {} ({} excluded paths)",
            request.action,
            request.player,
            excluded_paths.len()
        );

        let session = RebindSession {
            device_class,
            request,
            cancel_paths,
            excluded_paths,
            previous_controls,
            previous_enabled,
            pending: None,
            ticks_waited: 0,
        };
        self.sessions
            .insert(session.request.action.clone(), session);
        Ok(())
    }

    /// Feed one polling event to the action's session
    ///
    /// Returns every outcome produced, in order. The session ends when the
    /// last outcome is terminal.
    pub fn advance(
        &mut self,
        action: &str,
        event: &PollEvent,
        registry: &mut ActionRegistry,
        bindings: &mut PlayerBindings,
    ) -> Result<Vec<RebindResult>, InputError> {
        let allow_keyboard_mouse = self.settings.allow_keyboard_mouse;
        let grace_ticks = self.settings.grace_ticks;
        let session = self
            .sessions
            .get_mut(action)
            .ok_or_else(|| InputError::NoActiveSession(action.to_string()))?;

        let candidates = match event {
            PollEvent::ReadFailure => {
                warn!("Failed to read input while rebinding {}, retrying", action);
                session.pending = None;
                session.ticks_waited = 0;
                return Ok(vec![RebindResult::Failed]);
            }
            PollEvent::Candidates(candidates) => candidates,
        };

        let mut results = Vec::new();
        for candidate in candidates {
            if session.cancel_paths.contains(&candidate.path) {
                let result = self.cancel(action, bindings)?;
                results.push(result);
                return Ok(results);
            }
            if session.excluded_paths.contains(&candidate.path) {
                debug!("{} is already in use, rejecting", candidate.path);
                results.push(RebindResult::RejectedInUse {
                    path: candidate.path.clone(),
                });
                continue;
            }
            if candidate.synthetic {
                debug!("Dropping synthetic control {}", candidate.path);
                continue;
            }
            if !session
                .request
                .device
                .accepts(&candidate.device, allow_keyboard_mouse)
            {
                debug!("Dropping {} from another device", candidate.path);
                continue;
            }
            let Some(key) = registry
                .catalog(session.device_class)
                .reverse_lookup(&candidate.path)
            else {
                debug!(
                    "{} has no {} binding key, dropping",
                    candidate.path, session.device_class
                );
                continue;
            };
            if session.pending.is_none() {
                session.pending = Some((candidate.path.clone(), key.to_string()));
                session.ticks_waited = 0;
            }
        }

        if session.pending.is_some() {
            if session.ticks_waited >= grace_ticks {
                results.push(self.complete(action, registry, bindings)?);
            } else {
                session.ticks_waited += 1;
            }
        }
        Ok(results)
    }

    fn complete(
        &mut self,
        action: &str,
        registry: &mut ActionRegistry,
        bindings: &mut PlayerBindings,
    ) -> Result<RebindResult, InputError> {
        let session = self
            .sessions
            .get(action)
            .ok_or_else(|| InputError::NoActiveSession(action.to_string()))?;
        let Some((path, key)) = session.pending.clone() else {
            return Err(InputError::NoActiveSession(action.to_string()));
        };
        let device_class = session.device_class;

        if session_map(session, bindings).is_none() {
            warn!(
                "Player {} no longer has a {} map, abandoning rebind of {}",
                session.request.player, device_class, action
            );
            return self.cancel(action, bindings);
        }

        registry.set_binding(action, device_class, &key)?;
        let Some(session) = self.sessions.remove(action) else {
            return Err(InputError::NoActiveSession(action.to_string()));
        };
        let Some(map) = session_map(&session, bindings) else {
            return Err(InputError::UnknownPlayer(session.request.player));
        };
        map.replace_controls(action, vec![BoundControl::Simple(path.clone())]);
        map.set_enabled(action, true);

        info!("Bound {} to {} ({})", action, key, path);
        Ok(RebindResult::Success { path, key })
    }

    /// Abort a session, restoring the previous controls and enabled flag
    pub fn cancel(
        &mut self,
        action: &str,
        bindings: &mut PlayerBindings,
    ) -> Result<RebindResult, InputError> {
        let session = self
            .sessions
            .remove(action)
            .ok_or_else(|| InputError::NoActiveSession(action.to_string()))?;

        if let Some(map) = session_map(&session, bindings) {
            map.replace_controls(action, session.previous_controls);
            map.set_enabled(action, session.previous_enabled);
        }
        info!("Cancelled rebind of {}", action);
        Ok(RebindResult::Cancelled)
    }
}

/// The session player's map, only while it still serves the session's device class
fn session_map<'a>(session: &RebindSession, bindings: &'a mut PlayerBindings) -> Option<&'a mut ActionMap> {
    bindings
        .get_mut(session.request.player)
        .filter(|map| map.device_class() == session.device_class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::action::Category;
    use crate::input::roster::DeviceKind;

    const KEYBOARD: DeviceHandle = DeviceHandle {
        id: 1,
        kind: DeviceKind::Keyboard,
    };
    const MOUSE: DeviceHandle = DeviceHandle {
        id: 2,
        kind: DeviceKind::Mouse,
    };
    const PAD: DeviceHandle = DeviceHandle {
        id: 3,
        kind: DeviceKind::Gamepad,
    };

    struct Fixture {
        registry: ActionRegistry,
        bindings: PlayerBindings,
        negotiator: RebindNegotiator,
    }

    impl Fixture {
        fn new(settings: RebindSettings) -> Self {
            let mut registry = ActionRegistry::new();
            registry
                .register_value_action("Movement", "Move", Category::Movement)
                .unwrap();
            registry
                .register_button_action("Jump", "Jump", Category::Movement, true)
                .unwrap();
            registry
                .register_button_action("MenuTrigger", "Menu", Category::Menus, false)
                .unwrap();
            registry
                .set_binding("Movement", DeviceClass::Keyboard, "WASD")
                .unwrap();
            registry
                .set_binding("Jump", DeviceClass::Keyboard, "Space")
                .unwrap();
            registry
                .set_binding("MenuTrigger", DeviceClass::Keyboard, "Escape")
                .unwrap();

            let mut bindings = PlayerBindings::new();
            bindings.ensure(0, DeviceClass::Keyboard, &registry);

            Self {
                registry,
                bindings,
                negotiator: RebindNegotiator::new(settings),
            }
        }

        fn begin(&mut self, action: &str) -> Result<(), InputError> {
            self.negotiator.begin(
                RebindRequest {
                    player: 0,
                    action: action.to_string(),
                    device: KEYBOARD,
                },
                &self.registry,
                &mut self.bindings,
            )
        }

        fn advance(&mut self, candidates: Vec<Candidate>) -> Vec<RebindResult> {
            self.negotiator
                .advance(
                    "Jump",
                    &PollEvent::Candidates(candidates),
                    &mut self.registry,
                    &mut self.bindings,
                )
                .unwrap()
        }

        fn jump_enabled(&self) -> bool {
            self.bindings.get(0).unwrap().is_enabled("Jump")
        }
    }

    #[test]
    fn test_begin_disables_action() {
        let mut fixture = Fixture::new(RebindSettings::default());
        assert!(fixture.jump_enabled());

        fixture.begin("Jump").unwrap();

        assert!(!fixture.jump_enabled());
        let session = fixture.negotiator.session("Jump").unwrap();
        assert!(session.cancel_paths().contains(&ControlPath::from("<Keyboard>/escape")));
        assert!(session.excluded_paths().contains(&ControlPath::from("<Keyboard>/w")));
        assert!(session.excluded_paths().contains(&ControlPath::from("<Keyboard>/escape")));
    }

    #[test]
    fn test_success_binds_symbolically() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();

        let results = fixture.advance(vec![Candidate::new(KEYBOARD, "<Keyboard>/e")]);

        assert_eq!(
            results,
            vec![RebindResult::Success {
                path: ControlPath::from("<Keyboard>/e"),
                key: "E".to_string(),
            }]
        );
        assert!(!fixture.negotiator.is_active("Jump"));
        assert!(fixture.jump_enabled());
        assert_eq!(
            fixture.registry.get("Jump").unwrap().binding(DeviceClass::Keyboard),
            Some("E")
        );
        assert_eq!(
            fixture.bindings.get(0).unwrap().paths("Jump"),
            vec![&ControlPath::from("<Keyboard>/e")]
        );
    }

    #[test]
    fn test_excluded_candidate_is_rejected() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();

        let results = fixture.advance(vec![Candidate::new(KEYBOARD, "<Keyboard>/w")]);

        assert_eq!(
            results,
            vec![RebindResult::RejectedInUse {
                path: ControlPath::from("<Keyboard>/w"),
            }]
        );
        assert!(fixture.negotiator.is_active("Jump"));
        assert!(fixture.negotiator.session("Jump").unwrap().pending().is_none());
    }

    #[test]
    fn test_cancel_path_restores_state() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();

        let results = fixture.advance(vec![
            Candidate::new(KEYBOARD, "<Keyboard>/escape"),
            Candidate::new(KEYBOARD, "<Keyboard>/e"),
        ]);

        assert_eq!(results, vec![RebindResult::Cancelled]);
        assert!(!fixture.negotiator.is_active("Jump"));
        assert!(fixture.jump_enabled());
        assert_eq!(
            fixture.bindings.get(0).unwrap().paths("Jump"),
            vec![&ControlPath::from("<Keyboard>/space")]
        );
        assert_eq!(
            fixture.registry.get("Jump").unwrap().binding(DeviceClass::Keyboard),
            Some("Space")
        );
    }

    #[test]
    fn test_cancel_restores_disabled_flag() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.bindings.get_mut(0).unwrap().set_enabled("Jump", false);
        fixture.begin("Jump").unwrap();

        let result = fixture
            .negotiator
            .cancel("Jump", &mut fixture.bindings)
            .unwrap();

        assert_eq!(result, RebindResult::Cancelled);
        assert!(!fixture.jump_enabled());
    }

    #[test]
    fn test_second_session_is_rejected() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();
        assert_eq!(
            fixture.begin("Jump"),
            Err(InputError::RebindInProgress("Jump".to_string()))
        );
    }

    #[test]
    fn test_begin_errors() {
        let mut fixture = Fixture::new(RebindSettings::default());
        assert_eq!(
            fixture.begin("MenuTrigger"),
            Err(InputError::RebindNotAllowed("MenuTrigger".to_string()))
        );
        assert_eq!(
            fixture.begin("Nope"),
            Err(InputError::UnknownAction("Nope".to_string()))
        );

        let result = fixture.negotiator.begin(
            RebindRequest {
                player: 9,
                action: "Jump".to_string(),
                device: KEYBOARD,
            },
            &fixture.registry,
            &mut fixture.bindings,
        );
        assert_eq!(result, Err(InputError::UnknownPlayer(9)));
    }

    #[test]
    fn test_dropped_candidates() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();

        let results = fixture.advance(vec![
            Candidate::new(KEYBOARD, "<Keyboard>/anyKey").synthetic(),
            Candidate::new(PAD, "<Gamepad>/buttonSouth"),
            Candidate::new(KEYBOARD, "<Keyboard>/notAKey"),
        ]);

        assert!(results.is_empty());
        assert!(fixture.negotiator.is_active("Jump"));
    }

    #[test]
    fn test_keyboard_mouse_allowance() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();
        let results = fixture.advance(vec![Candidate::new(MOUSE, "<Mouse>/leftButton")]);
        assert!(matches!(
            &results[..],
            [RebindResult::Success { key, .. }] if key == "MouseLeft"
        ));

        let mut strict = Fixture::new(RebindSettings {
            allow_keyboard_mouse: false,
            ..RebindSettings::default()
        });
        strict.begin("Jump").unwrap();
        let results = strict.advance(vec![Candidate::new(MOUSE, "<Mouse>/leftButton")]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_grace_window() {
        let mut fixture = Fixture::new(RebindSettings {
            grace_ticks: 2,
            ..RebindSettings::default()
        });
        fixture.begin("Jump").unwrap();

        assert!(fixture
            .advance(vec![Candidate::new(KEYBOARD, "<Keyboard>/e")])
            .is_empty());
        assert!(fixture
            .advance(vec![Candidate::new(KEYBOARD, "<Keyboard>/q")])
            .is_empty());
        let results = fixture.advance(Vec::new());

        assert!(matches!(
            &results[..],
            [RebindResult::Success { key, .. }] if key == "E"
        ));
    }

    #[test]
    fn test_read_failure_retries() {
        let mut fixture = Fixture::new(RebindSettings {
            grace_ticks: 1,
            ..RebindSettings::default()
        });
        fixture.begin("Jump").unwrap();
        fixture.advance(vec![Candidate::new(KEYBOARD, "<Keyboard>/e")]);

        let results = fixture
            .negotiator
            .advance(
                "Jump",
                &PollEvent::ReadFailure,
                &mut fixture.registry,
                &mut fixture.bindings,
            )
            .unwrap();

        assert_eq!(results, vec![RebindResult::Failed]);
        assert!(fixture.negotiator.is_active("Jump"));
        assert!(fixture.negotiator.session("Jump").unwrap().pending().is_none());
    }

    #[test]
    fn test_configurable_exclusions() {
        let mut fixture = Fixture::new(RebindSettings {
            exclusive_actions: Vec::new(),
            ..RebindSettings::default()
        });
        fixture.begin("Jump").unwrap();

        let results = fixture.advance(vec![Candidate::new(KEYBOARD, "<Keyboard>/w")]);
        assert!(matches!(
            &results[..],
            [RebindResult::Success { key, .. }] if key == "W"
        ));
    }

    #[test]
    fn test_advance_without_session() {
        let mut fixture = Fixture::new(RebindSettings::default());
        let result = fixture.negotiator.advance(
            "Jump",
            &PollEvent::Candidates(Vec::new()),
            &mut fixture.registry,
            &mut fixture.bindings,
        );
        assert_eq!(result, Err(InputError::NoActiveSession("Jump".to_string())));
    }

    #[test]
    fn test_success_without_map_leaves_registry_untouched() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();
        fixture.bindings.retain_players(&[]);

        let results = fixture.advance(vec![Candidate::new(KEYBOARD, "<Keyboard>/e")]);

        assert_eq!(results, vec![RebindResult::Cancelled]);
        assert!(!fixture.negotiator.is_active("Jump"));
        assert_eq!(
            fixture.registry.get("Jump").unwrap().binding(DeviceClass::Keyboard),
            Some("Space")
        );
    }

    #[test]
    fn test_cancel_skips_map_of_another_class() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();
        fixture
            .bindings
            .ensure(0, DeviceClass::Controller, &fixture.registry);

        fixture
            .negotiator
            .cancel("Jump", &mut fixture.bindings)
            .unwrap();

        assert_eq!(
            fixture.bindings.get(0).unwrap().paths("Jump"),
            vec![&ControlPath::from("<Gamepad>/buttonSouth")]
        );
    }

    #[test]
    fn test_cancel_for_player() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();
        assert_eq!(
            fixture.negotiator.session_owners(),
            vec![(0, DeviceClass::Keyboard)]
        );

        let cancelled = fixture.negotiator.cancel_for_player(0, &mut fixture.bindings);

        assert_eq!(cancelled, vec!["Jump".to_string()]);
        assert!(fixture.negotiator.session_owners().is_empty());
        assert!(fixture.jump_enabled());
    }

    #[test]
    fn test_hold_targets_disabled() {
        let mut fixture = Fixture::new(RebindSettings::default());
        fixture.begin("Jump").unwrap();
        fixture.bindings.get_mut(0).unwrap().set_enabled("Jump", true);

        fixture.negotiator.hold_targets_disabled(&mut fixture.bindings);

        assert!(!fixture.jump_enabled());
    }
}
