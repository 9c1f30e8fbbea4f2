// Profile enable/disable persistence

use super::action::DeviceClass;
use super::config::PlayerBindings;
use super::registry::ActionRegistry;
use super::roster::PlayerInfo;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// profile -> device class -> action id -> enabled
pub type ProfileMap = BTreeMap<String, BTreeMap<DeviceClass, BTreeMap<String, bool>>>;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Profile store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Profile store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-profile enabled flags, backed by a single JSON file
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: ProfileMap,
}

impl ProfileStore {
    /// Create an empty store backed by `path`; nothing is read until [`ProfileStore::load`]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            profiles: ProfileMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profiles(&self) -> &ProfileMap {
        &self.profiles
    }

    pub fn contains_profile(&self, profile: &str) -> bool {
        self.profiles.contains_key(profile)
    }

    /// Stored flag for one action
    pub fn enabled(&self, profile: &str, device_class: DeviceClass, action: &str) -> Option<bool> {
        self.profiles
            .get(profile)?
            .get(&device_class)?
            .get(action)
            .copied()
    }

    pub fn set_enabled(&mut self, profile: &str, device_class: DeviceClass, action: &str, enabled: bool) {
        self.profiles
            .entry(profile.to_string())
            .or_default()
            .entry(device_class)
            .or_default()
            .insert(action.to_string(), enabled);
    }

    /// Forget a deleted profile
    pub fn remove_profile(&mut self, profile: &str) -> bool {
        self.profiles.remove(profile).is_some()
    }

    /// Read the backing file, replacing the in-memory store
    ///
    /// A missing file gives an empty store. A corrupt file is logged and also
    /// gives an empty store; nothing from it is kept.
    pub fn load(&mut self) {
        self.profiles = match self.read() {
            Ok(Some(profiles)) => {
                info!(
                    "Loaded {} profiles from {}",
                    profiles.len(),
                    self.path.display()
                );
                profiles
            }
            Ok(None) => {
                debug!("No profile store at {}, starting empty", self.path.display());
                ProfileMap::new()
            }
            Err(e) => {
                error!(
                    "Failed to read profile store {}: {}; resetting",
                    self.path.display(),
                    e
                );
                ProfileMap::new()
            }
        };
    }

    fn read(&self) -> Result<Option<ProfileMap>, PersistError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Re-apply stored flags to every player's map, for its current device class only
    ///
    /// Returns the number of flags applied.
    pub fn apply(&self, players: &[PlayerInfo], bindings: &mut PlayerBindings) -> usize {
        let mut applied = 0;
        for player in players {
            let Some(profile) = player.profile.as_deref() else {
                continue;
            };
            let Some(map) = bindings.get_mut(player.id) else {
                continue;
            };
            let Some(flags) = self
                .profiles
                .get(profile)
                .and_then(|classes| classes.get(&map.device_class()))
            else {
                continue;
            };

            for (action, &enabled) in flags {
                if map.set_enabled(action, enabled).is_some() {
                    applied += 1;
                } else {
                    debug!("Ignoring stored flag for unknown action {}", action);
                }
            }
            debug!("Applied profile {} to player {}", profile, player.id);
        }
        applied
    }

    /// Record every genuine player's current flags and write the store
    ///
    /// Profiles missing from `players` are pruned first. A player whose
    /// profile cannot be resolved is skipped.
    pub fn save(
        &mut self,
        players: &[PlayerInfo],
        registry: &ActionRegistry,
        bindings: &PlayerBindings,
    ) -> Result<(), PersistError> {
        let before = self.profiles.len();
        self.profiles.retain(|profile, _| {
            players
                .iter()
                .any(|player| player.profile.as_deref() == Some(profile.as_str()))
        });
        if self.profiles.len() != before {
            info!("Pruned {} stale profiles", before - self.profiles.len());
        }

        for player in players {
            let Some(profile) = player.profile.as_deref() else {
                warn!("Could not resolve a profile for player {}, skipping", player.id);
                continue;
            };
            if !player.genuine {
                continue;
            }
            let Some(map) = bindings.get(player.id) else {
                continue;
            };

            for action in registry.iter() {
                let enabled = map.is_enabled(action.id());
                self.set_enabled(profile, map.device_class(), action.id(), enabled);
            }
        }

        self.write()
    }

    /// Serialize to a temp file next to the target, then rename over it
    fn write(&self) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.profiles)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved {} profiles to {}", self.profiles.len(), self.path.display());
        Ok(())
    }
}
