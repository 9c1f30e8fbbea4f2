// Roster provider interface and change detection

use super::action::DeviceClass;
use super::PlayerId;
use log::debug;

/// Kind of physical device a player is using
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Keyboard,
    Mouse,
    Gamepad,
    Other,
}

impl DeviceKind {
    /// Device class whose catalog serves this kind of device
    pub fn device_class(self) -> Option<DeviceClass> {
        match self {
            DeviceKind::Keyboard | DeviceKind::Mouse => Some(DeviceClass::Keyboard),
            DeviceKind::Gamepad => Some(DeviceClass::Controller),
            DeviceKind::Other => None,
        }
    }
}

/// Identity of one physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    pub id: u32,
    pub kind: DeviceKind,
}

impl DeviceHandle {
    pub fn new(id: u32, kind: DeviceKind) -> Self {
        Self { id, kind }
    }

    pub fn device_class(&self) -> Option<DeviceClass> {
        self.kind.device_class()
    }

    /// Whether input from `other` counts as coming from this device
    ///
    /// With `allow_keyboard_mouse`, a keyboard also accepts mouse input. A
    /// mouse never accepts keyboard input.
    pub fn accepts(&self, other: &DeviceHandle, allow_keyboard_mouse: bool) -> bool {
        self.id == other.id
            || (allow_keyboard_mouse
                && self.kind == DeviceKind::Keyboard
                && other.kind == DeviceKind::Mouse)
    }
}

/// One active local player as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub id: PlayerId,

    /// Profile name, if the host could resolve one
    pub profile: Option<String>,

    /// Whether the profile is a real user profile (transient/default profiles are never saved)
    pub genuine: bool,

    /// Active device, if any
    pub device: Option<DeviceHandle>,
}

impl PlayerInfo {
    /// A player with no profile and no active device
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            profile: None,
            genuine: false,
            device: None,
        }
    }

    pub fn with_profile(mut self, name: impl Into<String>, genuine: bool) -> Self {
        self.profile = Some(name.into());
        self.genuine = genuine;
        self
    }

    pub fn with_device(mut self, device: DeviceHandle) -> Self {
        self.device = Some(device);
        self
    }

    /// Device class of the active device
    pub fn device_class(&self) -> Option<DeviceClass> {
        self.device.and_then(|device| device.device_class())
    }

    /// Profile name when the profile can be saved
    pub fn savable_profile(&self) -> Option<&str> {
        if self.genuine {
            self.profile.as_deref()
        } else {
            None
        }
    }
}

/// Enumerates the currently active local players, in a stable order
pub trait RosterProvider {
    fn players(&self) -> Vec<PlayerInfo>;
}

impl RosterProvider for Vec<PlayerInfo> {
    fn players(&self) -> Vec<PlayerInfo> {
        self.clone()
    }
}

impl RosterProvider for [PlayerInfo] {
    fn players(&self) -> Vec<PlayerInfo> {
        self.to_vec()
    }
}

/// Rolling hash over active player ids, in roster order
pub fn roster_hash(ids: &[PlayerId]) -> u32 {
    ids.iter()
        .fold(17u32, |hash, &id| hash.wrapping_mul(31).wrapping_add(id))
}

/// Detects changes to the set of active players between ticks
#[derive(Debug, Clone, Default)]
pub struct RosterWatch {
    last: Option<u32>,
}

impl RosterWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the roster differs from the last stored one
    ///
    /// The first call always reports a change. With `update`, the new hash is stored.
    pub fn is_changed(&mut self, ids: &[PlayerId], update: bool) -> bool {
        let hash = roster_hash(ids);
        let changed = self.last != Some(hash);
        if changed && update {
            debug!("Roster hash changed to {}", hash);
            self.last = Some(hash);
        }
        changed
    }

    /// Forget the stored hash so the next check reports a change
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_hash(&self) -> Option<u32> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_hash() {
        assert_eq!(roster_hash(&[]), 17);
        assert_eq!(roster_hash(&[0]), 17 * 31);
        assert_eq!(roster_hash(&[1, 2]), (17 * 31 + 1) * 31 + 2);
        assert_ne!(roster_hash(&[1, 2]), roster_hash(&[2, 1]));
    }

    #[test]
    fn test_roster_hash_wraps() {
        let ids = vec![u32::MAX; 16];
        // Must not panic on overflow
        let _ = roster_hash(&ids);
    }

    #[test]
    fn test_watch_reports_changes() {
        let mut watch = RosterWatch::new();
        assert!(watch.is_changed(&[0], true));
        assert!(!watch.is_changed(&[0], true));
        assert!(watch.is_changed(&[0, 1], true));
        assert!(!watch.is_changed(&[0, 1], true));
    }

    #[test]
    fn test_watch_without_update() {
        let mut watch = RosterWatch::new();
        assert!(watch.is_changed(&[3], false));
        assert!(watch.is_changed(&[3], false));
        assert_eq!(watch.last_hash(), None);

        watch.is_changed(&[3], true);
        watch.reset();
        assert!(watch.is_changed(&[3], true));
    }

    #[test]
    fn test_device_class_mapping() {
        assert_eq!(DeviceKind::Gamepad.device_class(), Some(DeviceClass::Controller));
        assert_eq!(DeviceKind::Mouse.device_class(), Some(DeviceClass::Keyboard));
        assert_eq!(DeviceKind::Other.device_class(), None);
    }

    #[test]
    fn test_keyboard_mouse_allowance() {
        let keyboard = DeviceHandle::new(1, DeviceKind::Keyboard);
        let mouse = DeviceHandle::new(2, DeviceKind::Mouse);
        let pad = DeviceHandle::new(3, DeviceKind::Gamepad);

        assert!(keyboard.accepts(&keyboard, false));
        assert!(keyboard.accepts(&mouse, true));
        assert!(!keyboard.accepts(&mouse, false));
        assert!(!keyboard.accepts(&pad, true));
        assert!(!mouse.accepts(&keyboard, true));
        assert!(mouse.accepts(&mouse, false));
    }

    #[test]
    fn test_savable_profile() {
        let player = PlayerInfo::new(0).with_profile("P1", true);
        assert_eq!(player.savable_profile(), Some("P1"));

        let guest = PlayerInfo::new(1).with_profile("Guest", false);
        assert_eq!(guest.savable_profile(), None);
        assert_eq!(PlayerInfo::new(2).savable_profile(), None);
    }
}
