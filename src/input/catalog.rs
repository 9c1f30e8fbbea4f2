// Device binding catalog
//
// Per device class, a fixed table from binding key ("A", "WASD", "LeftStick")
// to either a physical control path or a composite assembly spec.

use super::action::DeviceClass;
use super::config::{ActionMap, BoundControl};
use super::InputError;
use crate::core::math::{clamp, digital, is_active, normalize_or_zero};
use glam::Vec2;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Path of a physical control, e.g. `<Keyboard>/w` or `<Gamepad>/leftStick/up`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlPath(String);

impl ControlPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ControlPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for ControlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of an axis wins when both halves are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisBias {
    #[default]
    None,
    Positive,
    Negative,
}

/// Output processing for a four-part vector composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector2Mode {
    /// Each part snapped to 0 or 1
    Digital,
    /// Like `Digital`, then normalized to unit length (or zero)
    DigitalNormalized,
    /// Raw part magnitudes passed through
    Analog,
}

/// The four built-in composite kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompositeKind {
    Axis { bias: AxisBias, min: f32, max: f32 },
    Vector2 { mode: Vector2Mode },
    ButtonOneModifier,
    ButtonTwoModifiers,
}

impl CompositeKind {
    /// A 1-D axis over [-1, 1] with no bias
    pub fn axis() -> Self {
        Self::Axis {
            bias: AxisBias::None,
            min: -1.0,
            max: 1.0,
        }
    }

    /// Required part names, in assembly order
    pub fn required_parts(&self) -> &'static [&'static str] {
        match self {
            Self::Axis { .. } => &["positive", "negative"],
            Self::Vector2 { .. } => &["up", "down", "left", "right"],
            Self::ButtonOneModifier => &["modifier", "button"],
            Self::ButtonTwoModifiers => &["modifier1", "modifier2", "button"],
        }
    }

    /// Combine part samples (in `required_parts` order) into a value
    pub fn evaluate(&self, parts: &[f32]) -> Vec2 {
        let part = |i: usize| parts.get(i).copied().unwrap_or(0.0);
        match *self {
            Self::Axis { bias, min, max } => {
                let (positive, negative) = (part(0), part(1));
                let value = if is_active(positive) && is_active(negative) {
                    match bias {
                        AxisBias::Positive => max,
                        AxisBias::Negative => min,
                        AxisBias::None => (min + max) / 2.0,
                    }
                } else {
                    positive * max + negative * min
                };
                Vec2::new(clamp(value, min, max), 0.0)
            }
            Self::Vector2 { mode } => {
                let (up, down, left, right) = (part(0), part(1), part(2), part(3));
                match mode {
                    Vector2Mode::Analog => Vec2::new(right - left, up - down),
                    Vector2Mode::Digital => Vec2::new(
                        digital(right) - digital(left),
                        digital(up) - digital(down),
                    ),
                    Vector2Mode::DigitalNormalized => normalize_or_zero(Vec2::new(
                        digital(right) - digital(left),
                        digital(up) - digital(down),
                    )),
                }
            }
            Self::ButtonOneModifier => {
                let value = if is_active(part(0)) { part(1) } else { 0.0 };
                Vec2::new(value, 0.0)
            }
            Self::ButtonTwoModifiers => {
                let value = if is_active(part(0)) && is_active(part(1)) {
                    part(2)
                } else {
                    0.0
                };
                Vec2::new(value, 0.0)
            }
        }
    }
}

/// A composite with every required part bound, parts in assembly order
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeAssembly {
    kind: CompositeKind,
    parts: Vec<(&'static str, ControlPath)>,
}

impl CompositeAssembly {
    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    pub fn parts(&self) -> &[(&'static str, ControlPath)] {
        &self.parts
    }

    pub fn paths(&self) -> impl Iterator<Item = &ControlPath> {
        self.parts.iter().map(|(_, path)| path)
    }

    /// Evaluate the composite using a per-path sampling function
    pub fn evaluate(&self, mut sample: impl FnMut(&ControlPath) -> f32) -> Vec2 {
        let values: Vec<f32> = self.parts.iter().map(|(_, path)| sample(path)).collect();
        self.kind.evaluate(&values)
    }
}

/// Definition of a composite control; parts may still be missing
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSpec {
    kind: CompositeKind,
    parts: Vec<(&'static str, ControlPath)>,
}

impl CompositeSpec {
    pub fn new(kind: CompositeKind) -> Self {
        Self {
            kind,
            parts: Vec::new(),
        }
    }

    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    /// Assign a physical path to a named part (case-insensitive)
    ///
    /// Unknown part names are logged and skipped. Assigning a part twice
    /// replaces the earlier path.
    pub fn add_part(mut self, part: &str, path: impl Into<ControlPath>) -> Self {
        let part = part.to_lowercase();
        let Some(name) = self
            .kind
            .required_parts()
            .iter()
            .find(|name| **name == part)
            .copied()
        else {
            error!("{} is not a valid part for {:?}! Skipping.", part, self.kind);
            return self;
        };
        let path = path.into();
        match self.parts.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = path,
            None => self.parts.push((name, path)),
        }
        self
    }

    /// Required parts that have no path assigned, in assembly order
    pub fn missing_parts(&self) -> Vec<&'static str> {
        self.kind
            .required_parts()
            .iter()
            .filter(|name| !self.parts.iter().any(|(part, _)| part == *name))
            .copied()
            .collect()
    }

    /// Order the parts for assembly, or report which are missing
    pub fn assemble(&self) -> Result<CompositeAssembly, Vec<&'static str>> {
        let missing = self.missing_parts();
        if !missing.is_empty() {
            return Err(missing);
        }
        let parts = self
            .kind
            .required_parts()
            .iter()
            .filter_map(|name| {
                self.parts
                    .iter()
                    .find(|(part, _)| part == name)
                    .map(|(part, path)| (*part, path.clone()))
            })
            .collect();
        Ok(CompositeAssembly {
            kind: self.kind,
            parts,
        })
    }

    /// Attach this composite to an action on the target map
    ///
    /// An incomplete composite is never partially applied: the target is left
    /// untouched and a diagnostic naming the missing parts is returned.
    pub fn apply_to(&self, key: &str, action: &str, target: &mut ActionMap) -> ApplyOutcome {
        match self.assemble() {
            Ok(assembly) => {
                target.add_control(action, BoundControl::Composite(assembly));
                ApplyOutcome::Applied
            }
            Err(missing) => {
                warn!(
                    "Missing composite parts ({}) for {} on {}",
                    missing.join(", "),
                    key,
                    action
                );
                ApplyOutcome::Skipped(Diagnostic::MissingCompositeParts {
                    action: action.to_string(),
                    key: key.to_string(),
                    parts: missing.into_iter().map(String::from).collect(),
                })
            }
        }
    }
}

/// A catalog entry: a single physical control or a composite
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEntry {
    Simple(ControlPath),
    Composite(CompositeSpec),
}

impl CatalogEntry {
    pub fn is_composite(&self) -> bool {
        matches!(self, CatalogEntry::Composite(_))
    }
}

/// Soft failure reported while applying bindings
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    MissingCompositeParts {
        action: String,
        key: String,
        parts: Vec<String>,
    },
}

/// Result of applying a binding key to a target map
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied,
    Skipped(Diagnostic),
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}

const CONTROLLER_BUTTONS: &[(&str, &str)] = &[
    ("A", "<Gamepad>/buttonSouth"),
    ("B", "<Gamepad>/buttonWest"),
    ("X", "<Gamepad>/buttonEast"),
    ("Y", "<Gamepad>/buttonNorth"),
    ("LeftShoulder", "<Gamepad>/leftShoulder"),
    ("RightShoulder", "<Gamepad>/rightShoulder"),
    ("LeftTrigger", "<Gamepad>/leftTrigger"),
    ("RightTrigger", "<Gamepad>/rightTrigger"),
    ("Select", "<Gamepad>/select"),
    ("Start", "<Gamepad>/start"),
    ("LeftStickUp", "<Gamepad>/leftStick/up"),
    ("LeftStickDown", "<Gamepad>/leftStick/down"),
    ("LeftStickLeft", "<Gamepad>/leftStick/left"),
    ("LeftStickRight", "<Gamepad>/leftStick/right"),
    ("LeftStickButton", "<Gamepad>/leftStick/button"),
    ("RightStickUp", "<Gamepad>/rightStick/up"),
    ("RightStickDown", "<Gamepad>/rightStick/down"),
    ("RightStickLeft", "<Gamepad>/rightStick/left"),
    ("RightStickRight", "<Gamepad>/rightStick/right"),
    ("RightStickButton", "<Gamepad>/rightStick/button"),
    ("DPadUp", "<Gamepad>/dpad/up"),
    ("DPadDown", "<Gamepad>/dpad/down"),
    ("DPadLeft", "<Gamepad>/dpad/left"),
    ("DPadRight", "<Gamepad>/dpad/right"),
];

const KEYBOARD_BUTTONS: &[(&str, &str)] = &[
    ("A", "<Keyboard>/a"),
    ("B", "<Keyboard>/b"),
    ("C", "<Keyboard>/c"),
    ("D", "<Keyboard>/d"),
    ("E", "<Keyboard>/e"),
    ("F", "<Keyboard>/f"),
    ("G", "<Keyboard>/g"),
    ("H", "<Keyboard>/h"),
    ("I", "<Keyboard>/i"),
    ("J", "<Keyboard>/j"),
    ("K", "<Keyboard>/k"),
    ("L", "<Keyboard>/l"),
    ("M", "<Keyboard>/m"),
    ("N", "<Keyboard>/n"),
    ("O", "<Keyboard>/o"),
    ("P", "<Keyboard>/p"),
    ("Q", "<Keyboard>/q"),
    ("R", "<Keyboard>/r"),
    ("S", "<Keyboard>/s"),
    ("T", "<Keyboard>/t"),
    ("U", "<Keyboard>/u"),
    ("V", "<Keyboard>/v"),
    ("W", "<Keyboard>/w"),
    ("X", "<Keyboard>/x"),
    ("Y", "<Keyboard>/y"),
    ("Z", "<Keyboard>/z"),
    ("Alpha0", "<Keyboard>/0"),
    ("Alpha1", "<Keyboard>/1"),
    ("Alpha2", "<Keyboard>/2"),
    ("Alpha3", "<Keyboard>/3"),
    ("Alpha4", "<Keyboard>/4"),
    ("Alpha5", "<Keyboard>/5"),
    ("Alpha6", "<Keyboard>/6"),
    ("Alpha7", "<Keyboard>/7"),
    ("Alpha8", "<Keyboard>/8"),
    ("Alpha9", "<Keyboard>/9"),
    ("Numpad0", "<Keyboard>/numpad0"),
    ("Numpad1", "<Keyboard>/numpad1"),
    ("Numpad2", "<Keyboard>/numpad2"),
    ("Numpad3", "<Keyboard>/numpad3"),
    ("Numpad4", "<Keyboard>/numpad4"),
    ("Numpad5", "<Keyboard>/numpad5"),
    ("Numpad6", "<Keyboard>/numpad6"),
    ("Numpad7", "<Keyboard>/numpad7"),
    ("Numpad8", "<Keyboard>/numpad8"),
    ("Numpad9", "<Keyboard>/numpad9"),
    ("F1", "<Keyboard>/f1"),
    ("F2", "<Keyboard>/f2"),
    ("F3", "<Keyboard>/f3"),
    ("F4", "<Keyboard>/f4"),
    ("F5", "<Keyboard>/f5"),
    ("F6", "<Keyboard>/f6"),
    ("F7", "<Keyboard>/f7"),
    ("F8", "<Keyboard>/f8"),
    ("F9", "<Keyboard>/f9"),
    ("F10", "<Keyboard>/f10"),
    ("F11", "<Keyboard>/f11"),
    ("F12", "<Keyboard>/f12"),
    ("Backspace", "<Keyboard>/backspace"),
    ("Tab", "<Keyboard>/tab"),
    ("Clear", "<Keyboard>/clear"),
    ("Return", "<Keyboard>/enter"),
    ("Pause", "<Keyboard>/pause"),
    ("Escape", "<Keyboard>/escape"),
    ("Space", "<Keyboard>/space"),
    ("Delete", "<Keyboard>/delete"),
    ("Insert", "<Keyboard>/insert"),
    ("Home", "<Keyboard>/home"),
    ("End", "<Keyboard>/end"),
    ("PageUp", "<Keyboard>/pageUp"),
    ("PageDown", "<Keyboard>/pageDown"),
    ("LeftArrow", "<Keyboard>/leftArrow"),
    ("RightArrow", "<Keyboard>/rightArrow"),
    ("UpArrow", "<Keyboard>/upArrow"),
    ("DownArrow", "<Keyboard>/downArrow"),
    ("NumLock", "<Keyboard>/numLock"),
    ("CapsLock", "<Keyboard>/capsLock"),
    ("ScrollLock", "<Keyboard>/scrollLock"),
    ("RightShift", "<Keyboard>/rightShift"),
    ("LeftShift", "<Keyboard>/leftShift"),
    ("RightAlt", "<Keyboard>/rightAlt"),
    ("LeftAlt", "<Keyboard>/leftAlt"),
    ("RightControl", "<Keyboard>/rightCtrl"),
    ("LeftControl", "<Keyboard>/leftCtrl"),
    ("SemiColon", "<Keyboard>/semicolon"),
    ("Equal", "<Keyboard>/equals"),
    ("Comma", "<Keyboard>/comma"),
    ("Underscore", "<Keyboard>/underscore"),
    ("Period", "<Keyboard>/period"),
    ("Slash", "<Keyboard>/slash"),
    ("BackQuote", "<Keyboard>/backquote"),
    ("LeftBracket", "<Keyboard>/leftBracket"),
    ("Backslash", "<Keyboard>/backslash"),
    ("RightBracket", "<Keyboard>/rightBracket"),
    ("Quote", "<Keyboard>/quote"),
    // Mouse buttons share the keyboard device class
    ("MouseLeft", "<Mouse>/leftButton"),
    ("MouseRight", "<Mouse>/rightButton"),
    ("MouseMiddle", "<Mouse>/middleButton"),
];

fn four_way(mode: Vector2Mode, up: &str, down: &str, left: &str, right: &str) -> CatalogEntry {
    CatalogEntry::Composite(
        CompositeSpec::new(CompositeKind::Vector2 { mode })
            .add_part("up", up)
            .add_part("down", down)
            .add_part("left", left)
            .add_part("right", right),
    )
}

/// Binding table for one device class
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    device_class: DeviceClass,

    /// Binding key -> entry
    entries: HashMap<String, CatalogEntry>,

    /// Physical path -> simple binding key
    reverse: HashMap<ControlPath, String>,
}

impl DeviceCatalog {
    fn from_buttons(device_class: DeviceClass, buttons: &[(&str, &str)]) -> Self {
        let mut catalog = Self {
            device_class,
            entries: HashMap::new(),
            reverse: HashMap::new(),
        };
        for (key, path) in buttons {
            catalog.insert(key, CatalogEntry::Simple(ControlPath::from(*path)));
        }
        catalog
    }

    /// Built-in controller catalog
    pub fn controller() -> Self {
        Self::from_buttons(DeviceClass::Controller, CONTROLLER_BUTTONS)
            .with_entry(
                "LeftStick",
                four_way(
                    Vector2Mode::Analog,
                    "<Gamepad>/leftStick/up",
                    "<Gamepad>/leftStick/down",
                    "<Gamepad>/leftStick/left",
                    "<Gamepad>/leftStick/right",
                ),
            )
            .with_entry(
                "RightStick",
                four_way(
                    Vector2Mode::Analog,
                    "<Gamepad>/rightStick/up",
                    "<Gamepad>/rightStick/down",
                    "<Gamepad>/rightStick/left",
                    "<Gamepad>/rightStick/right",
                ),
            )
            .with_entry(
                "DPad",
                four_way(
                    Vector2Mode::DigitalNormalized,
                    "<Gamepad>/dpad/up",
                    "<Gamepad>/dpad/down",
                    "<Gamepad>/dpad/left",
                    "<Gamepad>/dpad/right",
                ),
            )
    }

    /// Built-in keyboard (and mouse) catalog
    pub fn keyboard() -> Self {
        Self::from_buttons(DeviceClass::Keyboard, KEYBOARD_BUTTONS)
            .with_entry(
                "WASD",
                four_way(
                    Vector2Mode::DigitalNormalized,
                    "<Keyboard>/w",
                    "<Keyboard>/s",
                    "<Keyboard>/a",
                    "<Keyboard>/d",
                ),
            )
            .with_entry(
                "Arrows",
                four_way(
                    Vector2Mode::DigitalNormalized,
                    "<Keyboard>/upArrow",
                    "<Keyboard>/downArrow",
                    "<Keyboard>/leftArrow",
                    "<Keyboard>/rightArrow",
                ),
            )
    }

    /// Built-in catalog for a device class
    pub fn for_class(device_class: DeviceClass) -> Self {
        match device_class {
            DeviceClass::Controller => Self::controller(),
            DeviceClass::Keyboard => Self::keyboard(),
        }
    }

    /// Add or replace an entry while building a catalog
    pub fn with_entry(mut self, key: impl Into<String>, entry: CatalogEntry) -> Self {
        self.insert(&key.into(), entry);
        self
    }

    fn insert(&mut self, key: &str, entry: CatalogEntry) {
        if let CatalogEntry::Simple(path) = &entry {
            self.reverse
                .entry(path.clone())
                .or_insert_with(|| key.to_string());
        }
        self.entries.insert(key.to_string(), entry);
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Simple binding key for a physical path
    pub fn reverse_lookup(&self, path: &ControlPath) -> Option<&str> {
        self.reverse.get(path).map(String::as_str)
    }

    /// Check that a key exists for this device class
    pub fn validate(&self, key: &str) -> Result<(), InputError> {
        if self.contains(key) {
            Ok(())
        } else {
            Err(InputError::InvalidBindingKey {
                key: key.to_string(),
                device_class: self.device_class,
            })
        }
    }

    /// Apply a binding key to an action on the target map
    pub fn apply(
        &self,
        key: &str,
        action: &str,
        target: &mut ActionMap,
    ) -> Result<ApplyOutcome, InputError> {
        let entry = self.get(key).ok_or_else(|| InputError::InvalidBindingKey {
            key: key.to_string(),
            device_class: self.device_class,
        })?;

        Ok(match entry {
            CatalogEntry::Simple(path) => {
                target.add_control(action, BoundControl::Simple(path.clone()));
                ApplyOutcome::Applied
            }
            CatalogEntry::Composite(spec) => spec.apply_to(key, action, target),
        })
    }
}

/// One catalog per device class
#[derive(Debug, Clone)]
pub struct Catalogs {
    controller: DeviceCatalog,
    keyboard: DeviceCatalog,
}

impl Catalogs {
    pub fn new(controller: DeviceCatalog, keyboard: DeviceCatalog) -> Self {
        Self {
            controller,
            keyboard,
        }
    }

    pub fn get(&self, device_class: DeviceClass) -> &DeviceCatalog {
        match device_class {
            DeviceClass::Controller => &self.controller,
            DeviceClass::Keyboard => &self.keyboard,
        }
    }
}

impl Default for Catalogs {
    fn default() -> Self {
        Self::new(DeviceCatalog::controller(), DeviceCatalog::keyboard())
    }
}
