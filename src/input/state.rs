// Button state automaton

use crate::core::math::is_active;
use std::fmt;

/// Debounced per-tick state of a button-kind action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ButtonState {
    /// Not pressed
    #[default]
    Up,
    /// Became active this tick
    Pressed,
    /// Active for more than one tick
    Held,
    /// Became inactive this tick
    Released,
    /// Marked as handled by external logic; suppresses re-triggering until released
    Consumed,
}

impl ButtonState {
    /// Advance the automaton by one tick
    ///
    /// `Consumed` is never entered here; it only comes from [`ButtonState::consume`]
    /// and is left once the control is released.
    pub fn next(self, raw_active: bool) -> ButtonState {
        match (self, raw_active) {
            (ButtonState::Consumed, true) => ButtonState::Consumed,
            (ButtonState::Consumed, false) => ButtonState::Up,
            (ButtonState::Pressed | ButtonState::Held, true) => ButtonState::Held,
            (_, true) => ButtonState::Pressed,
            (ButtonState::Up | ButtonState::Released, false) => ButtonState::Up,
            (_, false) => ButtonState::Released,
        }
    }

    /// Advance the automaton from an analog magnitude
    pub fn next_from_magnitude(self, magnitude: f32) -> ButtonState {
        self.next(is_active(magnitude))
    }

    /// The externally injected transition
    pub fn consume(self) -> ButtonState {
        ButtonState::Consumed
    }

    /// Became active this tick
    pub fn is_pressed(&self) -> bool {
        matches!(self, ButtonState::Pressed)
    }

    /// Active for more than one tick
    pub fn is_held(&self) -> bool {
        matches!(self, ButtonState::Held)
    }

    /// Became inactive this tick
    pub fn is_released(&self) -> bool {
        matches!(self, ButtonState::Released)
    }

    /// Pressed or held, and not consumed
    pub fn is_down(&self) -> bool {
        matches!(self, ButtonState::Pressed | ButtonState::Held)
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self, ButtonState::Consumed)
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ButtonState::Up => "Up",
            ButtonState::Pressed => "Pressed",
            ButtonState::Held => "Held",
            ButtonState::Released => "Released",
            ButtonState::Consumed => "Consumed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(start: ButtonState, raw: &[bool]) -> Vec<ButtonState> {
        let mut state = start;
        raw.iter()
            .map(|&active| {
                state = state.next(active);
                state
            })
            .collect()
    }

    #[test]
    fn test_press_hold_release_sequence() {
        let states = run(ButtonState::Up, &[false, true, true, false, false]);
        assert_eq!(
            states,
            vec![
                ButtonState::Up,
                ButtonState::Pressed,
                ButtonState::Held,
                ButtonState::Released,
                ButtonState::Up,
            ]
        );
    }

    #[test]
    fn test_consumed_suppresses_retrigger() {
        let states = run(ButtonState::Consumed, &[true, true, false, true]);
        assert_eq!(
            states,
            vec![
                ButtonState::Consumed,
                ButtonState::Consumed,
                ButtonState::Up,
                ButtonState::Pressed,
            ]
        );
    }

    #[test]
    fn test_release_then_press_again() {
        assert_eq!(ButtonState::Released.next(true), ButtonState::Pressed);
        assert_eq!(ButtonState::Released.next(false), ButtonState::Up);
    }

    #[test]
    fn test_automaton_never_enters_consumed() {
        let all = [
            ButtonState::Up,
            ButtonState::Pressed,
            ButtonState::Held,
            ButtonState::Released,
        ];
        for state in all {
            for active in [true, false] {
                assert_ne!(state.next(active), ButtonState::Consumed);
            }
        }
    }

    #[test]
    fn test_magnitude_threshold() {
        assert_eq!(ButtonState::Up.next_from_magnitude(0.5), ButtonState::Up);
        assert_eq!(ButtonState::Up.next_from_magnitude(0.75), ButtonState::Pressed);
    }

    #[test]
    fn test_queries() {
        assert!(ButtonState::Pressed.is_pressed());
        assert!(ButtonState::Pressed.is_down());
        assert!(ButtonState::Held.is_down());
        assert!(!ButtonState::Consumed.is_down());
        assert!(ButtonState::Released.is_released());
        assert_eq!(ButtonState::default(), ButtonState::Up);
    }
}
