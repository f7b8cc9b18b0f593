//! The state-machine driver.
//!
//! Game states are polymorphic reflected classes deriving from [`State`].
//! The [`Manager`] owns the current state through a
//! [`PolyStorage`](crate::reflect::PolyStorage) and drives transitions from
//! *strings*: each tick, a state may write the textual form of the next state
//! (e.g. `World{level=2}`, or `0` for "stop") into the string it is handed,
//! and the manager deserializes and installs it before the next tick.

use log::debug;

use crate::reflect::{self, PolyStorage};

/// The base trait for states. Implementations must be registered with
/// [`poly_register!`](crate::poly_register) under this trait to be loadable
/// from text.
pub trait State: reflect::poly::PolyBase {
    /// Called once, right after the state is constructed and its fields are
    /// deserialized.
    fn init(&mut self) {}

    /// Advance the state. Assign the textual form of the next state to
    /// `next_state` to request a transition; write `0` for the null state.
    fn tick(&mut self, next_state: &mut String);
}

/// Owns and drives one current state.
#[derive(Default)]
pub struct Manager {
    state: PolyStorage<dyn State>,
    next_state: String,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there is a current state. Once this turns false, the main loop
    /// should stop.
    pub fn is_running(&self) -> bool {
        !self.state.is_null()
    }

    /// The registered name of the current state, if any.
    pub fn state_name(&self) -> Option<&'static str> {
        self.state.name()
    }

    /// Read access to the current state.
    pub fn state(&self) -> &PolyStorage<dyn State> {
        &self.state
    }

    /// Replace the current state with one parsed from text, then `init` it.
    pub fn set_state(&mut self, text: &str) -> reflect::Result<()> {
        self.state = reflect::from_string(text)?;
        debug!("state set to `{}`", self.state.name().unwrap_or("<null>"));
        if let Some(state) = self.state.base_mut() {
            state.init();
        }
        Ok(())
    }

    /// Advance one tick.
    ///
    /// A pending transition is applied right before ticking, so there is
    /// never a current state that hasn't been ticked yet (it couldn't, say,
    /// be rendered before its first update).
    pub fn tick(&mut self) -> reflect::Result<()> {
        if !self.next_state.is_empty() {
            let next = std::mem::take(&mut self.next_state);
            self.set_state(&next)?;
        }
        if let Some(state) = self.state.base_mut() {
            state.tick(&mut self.next_state);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::poly::test_support::{Initial, World, ensure_registered};
    use crate::reflect::{ToStringOptions, to_string};

    #[test]
    fn manager_runs_transitions_from_strings() {
        // Given
        ensure_registered();
        let mut manager = Manager::new();
        assert!(!manager.is_running());

        // When
        manager.set_state("Initial{angle=0.5}").unwrap();

        // Then
        assert!(manager.is_running());
        assert_eq!(manager.state_name(), Some("Initial"));
        assert_eq!(manager.state().derived::<Initial>().unwrap().angle, 0.5);

        // And When - Initial requests World, which counts down twice and then
        // requests the null state.
        manager.tick().unwrap(); // Initial sets next = World{countdown=2}.
        manager.tick().unwrap(); // Swap to World, countdown 2 -> 1.
        assert_eq!(manager.state_name(), Some("World"));
        assert_eq!(manager.state().derived::<World>().unwrap().countdown, 1);
        manager.tick().unwrap(); // countdown 1 -> 0.
        manager.tick().unwrap(); // countdown 0: request null.
        manager.tick().unwrap(); // Swap to null; nothing ticks.

        // Then
        assert!(!manager.is_running());
        assert_eq!(manager.state_name(), None);
    }

    #[test]
    fn states_round_trip_as_polymorphic_text() {
        // Given
        ensure_registered();
        let storage = PolyStorage::<dyn State>::new(Initial { angle: 0.5 }).unwrap();

        // Then - Compact and pretty forms, exactly.
        assert_eq!(
            to_string(&storage, &ToStringOptions::default()).unwrap(),
            "Initial{angle=0.5}"
        );
        assert_eq!(
            to_string(&storage, &ToStringOptions::pretty(4)).unwrap(),
            "Initial {angle = 0.5}"
        );
    }

    #[test]
    fn state_names_index_in_sorted_order() {
        // Given
        ensure_registered();

        // Then - Initial < World lexicographically.
        assert_eq!(crate::reflect::poly::name_to_index::<dyn State>("Initial"), Some(0));
        assert_eq!(crate::reflect::poly::name_to_index::<dyn State>("World"), Some(1));
    }

    #[test]
    fn invalid_state_strings_are_reported() {
        // Given
        ensure_registered();
        let mut manager = Manager::new();

        // Then
        assert!(manager.set_state("NoSuchState{}").is_err());
        assert!(!manager.is_running());
    }
}
