//! Mode arbitration between the local button and the remote peer.
//!
//! The arbiter decides, once per polling tick, which mode the strand should
//! be in and who owns that decision. In local-only operation the button
//! level is the mode. Once a peer is connected a button press hands the
//! session to the peer: the strand goes active, the peer is told, and from
//! then on only the peer can end the session by sending idle (or by
//! dropping the connection).

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::{mode::Mode, status::codec::DecodeError};

mod cell;

pub use cell::StateCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterState {
    pub current_mode: Mode,
    pub peer_connected: bool,
    /// The peer decides when the current session ends; button edges are
    /// ignored while this is set
    pub peer_owns_mode: bool,
    /// No active animation is left on the strand
    pub strand_cleared: bool,
    /// One-shot: the mode was (re)entered and cursors must restart
    pub mode_changed: bool,
    pub button_latched: bool,
    /// One-shot: the strand must be cleared before the next frame
    pub clear_requested: bool,
}

impl Default for ArbiterState {
    fn default() -> Self {
        Self {
            current_mode: Mode::Idle,
            peer_connected: false,
            peer_owns_mode: false,
            strand_cleared: true,
            mode_changed: false,
            button_latched: false,
            clear_requested: false,
        }
    }
}

/// Something the arbiter wants sent to the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Mode(Mode),
    Diagnostic(String),
}

#[derive(Debug, Default)]
pub struct ModeArbiter {
    state: ArbiterState,
    outbound: VecDeque<Outbound>,
}

impl ModeArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// Losing the peer hands control back to the button without forcing a
    /// mode; the next tick resolves the mode from the button level.
    pub fn set_peer_connected(&mut self, connected: bool) {
        if self.state.peer_connected == connected {
            return;
        }

        self.state.peer_connected = connected;
        if connected {
            info!("Arbiter: peer connected");
        } else {
            info!("Arbiter: peer disconnected, button is authoritative");
            self.state.peer_owns_mode = false;
        }
    }

    pub fn drain_outbound(&mut self) -> impl Iterator<Item = Outbound> + '_ {
        self.outbound.drain(..)
    }

    pub fn tick(&mut self, button_pressed: bool, peer_message: Option<i64>) -> ArbiterState {
        self.state.mode_changed = false;
        self.state.clear_requested = false;

        match peer_message {
            Some(code) => self.peer_message(code, button_pressed),
            None if !self.state.peer_connected => self.local_only(button_pressed),
            None => self.shared(button_pressed),
        }

        self.state
    }

    /// Clear the strand and start `mode` from its base state
    fn enter(&mut self, mode: Mode) {
        debug!("Arbiter: {} -> {}", self.state.current_mode, mode);
        self.state.current_mode = mode;
        self.state.mode_changed = true;
        self.state.clear_requested = true;
        self.state.strand_cleared = mode == Mode::Idle;
    }

    /// Rule 1. A peer Active takes ownership every time, but the mode is only
    /// re-entered (and `mode_changed` set) when it differs from the current
    /// one, so a peer repeating Active keeps the running scan.
    fn peer_message(&mut self, code: i64, button_pressed: bool) {
        self.state.button_latched = button_pressed;

        let mode = match Mode::try_from(code) {
            Ok(mode) => mode,
            Err(code) => {
                let diagnostic = DecodeError::UnknownCode(code).to_string();
                warn!("Arbiter: {}", diagnostic);
                self.outbound.push_back(Outbound::Diagnostic(diagnostic));
                return;
            }
        };

        match mode {
            Mode::Idle => {
                if self.state.peer_owns_mode {
                    info!("Arbiter: peer released the mode");
                    self.state.peer_owns_mode = false;
                }

                // A held button keeps the strand where it is
                if !button_pressed && self.state.current_mode != Mode::Idle {
                    self.enter(Mode::Idle);
                }
            }
            mode => {
                if !self.state.peer_connected {
                    warn!("Arbiter: ignoring {} from a disconnected peer", mode);
                    return;
                }

                info!("Arbiter: peer took the mode ({})", mode);
                self.state.peer_owns_mode = true;
                if self.state.current_mode != mode {
                    self.enter(mode);
                }
            }
        }
    }

    fn local_only(&mut self, button_pressed: bool) {
        let edge = button_pressed != self.state.button_latched;
        self.state.button_latched = button_pressed;

        let target = if button_pressed {
            Mode::Active
        } else {
            Mode::Idle
        };

        if edge || self.state.current_mode != target {
            info!(
                "Arbiter: button {}",
                if button_pressed { "pressed" } else { "released" }
            );
            self.enter(target);
        }
    }

    fn shared(&mut self, button_pressed: bool) {
        self.state.button_latched = button_pressed;

        if self.state.peer_owns_mode {
            return;
        }

        if button_pressed {
            if self.state.strand_cleared && self.state.current_mode == Mode::Idle {
                info!("Arbiter: button pressed, handing the session to the peer");
                self.state.peer_owns_mode = true;
                self.enter(Mode::Active);
                self.outbound.push_back(Outbound::Mode(Mode::Active));
            } else if !self.state.strand_cleared {
                let changed = self.state.current_mode != Mode::Idle;
                self.state.current_mode = Mode::Idle;
                self.state.clear_requested = true;
                self.state.strand_cleared = true;
                self.state.mode_changed = changed;
            }
        } else if self.state.current_mode != Mode::Idle {
            self.enter(Mode::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> ModeArbiter {
        let mut arbiter = ModeArbiter::new();
        arbiter.set_peer_connected(true);
        arbiter
    }

    #[test]
    fn test_initial_state() {
        let state = ModeArbiter::new().state();
        assert_eq!(Mode::Idle, state.current_mode);
        assert!(!state.peer_owns_mode);
        assert!(!state.peer_connected);
        assert!(state.strand_cleared);
        assert!(!state.mode_changed);
    }

    #[test]
    fn test_local_only_press_and_release() {
        let mut arbiter = ModeArbiter::new();

        let state = arbiter.tick(false, None);
        assert_eq!(Mode::Idle, state.current_mode);
        assert!(!state.mode_changed);

        // Press edge
        let state = arbiter.tick(true, None);
        assert_eq!(Mode::Active, state.current_mode);
        assert!(state.mode_changed);
        assert!(state.clear_requested);
        assert!(state.button_latched);

        // Held: no further transitions
        for _ in 0..10 {
            let state = arbiter.tick(true, None);
            assert_eq!(Mode::Active, state.current_mode);
            assert!(!state.mode_changed);
            assert!(!state.clear_requested);
        }

        // Release edge clears exactly once
        let state = arbiter.tick(false, None);
        assert_eq!(Mode::Idle, state.current_mode);
        assert!(state.mode_changed);
        assert!(state.clear_requested);
        assert!(!state.button_latched);

        let state = arbiter.tick(false, None);
        assert!(!state.mode_changed);
        assert!(!state.clear_requested);

        assert_eq!(0, arbiter.drain_outbound().count());
    }

    #[test]
    fn test_peer_driven_session() {
        let mut arbiter = connected();

        let state = arbiter.tick(false, Some(1));
        assert_eq!(Mode::Active, state.current_mode);
        assert!(state.peer_owns_mode);
        assert!(state.mode_changed);

        // Button presses while the peer owns the mode change nothing
        for pressed in [true, false, true, false] {
            let state = arbiter.tick(pressed, None);
            assert_eq!(Mode::Active, state.current_mode);
            assert!(state.peer_owns_mode);
            assert!(!state.mode_changed);
        }

        let state = arbiter.tick(false, Some(0));
        assert!(!state.peer_owns_mode);
        assert_eq!(Mode::Idle, state.current_mode);
        assert!(state.mode_changed);
        assert!(state.clear_requested);
    }

    #[test]
    fn test_repeated_peer_active_keeps_the_scan() {
        let mut arbiter = connected();

        let state = arbiter.tick(false, Some(1));
        assert!(state.mode_changed);

        let state = arbiter.tick(false, Some(1));
        assert_eq!(Mode::Active, state.current_mode);
        assert!(state.peer_owns_mode);
        assert!(!state.mode_changed);
        assert!(!state.clear_requested);
    }

    #[test]
    fn test_button_hands_session_to_peer() {
        let mut arbiter = connected();

        let state = arbiter.tick(true, None);
        assert_eq!(Mode::Active, state.current_mode);
        assert!(state.peer_owns_mode);
        assert!(state.mode_changed);
        assert!(!state.strand_cleared);
        assert_eq!(
            vec![Outbound::Mode(Mode::Active)],
            arbiter.drain_outbound().collect::<Vec<_>>()
        );

        // Releasing the button does not end the session
        let state = arbiter.tick(false, None);
        assert_eq!(Mode::Active, state.current_mode);
        assert!(state.peer_owns_mode);
        assert_eq!(0, arbiter.drain_outbound().count());

        // The peer acknowledges by sending idle
        let state = arbiter.tick(false, Some(0));
        assert_eq!(Mode::Idle, state.current_mode);
        assert!(!state.peer_owns_mode);
        assert!(state.strand_cleared);
    }

    #[test]
    fn test_release_while_button_held_does_not_force_mode() {
        let mut arbiter = connected();
        arbiter.tick(true, None);
        arbiter.drain_outbound().for_each(drop);

        let state = arbiter.tick(true, Some(0));
        assert!(!state.peer_owns_mode);
        assert_eq!(Mode::Active, state.current_mode);
        assert!(!state.mode_changed);

        // The active animation is still on the strand, so it gets cleared
        // before anything new starts
        let state = arbiter.tick(true, None);
        assert_eq!(Mode::Idle, state.current_mode);
        assert!(state.clear_requested);
        assert!(state.mode_changed);
        assert!(state.strand_cleared);
        assert_eq!(0, arbiter.drain_outbound().count());
    }

    #[test]
    fn test_release_after_peer_release_goes_idle() {
        let mut arbiter = connected();
        arbiter.tick(true, None);
        arbiter.tick(true, Some(0));

        let state = arbiter.tick(false, None);
        assert_eq!(Mode::Idle, state.current_mode);
        assert!(state.mode_changed);
        assert!(state.clear_requested);
        assert!(state.strand_cleared);
    }

    #[test]
    fn test_unknown_code_is_reported() {
        let mut arbiter = connected();
        let before = arbiter.tick(false, None);

        let state = arbiter.tick(false, Some(7));
        assert_eq!(before.current_mode, state.current_mode);
        assert_eq!(before.peer_owns_mode, state.peer_owns_mode);
        assert!(!state.mode_changed);

        let outbound: Vec<_> = arbiter.drain_outbound().collect();
        assert_eq!(1, outbound.len());
        assert!(matches!(&outbound[0], Outbound::Diagnostic(text) if text.contains('7')));
    }

    #[test]
    fn test_disconnect_drops_ownership() {
        let mut arbiter = connected();
        arbiter.tick(false, Some(1));
        assert!(arbiter.state().peer_owns_mode);

        arbiter.set_peer_connected(false);
        let state = arbiter.state();
        assert!(!state.peer_owns_mode);
        // No mode is forced by the drop itself
        assert_eq!(Mode::Active, state.current_mode);

        // The button decides from the next tick on
        let state = arbiter.tick(false, None);
        assert_eq!(Mode::Idle, state.current_mode);
        assert!(state.mode_changed);
    }

    #[test]
    fn test_ownership_is_exclusive() {
        // Walk a fixed pseudo-random event sequence and check that no tick
        // where the peer owns the mode lets a button edge change it
        let mut arbiter = ModeArbiter::new();
        let mut seed: u32 = 0x2545_f491;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed
        };

        for _ in 0..5_000 {
            let roll = next();
            match roll % 16 {
                0 => arbiter.set_peer_connected(true),
                1 => arbiter.set_peer_connected(false),
                _ => {}
            }

            let before = arbiter.state();
            let pressed = roll & 0x100 != 0;
            let message = match (roll >> 12) % 8 {
                0 => Some(0),
                1 => Some(1),
                2 => Some(5),
                _ => None,
            };
            let after = arbiter.tick(pressed, message);
            arbiter.drain_outbound().for_each(drop);

            if before.peer_owns_mode && message.is_none() {
                assert_eq!(before.current_mode, after.current_mode);
                assert!(after.peer_owns_mode);
                assert!(!after.mode_changed);
            }
            if after.peer_owns_mode {
                assert!(after.peer_connected);
            }
        }
    }
}
