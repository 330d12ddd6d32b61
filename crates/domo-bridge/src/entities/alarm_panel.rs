//! Alarm panel state derivation

use domo_core::{RenderedState, Resource};

pub const STATE_DISARMED: &str = "disarmed";
pub const STATE_ARMED_AWAY: &str = "armed_away";
pub const STATE_ARMING: &str = "arming";
pub const STATE_PENDING: &str = "pending";
pub const STATE_TRIGGERED: &str = "triggered";

/// Derive the panel state from its flags, evaluated in fixed precedence
/// order: armed, arming (or arming_10s), breached, alarm. A later flag
/// always overrides an earlier one when both are set.
pub(super) fn render(resource: &Resource) -> RenderedState {
    let state = &resource.state;
    let mut panel = STATE_DISARMED;

    if state.flag("armed") {
        panel = STATE_ARMED_AWAY;
    }
    if state.flag("arming") || state.flag("arming_10s") {
        panel = STATE_ARMING;
    }
    if state.flag("breached") {
        panel = STATE_PENDING;
    }
    if state.flag("alarm") {
        panel = STATE_TRIGGERED;
    }

    RenderedState::new(panel)
}
