//! Valve state derivation

use domo_core::{RenderedState, Resource, STATE_UNKNOWN};

/// Valves are covers without tilt: the state string passes through and the
/// position is reported only when present.
pub(super) fn render(resource: &Resource) -> RenderedState {
    let state = resource.state.text("state").unwrap_or(STATE_UNKNOWN);
    let mut rendered = RenderedState::new(state);

    if let Some(position) = resource.state.integer("position") {
        rendered = rendered.with_attribute("current_position", position);
    }
    rendered
}
