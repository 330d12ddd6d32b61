//! Text state derivation

use domo_core::{RenderedState, Resource};

/// Text entities carry the raw string through; absent state renders empty.
pub(super) fn render(resource: &Resource) -> RenderedState {
    RenderedState::new(resource.state.text("state").unwrap_or_default())
}
