//! Cover state derivation

use domo_core::{RenderedState, Resource, ResourceMeta, STATE_UNKNOWN};

/// Covers carry their state string (`open`, `closed`, `opening`,
/// `closing`) through from the bridge. Positions are reported only when
/// present.
pub(super) fn render(resource: &Resource) -> RenderedState {
    let state = resource.state.text("state").unwrap_or(STATE_UNKNOWN);
    let mut rendered = RenderedState::new(state);

    if let Some(position) = resource.state.integer("position") {
        rendered = rendered.with_attribute("current_position", position);
    }
    if let Some(tilt) = resource.state.integer("tilt_position") {
        rendered = rendered.with_attribute("current_tilt_position", tilt);
    }
    if let ResourceMeta::Cover(meta) = &resource.meta {
        if let Some(ref device_class) = meta.device_class {
            rendered = rendered.with_attribute("device_class", device_class.clone());
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use domo_core::ResourceKind;
    use serde_json::json;

    #[test]
    fn test_positions_only_when_present() {
        let bare = Resource::new("c1", ResourceKind::Cover).with_state("state", "open");
        let rendered = render(&bare);
        assert_eq!(rendered.state, "open");
        assert_eq!(rendered.attribute("current_position"), None);
        assert_eq!(rendered.attribute("current_tilt_position"), None);

        let positioned = bare
            .with_state("position", 40)
            .with_state("tilt_position", 10);
        let rendered = render(&positioned);
        assert_eq!(rendered.attribute("current_position"), Some(&json!(40)));
        assert_eq!(
            rendered.attribute("current_tilt_position"),
            Some(&json!(10))
        );
    }

    #[test]
    fn test_missing_state_is_unknown() {
        let resource = Resource::new("c1", ResourceKind::Cover);
        assert_eq!(render(&resource).state, STATE_UNKNOWN);
    }
}
