//! Light state derivation

use domo_core::{RenderedState, Resource, STATE_OFF, STATE_ON};

/// A light is on iff its `state` flag is truthy. Brightness is reported
/// when present; an RGBW color needs all four channels.
pub(super) fn render(resource: &Resource) -> RenderedState {
    let state = if resource.state.flag("state") {
        STATE_ON
    } else {
        STATE_OFF
    };
    let mut rendered = RenderedState::new(state);

    if let Some(brightness) = resource.state.integer("brightness") {
        rendered = rendered.with_attribute("brightness", brightness);
    }

    let channels = ["red", "green", "blue", "white"].map(|c| resource.state.integer(c));
    if let [Some(r), Some(g), Some(b), Some(w)] = channels {
        rendered = rendered.with_attribute("rgbw_color", serde_json::json!([r, g, b, w]));
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use domo_core::ResourceKind;
    use serde_json::json;

    #[test]
    fn test_empty_state_is_off() {
        let resource = Resource::new("l1", ResourceKind::Light);
        assert_eq!(render(&resource), RenderedState::new(STATE_OFF));
    }

    #[test]
    fn test_on_with_brightness() {
        let resource = Resource::new("l1", ResourceKind::Light)
            .with_state("state", true)
            .with_state("brightness", 128);

        let rendered = render(&resource);
        assert_eq!(rendered.state, STATE_ON);
        assert_eq!(rendered.attribute("brightness"), Some(&json!(128)));
    }

    #[test]
    fn test_color_needs_all_channels() {
        let partial = Resource::new("l1", ResourceKind::Light)
            .with_state("state", true)
            .with_state("red", 255)
            .with_state("green", 16);
        assert_eq!(render(&partial).attribute("rgbw_color"), None);

        let full = partial.with_state("blue", 0).with_state("white", 64);
        assert_eq!(
            render(&full).attribute("rgbw_color"),
            Some(&json!([255, 16, 0, 64]))
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let resource = Resource::new("l1", ResourceKind::Light)
            .with_state("state", 1)
            .with_state("brightness", 40);
        assert_eq!(render(&resource), render(&resource));
    }
}
