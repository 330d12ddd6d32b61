//! Climate state derivation

use domo_core::{RenderedState, Resource, STATE_UNKNOWN};

const STATE_HEAT: &str = "heat";
const STATE_OFF: &str = "off";

/// Heating zones report `heat` or `off` from the `heating` flag; a zone
/// that has not reported yet is unknown.
pub(super) fn render(resource: &Resource) -> RenderedState {
    let state = match resource.state.get("heating") {
        Some(_) if resource.state.flag("heating") => STATE_HEAT,
        Some(_) => STATE_OFF,
        None => STATE_UNKNOWN,
    };
    let mut rendered = RenderedState::new(state);

    if let Some(current) = resource.state.number("current_temperature") {
        rendered = rendered.with_attribute("current_temperature", current);
    }
    if let Some(target) = resource.state.number("target_temperature") {
        rendered = rendered.with_attribute("temperature", target);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use domo_core::ResourceKind;
    use serde_json::json;

    #[test]
    fn test_heating_flag_drives_state() {
        let heating = Resource::new("z1", ResourceKind::Climate)
            .with_state("heating", true)
            .with_state("current_temperature", 19.5)
            .with_state("target_temperature", 21.0);

        let rendered = render(&heating);
        assert_eq!(rendered.state, STATE_HEAT);
        assert_eq!(
            rendered.attribute("current_temperature"),
            Some(&json!(19.5))
        );
        assert_eq!(rendered.attribute("temperature"), Some(&json!(21.0)));

        let idle = Resource::new("z1", ResourceKind::Climate).with_state("heating", false);
        assert_eq!(render(&idle).state, STATE_OFF);
    }

    #[test]
    fn test_unreported_zone_is_unknown() {
        let resource = Resource::new("z1", ResourceKind::Climate);
        assert_eq!(render(&resource).state, STATE_UNKNOWN);
    }
}
