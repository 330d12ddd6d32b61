//! Sensor state derivation

use domo_core::{RenderedState, Resource, ResourceMeta, STATE_UNKNOWN};

/// The sensor's `value` is rendered as the state string; unit and device
/// class come from the resource's declared capabilities.
pub(super) fn render(resource: &Resource) -> RenderedState {
    let state = match resource.state.get("value") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => STATE_UNKNOWN.to_string(),
    };
    let mut rendered = RenderedState::new(state);

    if let ResourceMeta::Sensor(meta) = &resource.meta {
        if let Some(ref unit) = meta.unit_of_measurement {
            rendered = rendered.with_attribute("unit_of_measurement", unit.clone());
        }
        if let Some(ref device_class) = meta.device_class {
            rendered = rendered.with_attribute("device_class", device_class.clone());
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use domo_core::{ResourceKind, SensorMeta};
    use serde_json::json;

    #[test]
    fn test_numeric_value_with_unit() {
        let resource = Resource::new("t1", ResourceKind::Sensor)
            .with_state("value", 21.5)
            .with_meta(ResourceMeta::Sensor(SensorMeta {
                device_class: Some("temperature".to_string()),
                unit_of_measurement: Some("°C".to_string()),
            }));

        let rendered = render(&resource);
        assert_eq!(rendered.state, "21.5");
        assert_eq!(
            rendered.attribute("unit_of_measurement"),
            Some(&json!("°C"))
        );
    }

    #[test]
    fn test_missing_value_is_unknown() {
        let resource = Resource::new("t1", ResourceKind::Sensor);
        assert_eq!(render(&resource).state, STATE_UNKNOWN);
    }
}
