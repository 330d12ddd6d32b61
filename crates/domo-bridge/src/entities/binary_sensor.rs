//! Binary sensor state derivation

use domo_core::{RenderedState, Resource, ResourceMeta, STATE_OFF, STATE_ON};

pub(super) fn render(resource: &Resource) -> RenderedState {
    let state = if resource.state.flag("state") {
        STATE_ON
    } else {
        STATE_OFF
    };
    let mut rendered = RenderedState::new(state);

    if let ResourceMeta::BinarySensor(meta) = &resource.meta {
        if let Some(ref device_class) = meta.device_class {
            rendered = rendered.with_attribute("device_class", device_class.clone());
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use domo_core::{BinarySensorMeta, ResourceKind};
    use serde_json::json;

    #[test]
    fn test_device_class_attribute() {
        let resource = Resource::new("b1", ResourceKind::BinarySensor)
            .with_state("state", true)
            .with_meta(ResourceMeta::BinarySensor(BinarySensorMeta {
                device_class: Some("motion".to_string()),
            }));

        let rendered = render(&resource);
        assert_eq!(rendered.state, STATE_ON);
        assert_eq!(rendered.attribute("device_class"), Some(&json!("motion")));
    }
}
