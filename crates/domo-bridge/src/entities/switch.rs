//! Switch state derivation

use domo_core::{RenderedState, Resource, STATE_OFF, STATE_ON};

pub(super) fn render(resource: &Resource) -> RenderedState {
    if resource.state.flag("state") {
        RenderedState::new(STATE_ON)
    } else {
        RenderedState::new(STATE_OFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domo_core::ResourceKind;

    #[test]
    fn test_truthy_state_is_on() {
        let on = Resource::new("s1", ResourceKind::Switch).with_state("state", 1);
        assert_eq!(render(&on).state, STATE_ON);

        let off = Resource::new("s1", ResourceKind::Switch).with_state("state", false);
        assert_eq!(render(&off).state, STATE_OFF);

        let empty = Resource::new("s1", ResourceKind::Switch);
        assert_eq!(render(&empty).state, STATE_OFF);
    }
}
