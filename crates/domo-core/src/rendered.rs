//! Displayed projection of a resource
//!
//! A `RenderedState` is derived fresh from a resource's state map by the
//! kind-specific renderers. Rendering is a pure function: identical input
//! state produces an identical projection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Common state value for "on".
pub const STATE_ON: &str = "on";
/// Common state value for "off".
pub const STATE_OFF: &str = "off";
/// State value when a resource carries no usable state.
pub const STATE_UNKNOWN: &str = "unknown";

/// State string plus attributes, as shown to the host platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedState {
    pub state: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Default for RenderedState {
    fn default() -> Self {
        Self::new(STATE_UNKNOWN)
    }
}

impl RenderedState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_content_based() {
        let a = RenderedState::new(STATE_ON).with_attribute("brightness", 128);
        let b = RenderedState::new(STATE_ON).with_attribute("brightness", 128);
        assert_eq!(a, b);

        let c = RenderedState::new(STATE_ON).with_attribute("brightness", 129);
        assert_ne!(a, c);
    }
}
