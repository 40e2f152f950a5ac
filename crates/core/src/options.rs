//! Opaque processing options handed to the transformation engine.
//!
//! The bag is never validated field by field; the engine adapters only
//! decide how to put it on the wire (CLI flags or multipart fields).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Named engine options (detector/recognizer/enhancer models, execution
/// providers, thread and queue counts, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineOptions(Map<String, Value>);

impl EngineOptions {
    /// An empty bag.
    pub fn empty() -> Self {
        Self(Map::new())
    }

    /// Default bag, overlaid with caller overrides. A `null` override removes
    /// the default entirely.
    pub fn with_overrides(overrides: Map<String, Value>) -> Self {
        let mut options = Self::default();
        for (key, value) in overrides {
            if value.is_null() {
                options.0.remove(&key);
            } else {
                options.0.insert(key, value);
            }
        }
        options
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        let defaults = json!({
            "face_selector_mode": "many",
            "face_analyser_order": "left-right",
            "face_analyser_age": "all",
            "face_analyser_gender": "all",
            "face_detector_model": "retinaface",
            "face_recognizer_model": "arcface_inswapper",
            "face_mask_type": "box",
            "face_enhancer_model": "gfpgan_1.4",
            "frame_enhancer_model": "real_esrgan_x4plus",
            "execution_providers": ["cpu"],
            "execution_thread_count": 4,
            "execution_queue_count": 1,
        });
        match defaults {
            Value::Object(map) => Self(map),
            _ => Self::empty(),
        }
    }
}

/// Render a scalar option value as plain text (strings unquoted).
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_the_models_and_providers() {
        let options = EngineOptions::default();
        assert_eq!(options.get("face_detector_model"), Some(&json!("retinaface")));
        assert_eq!(options.get("execution_providers"), Some(&json!(["cpu"])));
        assert_eq!(options.get("execution_thread_count"), Some(&json!(4)));
        assert_eq!(options.len(), 12);
    }

    #[test]
    fn overrides_replace_and_extend_defaults() {
        let overrides = json!({
            "execution_providers": ["cuda"],
            "face_detector_score": 0.5,
        });
        let Value::Object(map) = overrides else {
            panic!("object literal");
        };
        let options = EngineOptions::with_overrides(map);
        assert_eq!(options.get("execution_providers"), Some(&json!(["cuda"])));
        assert_eq!(options.get("face_detector_score"), Some(&json!(0.5)));
        assert_eq!(options.get("face_mask_type"), Some(&json!("box")));
    }

    #[test]
    fn null_override_removes_default() {
        let Value::Object(map) = json!({ "frame_enhancer_model": null }) else {
            panic!("object literal");
        };
        let options = EngineOptions::with_overrides(map);
        assert!(options.get("frame_enhancer_model").is_none());
    }

    #[test]
    fn value_to_text_unquotes_strings() {
        assert_eq!(value_to_text(&json!("gfpgan_1.4")), "gfpgan_1.4");
        assert_eq!(value_to_text(&json!(4)), "4");
        assert_eq!(value_to_text(&json!(true)), "true");
    }
}
