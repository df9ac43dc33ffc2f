//! Render settings persisted with the job report.

use serde::{Deserialize, Serialize};

/// Viewport settings recorded in `processing_info.settings`.
///
/// Only the values that influence the produced image are persisted here;
/// timeouts and wait budgets are runtime concerns and stay out of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub dark_mode: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            dark_mode: false,
        }
    }
}

impl RenderSettings {
    /// Square aspect ratio used for social-media style exports.
    pub fn square() -> Self {
        Self {
            width: 2560,
            height: 2560,
            dark_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_full_hd() {
        let s = RenderSettings::default();
        assert_eq!((s.width, s.height), (1920, 1080));
        assert!(!s.dark_mode);
    }

    #[test]
    fn dark_mode_defaults_to_false_when_missing() {
        let s: RenderSettings = serde_json::from_str(r#"{"width": 800, "height": 600}"#).unwrap();
        assert!(!s.dark_mode);
    }
}
