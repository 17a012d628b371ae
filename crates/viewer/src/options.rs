use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

/// Construction options forwarded verbatim to the engine.
///
/// Defaults hide the help button and the address search, and keep the info
/// panel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    pub disable_help_button: bool,
    pub disable_geocoder: bool,
    pub disable_info_box: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            disable_help_button: true,
            disable_geocoder: true,
            disable_info_box: false,
        }
    }
}

impl ViewerOptions {
    /// Reads `VIEWER_DISABLE_HELP_BUTTON`, `VIEWER_DISABLE_GEOCODER` and
    /// `VIEWER_DISABLE_INFO_BOX`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            disable_help_button: env_flag(
                &lookup,
                "VIEWER_DISABLE_HELP_BUTTON",
                defaults.disable_help_button,
            ),
            disable_geocoder: env_flag(&lookup, "VIEWER_DISABLE_GEOCODER", defaults.disable_geocoder),
            disable_info_box: env_flag(&lookup, "VIEWER_DISABLE_INFO_BOX", defaults.disable_info_box),
        }
    }

    /// Engine constructor options in the engine's own (enable-flag) terms.
    pub fn engine_options(&self) -> serde_json::Value {
        json!({
            "navigationHelpButton": !self.disable_help_button,
            "geocoder": !self.disable_geocoder,
            "infoBox": !self.disable_info_box,
        })
    }
}

fn env_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("ignoring {key}={raw:?}: expected a boolean");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ViewerOptions;
    use serde_json::json;

    #[test]
    fn defaults_hide_help_and_search() {
        let opts = ViewerOptions::default();
        assert!(opts.disable_help_button);
        assert!(opts.disable_geocoder);
        assert!(!opts.disable_info_box);
        assert_eq!(
            opts.engine_options(),
            json!({"navigationHelpButton": false, "geocoder": false, "infoBox": true})
        );
    }

    #[test]
    fn lookup_overrides_and_ignores_garbage() {
        let opts = ViewerOptions::from_lookup(|key| match key {
            "VIEWER_DISABLE_GEOCODER" => Some("off".to_string()),
            "VIEWER_DISABLE_INFO_BOX" => Some("TRUE".to_string()),
            "VIEWER_DISABLE_HELP_BUTTON" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(
            opts,
            ViewerOptions {
                disable_help_button: true,
                disable_geocoder: false,
                disable_info_box: true,
            }
        );
    }

    #[test]
    fn deserializes_partial_config() {
        let opts: ViewerOptions = serde_json::from_str(r#"{"disable_info_box": true}"#).unwrap();
        assert!(opts.disable_help_button);
        assert!(opts.disable_info_box);
    }
}
