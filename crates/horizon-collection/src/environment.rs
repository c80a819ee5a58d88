//! Construction-time configuration.
//!
//! [`Environment`] carries the defaults every data source in a tree starts
//! from; [`LayoutConfig`] tunes the grid layout. Both deserialize from TOML
//! so a host can ship them as a config file:
//!
//! ```
//! use horizon_collection::{Environment, LayoutConfig};
//!
//! let env = Environment::from_toml_str(r#"
//!     shows_activity_indicator_while_refreshing = true
//!
//!     [default_metrics]
//!     number_of_columns = 2
//! "#).unwrap();
//! assert_eq!(env.default_metrics.number_of_columns, Some(2));
//!
//! let config = LayoutConfig::from_toml_str("top_inset = 64.0").unwrap();
//! assert_eq!(config.top_inset, 64.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::geometry::Color;
use crate::metrics::{RowHeight, SectionMetrics, DEFAULT_ROW_HEIGHT};
use crate::placeholder::Placeholder;

/// Colours the tree hands to supplements that do not set their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background_color: Color,
    pub separator_color: Color,
    pub header_background_color: Color,
    pub pinned_header_background_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background_color: Color::WHITE,
            separator_color: Color::LIGHT_GRAY,
            header_background_color: Color::WHITE,
            pinned_header_background_color: Color::from_rgb(0.97, 0.97, 0.97),
        }
    }
}

/// Defaults threaded through every data source of a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Lowest metrics layer, below each data source's own defaults.
    pub default_metrics: SectionMetrics,
    pub no_content_title: String,
    pub no_content_message: Option<String>,
    pub error_title: String,
    /// When unset, the error placeholder shows the load error's message.
    pub error_message: Option<String>,
    pub shows_activity_indicator_while_refreshing: bool,
    pub theme: Theme,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            default_metrics: SectionMetrics::new()
                .with_row_height(RowHeight::Fixed(DEFAULT_ROW_HEIGHT)),
            no_content_title: "No Content".to_string(),
            no_content_message: None,
            error_title: "Unable to Load".to_string(),
            error_message: None,
            shows_activity_indicator_while_refreshing: false,
            theme: Theme::default(),
        }
    }
}

impl Environment {
    /// Parse an environment from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// The placeholder a new data source shows when it has no content.
    pub fn no_content_placeholder(&self) -> Placeholder {
        Placeholder {
            title: Some(self.no_content_title.clone()),
            message: self.no_content_message.clone(),
            image: None,
            is_activity_indicator: false,
        }
    }

    /// The placeholder a new data source shows when loading fails.
    pub fn error_placeholder(&self) -> Placeholder {
        Placeholder {
            title: Some(self.error_title.clone()),
            message: self.error_message.clone(),
            image: None,
            is_activity_indicator: false,
        }
    }
}

/// Tuning for [`GridLayout`](crate::layout::GridLayout).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Fixed inset at the top of the viewport, e.g. under a translucent bar.
    /// Pinned headers stack below it.
    pub top_inset: f32,
    /// Minimum placeholder height when the viewport leaves no room.
    pub minimum_placeholder_height: f32,
    /// Reserve space for hidden supplements instead of collapsing them.
    pub hidden_supplements_take_space: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            top_inset: 0.0,
            minimum_placeholder_height: 0.0,
            hidden_supplements_take_space: false,
        }
    }
}

impl LayoutConfig {
    /// Parse a layout configuration from TOML.
    pub fn from_toml_str(source: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let env = Environment::default();
        assert_eq!(env.default_metrics.row_height, Some(RowHeight::Fixed(44.0)));
        assert_eq!(env.no_content_placeholder().title.as_deref(), Some("No Content"));
        assert!(!env.error_placeholder().is_activity_indicator);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let env = Environment::from_toml_str(
            r#"
            error_title = "Offline"

            [theme]
            separator_color = { r = 1.0, g = 0.0, b = 0.0, a = 1.0 }
            "#,
        )
        .unwrap();
        assert_eq!(env.error_title, "Offline");
        assert_eq!(env.no_content_title, "No Content");
        assert_eq!(env.theme.separator_color, Color::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(env.theme.background_color, Color::WHITE);
    }

    #[test]
    fn test_layout_config_toml() {
        let config = LayoutConfig::from_toml_str(
            "top_inset = 20.0\nhidden_supplements_take_space = true",
        )
        .unwrap();
        assert_eq!(config.top_inset, 20.0);
        assert!(config.hidden_supplements_take_space);
        assert_eq!(config.minimum_placeholder_height, 0.0);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(LayoutConfig::from_toml_str("top_inset = \"tall\"").is_err());
    }
}
