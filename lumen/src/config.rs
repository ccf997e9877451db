//! Technology defaults shared by every cell generated from one context.

use std::path::Path;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{with_err_context, ErrorContext, Result};
use crate::layout::trace::TraceTemplate;

/// Bend radius used by connectors that are not given one explicitly.
pub const DEFAULT_BEND_RADIUS: f64 = 20.0;

/// Technology-wide routing and drawing defaults.
///
/// Can be loaded from TOML; omitted keys take their default values.
///
/// ```toml
/// bend_radius = 10.0
/// angle_step = 0.5
///
/// [trace_template]
/// core_width = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct TechConfig {
    /// Default bend radius in micrometers.
    #[builder(default = "DEFAULT_BEND_RADIUS")]
    pub bend_radius: f64,
    /// Arc discretization step in degrees.
    #[builder(default = "1.0")]
    pub angle_step: f64,
    /// Trace template for optical ports that do not specify one.
    #[builder(default)]
    pub trace_template: TraceTemplate,
    /// Width of the diagnostic line drawn for failed connectors.
    #[builder(default = "1.0")]
    pub error_line_width: f64,
    /// Positional tolerance for port alignment checks.
    #[builder(default = "1e-6")]
    pub tolerance: f64,
}

impl Default for TechConfig {
    fn default() -> Self {
        Self {
            bend_radius: DEFAULT_BEND_RADIUS,
            angle_step: 1.0,
            trace_template: TraceTemplate::default(),
            error_line_width: 1.0,
            tolerance: 1e-6,
        }
    }
}

impl TechConfig {
    #[inline]
    pub fn builder() -> TechConfigBuilder {
        TechConfigBuilder::default()
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = with_err_context(std::fs::read_to_string(path), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })?;
        with_err_context(Self::from_toml_str(&data), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = TechConfig::from_toml_str(
            r#"
            bend_radius = 10.0

            [trace_template]
            core_width = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bend_radius, 10.0);
        assert_eq!(cfg.angle_step, 1.0);
        assert_eq!(cfg.trace_template.core_width, 0.5);
        assert_eq!(cfg.trace_template.cladding_width, 4.45);
    }

    #[test]
    fn builder_matches_default() {
        let cfg = TechConfig::builder().build().unwrap();
        assert_eq!(cfg, TechConfig::default());
    }
}
