//! Cross-sections of routed waveguides.

use derive_builder::Builder;
use lumengeom::polyline::Polyline;
use lumengeom::{Path, Polygon};
use serde::{Deserialize, Serialize};

use super::cell::Element;
use super::layers::Layer;

/// The cross-sectional geometry of a waveguide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct TraceTemplate {
    /// Width of the guiding core.
    #[builder(default = "0.45")]
    pub core_width: f64,
    #[builder(default = "Layer::WgCore")]
    pub core_layer: Layer,
    /// Width of the cladding drawn around the core.
    #[builder(default = "4.45")]
    pub cladding_width: f64,
    #[builder(default = "Layer::WgCladding")]
    pub cladding_layer: Layer,
    /// Lateral offset of the core from the centerline; positive values are to the left.
    #[builder(default)]
    pub core_offset: f64,
}

impl Default for TraceTemplate {
    fn default() -> Self {
        Self {
            core_width: 0.45,
            core_layer: Layer::WgCore,
            cladding_width: 4.45,
            cladding_layer: Layer::WgCladding,
            core_offset: 0.,
        }
    }
}

impl TraceTemplate {
    #[inline]
    pub fn builder() -> TraceTemplateBuilder {
        TraceTemplateBuilder::default()
    }

    /// A copy of this template with a different core width.
    pub fn with_core_width(&self, core_width: f64) -> Self {
        Self {
            core_width,
            ..self.clone()
        }
    }

    /// A copy of this template whose core is shifted laterally by `offset`.
    pub fn offset(&self, offset: f64) -> Self {
        Self {
            core_offset: self.core_offset + offset,
            ..self.clone()
        }
    }

    /// Draws this cross-section along `centerline`.
    pub fn elements(&self, centerline: &Polyline) -> Vec<Element> {
        let core = if self.core_offset == 0. {
            centerline.clone()
        } else {
            centerline.offset(self.core_offset)
        };
        vec![
            Element::new(
                self.core_layer.clone(),
                Path::new(core.points, self.core_width),
            ),
            Element::new(
                self.cladding_layer.clone(),
                Path::new(centerline.points.clone(), self.cladding_width),
            ),
        ]
    }

    /// Draws this cross-section along `centerline` with a per-point core width.
    ///
    /// The cladding keeps its margin around the widest point of the core.
    pub fn elements_with_widths(&self, centerline: &Polyline, core_widths: &[f64]) -> Vec<Element> {
        let half: Vec<f64> = core_widths.iter().map(|w| w / 2.).collect();
        let outline = centerline.outline_variable(&half, &half);
        let widest = core_widths.iter().copied().fold(self.core_width, f64::max);
        let cladding = self.cladding_width + widest - self.core_width;
        vec![
            Element::new(self.core_layer.clone(), Polygon { points: outline }),
            Element::new(
                self.cladding_layer.clone(),
                Path::new(centerline.points.clone(), cladding),
            ),
        ]
    }
}
