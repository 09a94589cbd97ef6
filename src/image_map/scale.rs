use serde::{Deserialize, Serialize};

use crate::dom::types::Size;
use crate::errors::{MapError, MapResult};
use crate::image_map::types::GateConfig;

/// How natural-space coordinates are converted to rendered space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// One width-derived factor for both axes.
    ///
    /// Precondition: the layout preserves the image's aspect ratio
    /// (`height: auto` / `fit-content`). If it does not, vertical
    /// positions drift; use [`ScaleMode::PerAxis`].
    #[default]
    Uniform,
    /// Independent factors from rendered width and rendered height.
    PerAxis,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRatio {
    pub x: f64,
    pub y: f64,
}

impl ScaleRatio {
    pub const IDENTITY: ScaleRatio = ScaleRatio { x: 1.0, y: 1.0 };

    /// Ratio of rendered size to natural size.
    pub fn between(rendered: Size, natural: Size, mode: ScaleMode) -> MapResult<Self> {
        if natural.width.is_nan() || natural.width <= 0.0 {
            return Err(MapError::Layout(format!(
                "image has no usable natural width ({})",
                natural.width
            )));
        }
        let x = rendered.width / natural.width;
        let y = match mode {
            ScaleMode::Uniform => x,
            ScaleMode::PerAxis => {
                if natural.height.is_nan() || natural.height <= 0.0 {
                    return Err(MapError::Layout(format!(
                        "image has no usable natural height ({})",
                        natural.height
                    )));
                }
                rendered.height / natural.height
            }
        };
        Ok(Self { x, y })
    }

    /// Rendered-space `(left, top)` of a gate.
    pub fn apply(&self, gate: &GateConfig) -> (f64, f64) {
        (gate.x * self.x, gate.y * self.y)
    }
}

/// Format a pixel offset the way the inline style expects it (`100px`, `12.5px`).
pub fn css_px(value: f64) -> String {
    format!("{value}px")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_scale() {
        let ratio = ScaleRatio::between(
            Size::new(500.0, 300.0),
            Size::new(1000.0, 600.0),
            ScaleMode::Uniform,
        )
        .unwrap();
        assert_eq!(ratio, ScaleRatio { x: 0.5, y: 0.5 });
        assert_eq!(ratio.apply(&GateConfig::new(200.0, 400.0)), (100.0, 200.0));
    }

    #[test]
    fn test_uniform_ignores_height() {
        // Squashed vertically: uniform mode still uses the width ratio.
        let ratio = ScaleRatio::between(
            Size::new(500.0, 100.0),
            Size::new(1000.0, 600.0),
            ScaleMode::Uniform,
        )
        .unwrap();
        assert_eq!(ratio.y, 0.5);
    }

    #[test]
    fn test_per_axis() {
        let ratio = ScaleRatio::between(
            Size::new(500.0, 150.0),
            Size::new(1000.0, 600.0),
            ScaleMode::PerAxis,
        )
        .unwrap();
        assert_eq!(ratio, ScaleRatio { x: 0.5, y: 0.25 });
    }

    #[test]
    fn test_zero_natural_size_is_an_error() {
        let err = ScaleRatio::between(Size::new(500.0, 300.0), Size::default(), ScaleMode::Uniform);
        assert!(matches!(err, Err(MapError::Layout(_))));

        let err = ScaleRatio::between(
            Size::new(500.0, 300.0),
            Size::new(1000.0, 0.0),
            ScaleMode::PerAxis,
        );
        assert!(matches!(err, Err(MapError::Layout(_))));
    }

    #[test]
    fn test_css_px() {
        assert_eq!(css_px(100.0), "100px");
        assert_eq!(css_px(12.5), "12.5px");
        assert_eq!(css_px(0.0), "0px");
    }
}
