#![forbid(unsafe_code)]

//! Headless layout, interaction state and SVG rendering for family trees.
//!
//! The pipeline is `vamsa_core::build_tree` → [`layout::layout_tree`] → [`svg::render_tree_svg`];
//! [`view::TreeView`] drives it from host events.

pub mod layout;
pub mod model;
pub mod svg;
pub mod text;
pub mod view;

pub use layout::layout_tree;
pub use model::{Bounds, Curve, LayoutPoint, PositionedNode, TreeLayout};
pub use svg::{RenderInput, SvgRenderOptions, Viewport, render_empty_svg, render_tree_svg};
pub use text::{DeterministicTextMeasurer, TextMeasurer, TextStyle};
pub use view::{Container, PointerTarget, TreeHost, TreeView, ViewState};

use serde::{Deserialize, Serialize};
use vamsa_core::config::{LayoutConfig, RenderConfig, SizingMode};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid layout options: {message}")]
    InvalidOptions { message: String },
    #[error(transparent)]
    Core(#[from] vamsa_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LayoutSizing {
    /// One separation unit is `node_spacing` px; one generation is `level_spacing` px.
    NodeSize,
    /// Stretch horizontally to `width` and spread generations over `height`.
    Fit { width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub sizing: LayoutSizing,
    pub node_spacing: f64,
    pub level_spacing: f64,
    pub sibling_separation: f64,
    pub cousin_separation: f64,
    pub node_radius: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            sizing: LayoutSizing::NodeSize,
            node_spacing: 120.0,
            level_spacing: 140.0,
            sibling_separation: 1.0,
            cousin_separation: 2.0,
            node_radius: 35.0,
        }
    }
}

impl LayoutOptions {
    /// Fit sizing uses the render container minus its margin.
    pub fn from_config(layout: &LayoutConfig, render: &RenderConfig) -> Result<Self> {
        let sizing = match layout.sizing {
            SizingMode::NodeSize => LayoutSizing::NodeSize,
            SizingMode::Fit => {
                // Leave room for the node shapes around the stretched centres.
                let inset = 2.0 * (render.margin + layout.node_radius * 8.0 / 7.0);
                LayoutSizing::Fit {
                    width: (render.width - inset).max(1.0),
                    height: (render.height - inset).max(1.0),
                }
            }
        };
        let options = Self {
            sizing,
            node_spacing: layout.node_spacing,
            level_spacing: layout.level_spacing,
            sibling_separation: layout.sibling_separation,
            cousin_separation: layout.cousin_separation,
            node_radius: layout.node_radius,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        let mut checks = vec![
            ("node_spacing", self.node_spacing),
            ("level_spacing", self.level_spacing),
            ("sibling_separation", self.sibling_separation),
            ("cousin_separation", self.cousin_separation),
            ("node_radius", self.node_radius),
        ];
        if let LayoutSizing::Fit { width, height } = self.sizing {
            checks.push(("fit width", width));
            checks.push(("fit height", height));
        }
        for (name, v) in checks {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidOptions {
                    message: format!("{name} must be a positive number (got {v})"),
                });
            }
        }
        Ok(())
    }
}
