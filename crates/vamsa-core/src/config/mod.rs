use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::dataset::DatasetFormat;
use crate::tree::RootPolicy;
use crate::{Error, Result};

/// Visualizer configuration: one object drives tree building, layout and rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VamsaConfig {
    pub tree: TreeConfig,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeConfig {
    pub root_policy: RootPolicy,
}

/// How layout coordinates are scaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizingMode {
    /// Fixed pixel spacing per separation unit and per generation.
    #[default]
    NodeSize,
    /// Stretch the tree over the render container.
    Fit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub sizing: SizingMode,
    /// Pixels per separation unit.
    pub node_spacing: f64,
    /// Vertical distance between generations.
    pub level_spacing: f64,
    pub sibling_separation: f64,
    pub cousin_separation: f64,
    pub node_radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sizing: SizingMode::NodeSize,
            node_spacing: 120.0,
            level_spacing: 140.0,
            sibling_separation: 1.0,
            cousin_separation: 2.0,
            node_radius: 35.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub font_family: String,
    pub font_size: f64,
    pub show_overlay: bool,
    pub title: String,
    pub node_fill: String,
    pub node_fill_highlight: String,
    pub node_stroke: String,
    pub edge_stroke: String,
    pub button_fill: String,
    pub button_stroke: String,
    pub label_color: String,
    pub selection_stroke: String,
    pub muted_stroke: String,
    pub overlay_stroke: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            margin: 20.0,
            font_family: "\"Poppins\", \"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            show_overlay: false,
            title: "Vamsa Tree".to_string(),
            node_fill: "#B8860B".to_string(),
            node_fill_highlight: "#FFD700".to_string(),
            node_stroke: "#B8860B".to_string(),
            edge_stroke: "#D4AF37".to_string(),
            button_fill: "#90EE90".to_string(),
            button_stroke: "#228B22".to_string(),
            label_color: "#8B4513".to_string(),
            selection_stroke: "#FF6B6B".to_string(),
            muted_stroke: "#d1d5db".to_string(),
            overlay_stroke: "#0ea5e9".to_string(),
        }
    }
}

impl VamsaConfig {
    /// Deep-merges `overrides` onto the defaults, then reads the result back.
    pub fn from_overrides(overrides: &Value) -> Result<Self> {
        if !overrides.is_object() && !overrides.is_null() {
            return Err(Error::InvalidConfig {
                message: "config document must be an object".to_string(),
            });
        }
        let mut base = serde_json::to_value(Self::default())?;
        deep_merge_value(&mut base, overrides);
        let cfg: Self = serde_json::from_value(base).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        cfg.check()?;
        Ok(cfg)
    }

    pub fn from_str_with_format(text: &str, format: DatasetFormat) -> Result<Self> {
        let overrides: Value = match format {
            DatasetFormat::Json => serde_json::from_str(text)?,
            DatasetFormat::Yaml => serde_yaml::from_str(text)?,
        };
        Self::from_overrides(&overrides)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str_with_format(&text, DatasetFormat::from_path(path))
    }

    /// Applies further overrides on top of this config.
    pub fn merged(&self, overrides: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        deep_merge_value(&mut base, overrides);
        let cfg: Self = serde_json::from_value(base).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        cfg.check()?;
        Ok(cfg)
    }

    fn check(&self) -> Result<()> {
        let l = &self.layout;
        let positive = [
            ("layout.nodeSpacing", l.node_spacing),
            ("layout.levelSpacing", l.level_spacing),
            ("layout.siblingSeparation", l.sibling_separation),
            ("layout.cousinSeparation", l.cousin_separation),
            ("layout.nodeRadius", l.node_radius),
            ("render.width", self.render.width),
            ("render.height", self.render.height),
            ("render.fontSize", self.render.font_size),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be a positive number (got {v})"),
                });
            }
        }
        if !(self.render.margin.is_finite() && self.render.margin >= 0.0) {
            return Err(Error::InvalidConfig {
                message: format!("render.margin must not be negative (got {})", self.render.margin),
            });
        }
        Ok(())
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

/// Builds an override document from dotted paths, e.g. `("render.width", 640)`.
pub fn overrides_from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    let mut root = Map::new();
    for (dotted_path, value) in pairs {
        let mut cur = &mut root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                break;
            }
            let slot = cur
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                break;
            };
            cur = next;
        }
    }
    Value::Object(root)
}
