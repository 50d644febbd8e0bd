use serde::{Deserialize, Serialize};

use crate::bucket::BucketScheme;
use crate::error::LinkError;
use crate::selection::Granularity;
use crate::types::Outcome;

/// Session configuration. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Level at which plot, table and map agree to highlight.
    pub granularity: Granularity,
    /// Recruitment-rate bucket boundaries.
    pub buckets: BucketScheme,
    pub plot: PlotConfig,
    pub table: TableConfig,
    pub map: MapConfig,
}

impl LinkConfig {
    pub fn from_json(json: &str) -> Result<Self, LinkError> {
        let config: LinkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        self.buckets.validate()?;
        let opacities = [
            ("plot.selected_opacity", self.plot.selected_opacity),
            ("plot.unselected_opacity", self.plot.unselected_opacity),
            ("map.selected_fill_opacity", self.map.selected_fill_opacity),
            ("map.unselected_fill_opacity", self.map.unselected_fill_opacity),
        ];
        for (name, value) in opacities {
            if !(0.0..=1.0).contains(&value) {
                return Err(LinkError::InvalidOpacity { name, value });
            }
        }
        Ok(())
    }
}

/// Scatter plot axes and emphasis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub x: Outcome,
    pub y: Outcome,
    /// Opacity of points outside an active selection.
    pub unselected_opacity: f64,
    pub selected_opacity: f64,
    pub radius: f64,
    pub selected_radius: f64,
    /// Hovering a point selects it, not just clicking.
    pub hover_selects: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            x: Outcome::Cost,
            y: Outcome::NitrogenRunoff,
            unselected_opacity: 0.2,
            selected_opacity: 1.0,
            radius: 3.0,
            selected_radius: 5.0,
            hover_selects: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Hide unselected rows while a selection is active.
    pub filter_to_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub unselected_fill_opacity: f64,
    pub selected_fill_opacity: f64,
    pub stroke_width: f64,
    pub selected_stroke_width: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            unselected_fill_opacity: 0.15,
            selected_fill_opacity: 0.8,
            stroke_width: 0.5,
            selected_stroke_width: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config = LinkConfig::from_json("{}").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.granularity, Granularity::Simulation);
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = LinkConfig::from_json(
            r#"{"granularity": "field", "plot": {"x": "sediment_runoff"}, "table": {"filter_to_selection": true}}"#,
        )
        .unwrap();
        assert_eq!(config.granularity, Granularity::Field);
        assert_eq!(config.plot.x, Outcome::SedimentRunoff);
        assert_eq!(config.plot.y, Outcome::NitrogenRunoff);
        assert!(config.table.filter_to_selection);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            LinkConfig::from_json(r#"{"buckets": {"thresholds": [0.5, 0.4, 0.9]}}"#),
            Err(LinkError::InvalidThresholds(_))
        ));
        assert!(matches!(
            LinkConfig::from_json(r#"{"map": {"selected_fill_opacity": 1.5}}"#),
            Err(LinkError::InvalidOpacity { name: "map.selected_fill_opacity", .. })
        ));
    }
}
