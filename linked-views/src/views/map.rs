use serde::Serialize;
use std::any::Any;
use tsify_next::Tsify;

use super::{SelectionEmitter, ViewAdapter, emit_via};
use crate::config::MapConfig;
use crate::dataset::Dataset;
use crate::error::ViewError;
use crate::geometry::{BoundingBox, Polygon};
use crate::selection::{Highlight, Selection};
use crate::types::{FieldId, SimulationId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PolygonStyle {
    pub field: FieldId,
    pub simulation: SimulationId,
    pub selected: bool,
    pub fill_opacity: f64,
    pub stroke_width: f64,
}

struct MapPolygon {
    geometry: Polygon,
    bounds: Option<BoundingBox>,
    style: PolygonStyle,
}

/// Field polygons. Clicks are hit-tested in map coordinates.
pub struct MapView {
    config: MapConfig,
    polygons: Vec<MapPolygon>,
    highlighted_bounds: Option<BoundingBox>,
    emitter: Option<SelectionEmitter>,
}

impl MapView {
    pub fn new(dataset: &Dataset, config: &MapConfig) -> Self {
        let polygons = dataset
            .fields()
            .iter()
            .map(|field| MapPolygon {
                bounds: field.geometry.bounds(),
                geometry: field.geometry.clone(),
                style: PolygonStyle {
                    field: field.id,
                    simulation: field.simulation,
                    selected: false,
                    fill_opacity: config.selected_fill_opacity,
                    stroke_width: config.stroke_width,
                },
            })
            .collect();
        Self {
            config: config.clone(),
            polygons,
            highlighted_bounds: None,
            emitter: None,
        }
    }

    pub fn styles(&self) -> impl Iterator<Item = &PolygonStyle> + '_ {
        self.polygons.iter().map(|p| &p.style)
    }

    pub fn selected_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.styles().filter(|s| s.selected).map(|s| s.field)
    }

    /// Bounds of every highlighted polygon, for zoom-to-selection.
    pub fn highlighted_bounds(&self) -> Option<BoundingBox> {
        self.highlighted_bounds
    }

    /// Topmost polygon under the point. Later polygons draw on top.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<FieldId> {
        self.polygons
            .iter()
            .rev()
            .filter(|p| p.bounds.is_some_and(|b| b.contains(x, y)))
            .find(|p| p.geometry.contains(x, y))
            .map(|p| p.style.field)
    }

    // === Gestures ===

    /// Click on the map. Empty map area emits an empty selection.
    pub fn click(&self, x: f64, y: f64) -> bool {
        emit_via(&self.emitter, Selection::fields(self.hit_test(x, y)))
    }
}

impl ViewAdapter for MapView {
    fn name(&self) -> &str {
        "map"
    }

    fn render(&mut self, highlight: &Highlight) -> Result<(), ViewError> {
        let active = highlight.is_active();
        let mut bounds: Option<BoundingBox> = None;
        for polygon in &mut self.polygons {
            let style = &mut polygon.style;
            style.selected = highlight.contains_field(style.field);
            style.fill_opacity = if style.selected || !active {
                self.config.selected_fill_opacity
            } else {
                self.config.unselected_fill_opacity
            };
            style.stroke_width = if style.selected {
                self.config.selected_stroke_width
            } else {
                self.config.stroke_width
            };
            if style.selected {
                if let Some(b) = polygon.bounds {
                    bounds = Some(bounds.map_or(b, |acc| acc.union(b)));
                }
            }
        }
        self.highlighted_bounds = bounds;
        Ok(())
    }

    fn on_user_select(&mut self, emitter: SelectionEmitter) {
        self.emitter = Some(emitter);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
