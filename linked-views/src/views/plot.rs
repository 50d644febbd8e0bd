use serde::Serialize;
use std::any::Any;
use tsify_next::Tsify;

use super::{SelectionEmitter, ViewAdapter, emit_via};
use crate::config::PlotConfig;
use crate::dataset::Dataset;
use crate::error::ViewError;
use crate::selection::{Highlight, Selection};
use crate::types::{Outcome, SimulationId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PointStyle {
    pub id: SimulationId,
    pub x: f64,
    pub y: f64,
    pub selected: bool,
    pub opacity: f64,
    pub radius: f64,
}

/// Scatter plot of simulations over two outcome axes.
///
/// Simulations missing either outcome have no position and are left out.
pub struct PlotView {
    config: PlotConfig,
    points: Vec<PointStyle>,
    emitter: Option<SelectionEmitter>,
}

impl PlotView {
    pub fn new(dataset: &Dataset, config: &PlotConfig) -> Self {
        let points = dataset
            .simulations()
            .iter()
            .filter_map(|sim| {
                let x = sim.outcome(config.x)?;
                let y = sim.outcome(config.y)?;
                Some(PointStyle {
                    id: sim.id,
                    x,
                    y,
                    selected: false,
                    opacity: config.selected_opacity,
                    radius: config.radius,
                })
            })
            .collect();
        Self {
            config: config.clone(),
            points,
            emitter: None,
        }
    }

    pub fn axes(&self) -> (Outcome, Outcome) {
        (self.config.x, self.config.y)
    }

    pub fn points(&self) -> &[PointStyle] {
        &self.points
    }

    pub fn selected(&self) -> impl Iterator<Item = SimulationId> + '_ {
        self.points.iter().filter(|p| p.selected).map(|p| p.id)
    }

    // === Gestures ===

    /// Click on a point by id. Unknown ids resolve to nothing.
    pub fn click(&self, id: SimulationId) -> bool {
        let hit = self.points.iter().find(|p| p.id == id).map(|p| p.id);
        emit_via(&self.emitter, Selection::simulations(hit))
    }

    /// Click at plot coordinates: nearest point within `tolerance`, else empty.
    pub fn click_at(&self, x: f64, y: f64, tolerance: f64) -> bool {
        let hit = self
            .points
            .iter()
            .map(|p| (p.id, (p.x - x).hypot(p.y - y)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id);
        emit_via(&self.emitter, Selection::simulations(hit))
    }

    /// Drag a rectangle; every point inside (edges included) is selected.
    pub fn brush(&self, x: (f64, f64), y: (f64, f64)) -> bool {
        let (x0, x1) = (x.0.min(x.1), x.0.max(x.1));
        let (y0, y1) = (y.0.min(y.1), y.0.max(y.1));
        let hits = self
            .points
            .iter()
            .filter(|p| p.x >= x0 && p.x <= x1 && p.y >= y0 && p.y <= y1)
            .map(|p| p.id);
        emit_via(&self.emitter, Selection::simulations(hits))
    }

    /// Hover is ignored unless `hover_selects` is configured.
    pub fn hover(&self, id: SimulationId) -> bool {
        if !self.config.hover_selects {
            return false;
        }
        self.click(id)
    }
}

impl ViewAdapter for PlotView {
    fn name(&self) -> &str {
        "plot"
    }

    fn render(&mut self, highlight: &Highlight) -> Result<(), ViewError> {
        let active = highlight.is_active();
        for point in &mut self.points {
            point.selected = highlight.contains_simulation(point.id);
            let emphasized = point.selected || !active;
            point.opacity = if emphasized {
                self.config.selected_opacity
            } else {
                self.config.unselected_opacity
            };
            point.radius = if point.selected {
                self.config.selected_radius
            } else {
                self.config.radius
            };
        }
        Ok(())
    }

    fn on_user_select(&mut self, emitter: SelectionEmitter) {
        self.emitter = Some(emitter);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
