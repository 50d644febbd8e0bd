use serde::Serialize;
use wasm_bindgen::prelude::*;

mod bucket;
mod config;
mod coordinator;
mod dataset;
mod error;
mod geometry;
mod latest;
mod selection;
mod store;
mod summary;
mod types;
pub mod views;

pub use bucket::*;
pub use config::*;
pub use coordinator::*;
pub use dataset::*;
pub use error::*;
pub use geometry::*;
pub use latest::*;
pub use selection::*;
pub use store::*;
pub use summary::*;
pub use types::*;
pub use views::{
    Gesture, MapView, PlotView, PointStyle, PolygonStyle, RowKey, SelectionEmitter, TableRow,
    TableView, ViewAdapter,
};

// ============================================================================
// WASM API - One linked-views session per page
// ============================================================================

#[wasm_bindgen]
pub struct LinkedSession {
    coordinator: Coordinator,
    views: LinkedViewIds,
    fetches: LatestOnly,
}

#[derive(Debug, Serialize)]
struct Axis {
    key: &'static str,
    label: &'static str,
}

impl From<Outcome> for Axis {
    fn from(outcome: Outcome) -> Self {
        Self {
            key: outcome.key(),
            label: outcome.label(),
        }
    }
}

#[derive(Serialize)]
struct PlotState<'a> {
    x: Axis,
    y: Axis,
    points: &'a [PointStyle],
}

impl<'a> PlotState<'a> {
    fn of(plot: &'a PlotView) -> Self {
        let (x, y) = plot.axes();
        Self {
            x: x.into(),
            y: y.into(),
            points: plot.points(),
        }
    }
}

/// Rows carry `RowKey`s, so hosts read the granularity to label the key column.
#[derive(Serialize)]
struct TableState<'a> {
    granularity: Granularity,
    rows: &'a [TableRow],
}

impl<'a> TableState<'a> {
    fn of(table: &'a TableView) -> Self {
        Self {
            granularity: table.granularity(),
            rows: table.rows(),
        }
    }
}

#[derive(Serialize)]
struct MapState<'a> {
    polygons: Vec<&'a PolygonStyle>,
    bounds: Option<BoundingBox>,
}

#[derive(Serialize)]
struct BucketCount {
    bucket: Bucket,
    count: usize,
    range: RateRange,
}

#[wasm_bindgen]
impl LinkedSession {
    /// `config_json` may be omitted; every config field has a default.
    #[wasm_bindgen(constructor)]
    pub fn new(dataset_json: &str, config_json: Option<String>) -> Result<LinkedSession, JsValue> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let dataset = Dataset::from_json(dataset_json).map_err(js_error)?;
        let config = match config_json {
            Some(json) => LinkConfig::from_json(&json).map_err(js_error)?,
            None => LinkConfig::default(),
        };
        Self::build(dataset, config).map_err(js_error)
    }

    /// Session over generated data, for the demo page
    #[wasm_bindgen]
    pub fn demo(
        seed: u64,
        simulations: u32,
        fields_per_simulation: u32,
    ) -> Result<LinkedSession, JsValue> {
        console_error_panic_hook::set_once();
        let count = Dataset::synthetic_field_count(simulations, fields_per_simulation);
        if count > MAX_SYNTHETIC_FIELDS {
            return Err(js_error(LinkError::TooManyFields(count)));
        }
        let dataset = Dataset::synthetic(seed, simulations, fields_per_simulation);
        Self::build(dataset, LinkConfig::default()).map_err(js_error)
    }

    // === Gestures ===
    // Each returns the selection in force once the gesture has been processed.

    #[wasm_bindgen(js_name = plotClick)]
    pub fn plot_click(&mut self, id: u32) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.plot, |p: &PlotView| p.click(SimulationId(id)));
        self.flush()
    }

    #[wasm_bindgen(js_name = plotClickAt)]
    pub fn plot_click_at(&mut self, x: f64, y: f64, tolerance: f64) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.plot, |p: &PlotView| p.click_at(x, y, tolerance));
        self.flush()
    }

    #[wasm_bindgen(js_name = plotBrush)]
    pub fn plot_brush(&mut self, x0: f64, x1: f64, y0: f64, y1: f64) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.plot, |p: &PlotView| p.brush((x0, x1), (y0, y1)));
        self.flush()
    }

    #[wasm_bindgen(js_name = plotHover)]
    pub fn plot_hover(&mut self, id: u32) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.plot, |p: &PlotView| p.hover(SimulationId(id)));
        self.flush()
    }

    #[wasm_bindgen(js_name = tableRowClick)]
    pub fn table_row_click(&mut self, key: u32, additive: bool) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.table, |t: &TableView| t.row_click(key, additive));
        self.flush()
    }

    #[wasm_bindgen(js_name = mapClick)]
    pub fn map_click(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.map, |m: &MapView| m.click(x, y));
        self.flush()
    }

    #[wasm_bindgen(js_name = selectBucket)]
    pub fn select_bucket(&mut self, name: &str) -> Result<JsValue, JsValue> {
        self.coordinator.select_bucket(name).map_err(js_error)?;
        encode(self.coordinator.selection())
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<JsValue, JsValue> {
        self.coordinator.reset();
        encode(self.coordinator.selection())
    }

    // === Reads ===

    #[wasm_bindgen]
    pub fn selection(&self) -> Result<JsValue, JsValue> {
        encode(self.coordinator.selection())
    }

    #[wasm_bindgen]
    pub fn revision(&self) -> u64 {
        self.coordinator.revision().0
    }

    #[wasm_bindgen(js_name = plotState)]
    pub fn plot_state(&self) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.plot, |p: &PlotView| encode(&PlotState::of(p)))
            .unwrap_or(Ok(JsValue::NULL))
    }

    #[wasm_bindgen(js_name = tableState)]
    pub fn table_state(&self) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.table, |t: &TableView| encode(&TableState::of(t)))
            .unwrap_or(Ok(JsValue::NULL))
    }

    #[wasm_bindgen(js_name = mapState)]
    pub fn map_state(&self) -> Result<JsValue, JsValue> {
        self.coordinator
            .with_view(self.views.map, |m: &MapView| {
                encode(&MapState {
                    polygons: m.styles().collect(),
                    bounds: m.highlighted_bounds(),
                })
            })
            .unwrap_or(Ok(JsValue::NULL))
    }

    #[wasm_bindgen]
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        let summary = Summary::of(self.coordinator.dataset(), &self.coordinator.highlight());
        encode(&summary)
    }

    #[wasm_bindgen(js_name = bucketCounts)]
    pub fn bucket_counts(&self) -> Result<JsValue, JsValue> {
        let scheme = self.coordinator.config().buckets;
        let counts: Vec<BucketCount> = scheme
            .counts(self.coordinator.dataset().simulations())
            .into_iter()
            .map(|(bucket, count)| BucketCount {
                bucket,
                count,
                range: scheme.range(bucket),
            })
            .collect();
        encode(&counts)
    }

    // === Host observers ===

    /// Call `callback(selection)` after every selection change. Returns a handle
    /// for `offChange`.
    ///
    /// The callback runs while the session is mid-update and must not call back
    /// into it synchronously; defer with `queueMicrotask` instead. A callback
    /// that throws is logged and skipped.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&mut self, callback: js_sys::Function) -> u64 {
        let id = self.coordinator.subscribe(move |change: &SelectionChange| {
            let result = encode(&change.current)
                .and_then(|value| callback.call1(&JsValue::NULL, &value));
            if let Err(_err) = result {
                #[cfg(feature = "instrument")]
                tracing::warn!(
                    target: "observer_failure",
                    revision = change.revision.0,
                    error = ?_err,
                );
            }
        });
        id.to_u64()
    }

    #[wasm_bindgen(js_name = offChange)]
    pub fn off_change(&mut self, handle: u64) -> bool {
        let id = ObserverId::from(slotmap::KeyData::from_ffi(handle));
        self.coordinator.unsubscribe(id)
    }

    // === Async aggregation guard ===

    /// Mark the start of an asynchronous fetch keyed by the current selection.
    #[wasm_bindgen(js_name = beginFetch)]
    pub fn begin_fetch(&mut self) -> u64 {
        self.fetches.issue(self.coordinator.revision()).to_bits()
    }

    /// True if the fetch's response should be applied; false if it is stale.
    #[wasm_bindgen(js_name = acceptFetch)]
    pub fn accept_fetch(&mut self, ticket: u64) -> bool {
        let revision = self.coordinator.revision();
        self.fetches
            .find(ticket)
            .and_then(|t| self.fetches.complete(t, revision, ()))
            .is_some()
    }
}

impl LinkedSession {
    fn build(dataset: Dataset, config: LinkConfig) -> Result<Self, LinkError> {
        let (coordinator, views) = Coordinator::with_default_views(dataset, config)?;
        Ok(Self {
            coordinator,
            views,
            fetches: LatestOnly::new(),
        })
    }

    /// Run queued gestures and report the resulting selection.
    fn flush(&mut self) -> Result<JsValue, JsValue> {
        self.coordinator.process_pending();
        encode(self.coordinator.selection())
    }
}

#[wasm_bindgen]
pub fn version() -> String {
    format!("linked-views {}", env!("CARGO_PKG_VERSION"))
}

/// Plain objects rather than JS `Map`s, so outcome maps read as `row.outcomes.cost`.
fn encode<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsError::new(&err.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_states_carry_axis_labels_and_granularity() {
        let config = LinkConfig {
            granularity: Granularity::Field,
            ..LinkConfig::default()
        };
        let (coordinator, views) =
            Coordinator::with_default_views(Dataset::synthetic(3, 6, 2), config).unwrap();

        let plot = coordinator
            .with_view(views.plot, |p: &PlotView| {
                serde_json::to_value(PlotState::of(p)).unwrap()
            })
            .unwrap();
        assert_eq!(plot["x"]["key"], "cost");
        assert_eq!(plot["x"]["label"], "Cost");
        assert_eq!(plot["y"]["label"], "Nitrogen runoff");
        assert_eq!(plot["points"].as_array().map(Vec::len), Some(6));

        let table = coordinator
            .with_view(views.table, |t: &TableView| {
                serde_json::to_value(TableState::of(t)).unwrap()
            })
            .unwrap();
        assert_eq!(table["granularity"], "field");
        assert_eq!(table["rows"].as_array().map(Vec::len), Some(12));
    }
}
