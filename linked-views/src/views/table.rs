use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use tsify_next::Tsify;

use super::{SelectionEmitter, ViewAdapter, emit_via};
use crate::bucket::{Bucket, BucketScheme};
use crate::config::TableConfig;
use crate::dataset::Dataset;
use crate::error::ViewError;
use crate::selection::{Granularity, Highlight, Selection};
use crate::types::{FieldId, Outcome, SimulationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Tsify)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
#[tsify(into_wasm_abi)]
pub enum RowKey {
    Simulation(SimulationId),
    Field(FieldId),
}

impl RowKey {
    fn raw(self) -> u32 {
        match self {
            RowKey::Simulation(id) => id.0,
            RowKey::Field(id) => id.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct TableRow {
    pub key: RowKey,
    pub simulation: SimulationId,
    pub recruitment_rate: f64,
    pub bucket: Bucket,
    pub outcomes: BTreeMap<Outcome, f64>,
    pub net_present_cost: Option<f64>,
    pub selected: bool,
    pub visible: bool,
}

/// Data table with one row per simulation, or per field at `Field` granularity.
pub struct TableView {
    config: TableConfig,
    granularity: Granularity,
    rows: Vec<TableRow>,
    emitter: Option<SelectionEmitter>,
}

impl TableView {
    pub fn new(
        dataset: &Dataset,
        scheme: &BucketScheme,
        granularity: Granularity,
        config: &TableConfig,
    ) -> Self {
        let rows = match granularity {
            Granularity::Simulation => dataset
                .simulations()
                .iter()
                .map(|sim| TableRow {
                    key: RowKey::Simulation(sim.id),
                    simulation: sim.id,
                    recruitment_rate: sim.recruitment_rate,
                    bucket: scheme.compute_bucket(sim.recruitment_rate),
                    outcomes: sim.outcomes.clone(),
                    net_present_cost: None,
                    selected: false,
                    visible: true,
                })
                .collect(),
            Granularity::Field => dataset
                .fields()
                .iter()
                .filter_map(|field| {
                    let sim = dataset.simulation(field.simulation)?;
                    Some(TableRow {
                        key: RowKey::Field(field.id),
                        simulation: sim.id,
                        recruitment_rate: sim.recruitment_rate,
                        bucket: scheme.compute_bucket(sim.recruitment_rate),
                        outcomes: BTreeMap::new(),
                        net_present_cost: Some(field.net_present_cost),
                        selected: false,
                        visible: true,
                    })
                })
                .collect(),
        };
        Self {
            config: config.clone(),
            granularity,
            rows,
            emitter: None,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &TableRow> + '_ {
        self.rows.iter().filter(|r| r.visible)
    }

    pub fn selected_keys(&self) -> BTreeSet<RowKey> {
        self.rows.iter().filter(|r| r.selected).map(|r| r.key).collect()
    }

    fn selection_for(&self, keys: BTreeSet<RowKey>) -> Selection {
        match self.granularity {
            Granularity::Simulation => Selection::simulations(keys.into_iter().filter_map(|k| {
                match k {
                    RowKey::Simulation(id) => Some(id),
                    RowKey::Field(_) => None,
                }
            })),
            Granularity::Field => Selection::fields(keys.into_iter().filter_map(|k| match k {
                RowKey::Field(id) => Some(id),
                RowKey::Simulation(_) => None,
            })),
        }
    }

    // === Gestures ===

    /// The table's single click handler. `key` is the raw id carried by the
    /// clicked row; `additive` (ctrl-click) toggles it in the current selection.
    /// A key matching no row clears the selection.
    pub fn row_click(&self, key: u32, additive: bool) -> bool {
        let Some(row_key) = self.rows.iter().find(|r| r.key.raw() == key).map(|r| r.key) else {
            return emit_via(&self.emitter, Selection::None);
        };
        let keys = if additive {
            let mut keys = self.selected_keys();
            if !keys.remove(&row_key) {
                keys.insert(row_key);
            }
            keys
        } else {
            BTreeSet::from([row_key])
        };
        emit_via(&self.emitter, self.selection_for(keys))
    }
}

impl ViewAdapter for TableView {
    fn name(&self) -> &str {
        "table"
    }

    fn render(&mut self, highlight: &Highlight) -> Result<(), ViewError> {
        let active = highlight.is_active();
        for row in &mut self.rows {
            row.selected = match row.key {
                RowKey::Simulation(id) => highlight.contains_simulation(id),
                RowKey::Field(id) => highlight.contains_field(id),
            };
            row.visible = row.selected || !active || !self.config.filter_to_selection;
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
