use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tsify_next::Tsify;

use crate::bucket::{Bucket, BucketScheme};
use crate::dataset::Dataset;
use crate::error::LinkError;
use crate::types::{FieldId, SimulationId};

// ============================================================================
// Selection - The shared vocabulary every view emits
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Selection {
    /// Nothing selected; views clear their highlighting.
    #[default]
    None,
    Simulations(BTreeSet<SimulationId>),
    Fields(BTreeSet<FieldId>),
    Bucket(Bucket),
}

impl Selection {
    /// Empty id sets collapse to `Selection::None`.
    pub fn simulations(ids: impl IntoIterator<Item = SimulationId>) -> Self {
        let ids: BTreeSet<_> = ids.into_iter().collect();
        if ids.is_empty() {
            Selection::None
        } else {
            Selection::Simulations(ids)
        }
    }

    pub fn fields(ids: impl IntoIterator<Item = FieldId>) -> Self {
        let ids: BTreeSet<_> = ids.into_iter().collect();
        if ids.is_empty() {
            Selection::None
        } else {
            Selection::Fields(ids)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Selection::None => true,
            Selection::Simulations(ids) => ids.is_empty(),
            Selection::Fields(ids) => ids.is_empty(),
            Selection::Bucket(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Selection::None => "none",
            Selection::Simulations(_) => "simulations",
            Selection::Fields(_) => "fields",
            Selection::Bucket(_) => "bucket",
        }
    }

    /// Number of ids named directly. A bucket counts as one.
    pub fn len(&self) -> usize {
        match self {
            Selection::None => 0,
            Selection::Simulations(ids) => ids.len(),
            Selection::Fields(ids) => ids.len(),
            Selection::Bucket(_) => 1,
        }
    }

    /// Rejects ids the dataset does not know. The first unknown id is reported.
    pub fn validate(&self, dataset: &Dataset) -> Result<(), LinkError> {
        match self {
            Selection::None | Selection::Bucket(_) => Ok(()),
            Selection::Simulations(ids) => {
                match ids.iter().find(|id| !dataset.has_simulation(**id)) {
                    Some(id) => Err(LinkError::UnknownSimulation(*id)),
                    None => Ok(()),
                }
            }
            Selection::Fields(ids) => match ids.iter().find(|id| !dataset.has_field(**id)) {
                Some(id) => Err(LinkError::UnknownField(*id)),
                None => Ok(()),
            },
        }
    }
}

/// Level at which linked views agree to highlight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[serde(rename_all = "snake_case")]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Granularity {
    #[default]
    Simulation,
    Field,
}

// ============================================================================
// Highlight - A selection translated to one granularity
// ============================================================================

/// What every view renders: the selected simulations and the fields that go
/// with them at the configured granularity.
///
/// `active` is set for any selection other than `Selection::None`, even one
/// that resolves to no members (an empty bucket). Views dim and filter while
/// it is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Highlight {
    pub granularity: Granularity,
    pub active: bool,
    pub simulations: BTreeSet<SimulationId>,
    pub fields: BTreeSet<FieldId>,
}

impl Highlight {
    pub fn none(granularity: Granularity) -> Self {
        Self {
            granularity,
            active: false,
            simulations: BTreeSet::new(),
            fields: BTreeSet::new(),
        }
    }

    /// Translate `selection` into simulation and field membership.
    ///
    /// Buckets expand to their member simulations. At `Simulation` granularity
    /// a field selection widens to every field of the owning simulations; at
    /// `Field` granularity only the chosen fields are highlighted.
    pub fn resolve(
        selection: &Selection,
        dataset: &Dataset,
        scheme: &BucketScheme,
        granularity: Granularity,
    ) -> Self {
        let mut highlight = Self::none(granularity);
        highlight.active = !matches!(selection, Selection::None);
        match selection {
            Selection::None => {}
            Selection::Bucket(bucket) => {
                highlight.simulations = scheme.members_of(*bucket, dataset.simulations());
                highlight.fill_fields_from_simulations(dataset);
            }
            Selection::Simulations(ids) => {
                highlight.simulations = ids
                    .iter()
                    .copied()
                    .filter(|id| dataset.has_simulation(*id))
                    .collect();
                highlight.fill_fields_from_simulations(dataset);
            }
            Selection::Fields(ids) => {
                highlight.simulations = ids
                    .iter()
                    .filter_map(|f| dataset.simulation_of(*f))
                    .collect();
                match granularity {
                    Granularity::Field => {
                        highlight.fields = ids
                            .iter()
                            .copied()
                            .filter(|id| dataset.has_field(*id))
                            .collect();
                    }
                    Granularity::Simulation => highlight.fill_fields_from_simulations(dataset),
                }
            }
        }
        highlight
    }

    fn fill_fields_from_simulations(&mut self, dataset: &Dataset) {
        self.fields = self
            .simulations
            .iter()
            .flat_map(|id| dataset.fields_of(*id).iter().copied())
            .collect();
    }

    /// No members highlighted. An active highlight can still be empty.
    pub fn is_empty(&self) -> bool {
        self.simulations.is_empty() && self.fields.is_empty()
    }

    /// Whether views should de-emphasise what is not highlighted.
    pub fn is_active(&self) -> bool {
        self.active || !self.is_empty()
    }

    pub fn contains_simulation(&self, id: SimulationId) -> bool {
        self.simulations.contains(&id)
    }

    pub fn contains_field(&self, id: FieldId) -> bool {
        self.fields.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Field, Simulation};
    use crate::geometry::Polygon;

    fn dataset() -> Dataset {
        let sims = vec![
            Simulation::new(SimulationId(1), 0.1),
            Simulation::new(SimulationId(2), 0.5),
            Simulation::new(SimulationId(3), 0.95),
        ];
        let fields = (0..6)
            .map(|i| Field {
                id: FieldId(100 + i),
                simulation: SimulationId(1 + i / 2),
                geometry: Polygon::square((i as f64 * 2.0, 0.0), 1.0),
                net_present_cost: 1.0,
            })
            .collect();
        Dataset::new(sims, fields).unwrap()
    }

    #[test]
    fn empty_sets_normalize_to_none() {
        assert_eq!(Selection::simulations(Vec::new()), Selection::None);
        assert_eq!(Selection::fields(Vec::new()), Selection::None);
        assert!(Selection::None.is_empty());
        assert!(!Selection::Bucket(Bucket::Low).is_empty());
    }

    #[test]
    fn serde_shape_is_tagged() {
        let sel = Selection::simulations([SimulationId(3), SimulationId(1)]);
        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(json, r#"{"kind":"simulations","value":[1,3]}"#);
        let bucket: Selection =
            serde_json::from_str(r#"{"kind":"bucket","value":"Perfect"}"#).unwrap();
        assert_eq!(bucket, Selection::Bucket(Bucket::Perfect));
        let none: Selection = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert_eq!(none, Selection::None);
    }

    #[test]
    fn validate_reports_unknown_ids() {
        let ds = dataset();
        assert!(Selection::simulations([SimulationId(1)]).validate(&ds).is_ok());
        assert!(matches!(
            Selection::simulations([SimulationId(1), SimulationId(9)]).validate(&ds),
            Err(LinkError::UnknownSimulation(SimulationId(9)))
        ));
        assert!(matches!(
            Selection::fields([FieldId(7)]).validate(&ds),
            Err(LinkError::UnknownField(FieldId(7)))
        ));
    }

    #[test]
    fn bucket_resolves_to_members_and_their_fields() {
        let ds = dataset();
        let h = Highlight::resolve(
            &Selection::Bucket(Bucket::Perfect),
            &ds,
            &BucketScheme::default(),
            Granularity::Simulation,
        );
        assert_eq!(h.simulations, BTreeSet::from([SimulationId(3)]));
        assert_eq!(h.fields, BTreeSet::from([FieldId(104), FieldId(105)]));
    }

    #[test]
    fn field_selection_depends_on_granularity() {
        let ds = dataset();
        let sel = Selection::fields([FieldId(102)]);
        let scheme = BucketScheme::default();

        let by_field = Highlight::resolve(&sel, &ds, &scheme, Granularity::Field);
        assert_eq!(by_field.simulations, BTreeSet::from([SimulationId(2)]));
        assert_eq!(by_field.fields, BTreeSet::from([FieldId(102)]));

        let by_sim = Highlight::resolve(&sel, &ds, &scheme, Granularity::Simulation);
        assert_eq!(by_sim.simulations, BTreeSet::from([SimulationId(2)]));
        assert_eq!(by_sim.fields, BTreeSet::from([FieldId(102), FieldId(103)]));
    }

    #[test]
    fn none_resolves_to_empty_highlight() {
        let ds = dataset();
        let h = Highlight::resolve(
            &Selection::None,
            &ds,
            &BucketScheme::default(),
            Granularity::Field,
        );
        assert!(h.is_empty());
        assert!(!h.is_active());
        assert_eq!(h, Highlight::none(Granularity::Field));
    }

    #[test]
    fn empty_bucket_is_active_without_members() {
        let ds = dataset();
        // No simulation in the fixture falls in High
        let h = Highlight::resolve(
            &Selection::Bucket(Bucket::High),
            &ds,
            &BucketScheme::default(),
            Granularity::Simulation,
        );
        assert!(h.is_empty());
        assert!(h.is_active());
    }
}
