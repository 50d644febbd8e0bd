use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::LinkError;
use crate::geometry::Polygon;
use crate::types::{FieldId, Outcome, SimulationId};

// ============================================================================
// Simulation - One optimized program run
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: SimulationId,
    pub recruitment_rate: f64, // 0.0 - 1.0, landowner opt-in likelihood
    #[serde(default)]
    pub outcomes: BTreeMap<Outcome, f64>, // summed over the chosen fields
}

impl Simulation {
    pub fn new(id: SimulationId, recruitment_rate: f64) -> Self {
        Self {
            id,
            recruitment_rate,
            outcomes: BTreeMap::new(),
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome, value: f64) -> Self {
        self.outcomes.insert(outcome, value);
        self
    }

    /// Missing outcomes stay `None`; they are never read as zero.
    pub fn outcome(&self, outcome: Outcome) -> Option<f64> {
        self.outcomes.get(&outcome).copied()
    }
}

// ============================================================================
// Field - A parcel chosen by one simulation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub simulation: SimulationId,
    pub geometry: Polygon,
    #[serde(default)]
    pub net_present_cost: f64,
}

// ============================================================================
// Dataset - Immutable for the lifetime of a session
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawDataset {
    simulations: Vec<Simulation>,
    #[serde(default)]
    fields: Vec<Field>,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    simulations: Vec<Simulation>,
    fields: Vec<Field>,
    sim_index: HashMap<SimulationId, usize>,
    field_index: HashMap<FieldId, usize>,
    fields_by_sim: HashMap<SimulationId, Vec<FieldId>>,
}

/// Field ids are `u32`, so `synthetic` never generates more parcels than this.
pub const MAX_SYNTHETIC_FIELDS: u64 = u32::MAX as u64;

/// Upper bound on what `synthetic` reserves up front.
const PREALLOCATED_FIELDS: u64 = 1 << 16;

impl Dataset {
    /// Build and validate a dataset. Simulations keep their load order.
    pub fn new(simulations: Vec<Simulation>, fields: Vec<Field>) -> Result<Self, LinkError> {
        Self::validate(&simulations, &fields)?;
        Ok(Self::indexed(simulations, fields))
    }

    fn validate(simulations: &[Simulation], fields: &[Field]) -> Result<(), LinkError> {
        let mut sim_ids = HashSet::with_capacity(simulations.len());
        for sim in simulations {
            if !sim.recruitment_rate.is_finite() || !(0.0..=1.0).contains(&sim.recruitment_rate) {
                return Err(LinkError::InvalidRate {
                    simulation: sim.id,
                    rate: sim.recruitment_rate,
                });
            }
            if !sim_ids.insert(sim.id) {
                return Err(LinkError::DuplicateSimulation(sim.id));
            }
        }

        let mut field_ids = HashSet::with_capacity(fields.len());
        for field in fields {
            if !sim_ids.contains(&field.simulation) {
                return Err(LinkError::OrphanField {
                    field: field.id,
                    simulation: field.simulation,
                });
            }
            if field.geometry.is_degenerate() {
                return Err(LinkError::DegeneratePolygon(field.id));
            }
            if !field_ids.insert(field.id) {
                return Err(LinkError::DuplicateField(field.id));
            }
        }
        Ok(())
    }

    /// Index rows that already passed `validate`.
    fn indexed(simulations: Vec<Simulation>, fields: Vec<Field>) -> Self {
        let sim_index = simulations
            .iter()
            .enumerate()
            .map(|(idx, sim)| (sim.id, idx))
            .collect();

        let mut field_index = HashMap::with_capacity(fields.len());
        let mut fields_by_sim: HashMap<SimulationId, Vec<FieldId>> = HashMap::new();
        for (idx, field) in fields.iter().enumerate() {
            field_index.insert(field.id, idx);
            fields_by_sim.entry(field.simulation).or_default().push(field.id);
        }

        Self {
            simulations,
            fields,
            sim_index,
            field_index,
            fields_by_sim,
        }
    }

    /// Parse `{ "simulations": [...], "fields": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, LinkError> {
        let raw: RawDataset = serde_json::from_str(json)?;
        Self::new(raw.simulations, raw.fields)
    }

    /// Number of parcels `synthetic` would generate.
    pub fn synthetic_field_count(simulations: u32, fields_per_simulation: u32) -> u64 {
        u64::from(simulations) * u64::from(fields_per_simulation)
    }

    /// Deterministic demo data: `simulations` programs laid out in a grid,
    /// each owning `fields_per_simulation` unit-square parcels.
    ///
    /// Parcel ids are sequential `u32`s. Callers keep `synthetic_field_count`
    /// at or below `MAX_SYNTHETIC_FIELDS`.
    pub fn synthetic(seed: u64, simulations: u32, fields_per_simulation: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let columns = (simulations as f64).sqrt().ceil().max(1.0) as u32;
        let pitch = (fields_per_simulation as f64).sqrt().ceil().max(1.0) + 1.0;
        let block = (pitch - 1.0) as u32;

        let mut sims = Vec::with_capacity(field_capacity(u64::from(simulations)));
        let mut fields = Vec::with_capacity(field_capacity(Self::synthetic_field_count(
            simulations,
            fields_per_simulation,
        )));
        let mut next_field = 0u32;

        for s in 0..simulations {
            let id = SimulationId::new(s);
            let rate: f64 = rng.random_range(0.0..=1.0);
            let origin = (
                f64::from(s % columns) * pitch,
                f64::from(s / columns) * pitch,
            );

            let mut cost = 0.0;
            for f in 0..fields_per_simulation {
                let npc: f64 = rng.random_range(500.0..5_000.0);
                cost += npc;
                let corner = (origin.0 + (f % block) as f64, origin.1 + (f / block) as f64);
                fields.push(Field {
                    id: FieldId::new(next_field),
                    simulation: id,
                    geometry: Polygon::square(corner, 1.0),
                    net_present_cost: npc,
                });
                next_field += 1;
            }

            // Benefits scale with how many landowners actually enrol
            let enrolled = rate * fields_per_simulation as f64;
            let noise = |rng: &mut StdRng| rng.random_range(0.8..1.2);
            let sim = Simulation::new(id, rate)
                .with_outcome(Outcome::Cost, cost * rate)
                .with_outcome(Outcome::NitrogenRunoff, 120.0 * enrolled * noise(&mut rng))
                .with_outcome(Outcome::PhosphorusRunoff, 18.0 * enrolled * noise(&mut rng))
                .with_outcome(Outcome::SedimentRunoff, 3.5 * enrolled * noise(&mut rng))
                .with_outcome(Outcome::InfiltrationStorage, 40.0 * enrolled * noise(&mut rng))
                .with_outcome(Outcome::InfiltrationGde, 25.0 * enrolled * noise(&mut rng))
                .with_outcome(
                    Outcome::IrrigationGroundwater,
                    60.0 * enrolled * noise(&mut rng),
                )
                .with_outcome(Outcome::IrrigationSurface, 45.0 * enrolled * noise(&mut rng));
            sims.push(sim);
        }

        // Generated ids are unique and rates are in range
        Self::indexed(sims, fields)
    }

    // === Lookups ===

    pub fn simulations(&self) -> &[Simulation] {
        &self.simulations
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn simulation(&self, id: SimulationId) -> Option<&Simulation> {
        self.sim_index.get(&id).map(|&idx| &self.simulations[idx])
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.field_index.get(&id).map(|&idx| &self.fields[idx])
    }

    pub fn has_simulation(&self, id: SimulationId) -> bool {
        self.sim_index.contains_key(&id)
    }

    pub fn has_field(&self, id: FieldId) -> bool {
        self.field_index.contains_key(&id)
    }

    /// Fields chosen by a simulation, in load order. Empty for unknown ids.
    pub fn fields_of(&self, id: SimulationId) -> &[FieldId] {
        self.fields_by_sim.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn simulation_of(&self, field: FieldId) -> Option<SimulationId> {
        self.field(field).map(|f| f.simulation)
    }

    pub fn simulation_ids(&self) -> impl Iterator<Item = SimulationId> + '_ {
        self.simulations.iter().map(|s| s.id)
    }

    pub fn is_empty(&self) -> bool {
        self.simulations.is_empty()
    }

    pub fn distinct_field_count(&self) -> usize {
        self.fields.iter().map(|f| f.id).collect::<HashSet<_>>().len()
    }
}

/// Vec capacity for `count` generated rows, bounded so huge requests grow lazily.
fn field_capacity(count: u64) -> usize {
    count.min(PREALLOCATED_FIELDS) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: u32, sim: u32, x: f64) -> Field {
        Field {
            id: FieldId::new(id),
            simulation: SimulationId::new(sim),
            geometry: Polygon::square((x, 0.0), 1.0),
            net_present_cost: 10.0,
        }
    }

    #[test]
    fn rejects_out_of_range_rate() {
        let err = Dataset::new(vec![Simulation::new(SimulationId::new(1), 1.2)], vec![])
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidRate { .. }));

        let err = Dataset::new(vec![Simulation::new(SimulationId::new(1), f64::NAN)], vec![])
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidRate { .. }));
    }

    #[test]
    fn rejects_duplicates_and_orphans() {
        let sims = vec![
            Simulation::new(SimulationId::new(1), 0.2),
            Simulation::new(SimulationId::new(1), 0.3),
        ];
        assert!(matches!(
            Dataset::new(sims, vec![]),
            Err(LinkError::DuplicateSimulation(SimulationId(1)))
        ));

        let sims = vec![Simulation::new(SimulationId::new(1), 0.2)];
        assert!(matches!(
            Dataset::new(sims.clone(), vec![field(1, 9, 0.0)]),
            Err(LinkError::OrphanField { .. })
        ));
        assert!(matches!(
            Dataset::new(sims, vec![field(1, 1, 0.0), field(1, 1, 2.0)]),
            Err(LinkError::DuplicateField(FieldId(1)))
        ));
    }

    #[test]
    fn indexes_fields_by_simulation() {
        let sims = vec![
            Simulation::new(SimulationId::new(1), 0.2),
            Simulation::new(SimulationId::new(2), 0.8),
        ];
        let fields = vec![field(10, 1, 0.0), field(11, 2, 2.0), field(12, 1, 4.0)];
        let ds = Dataset::new(sims, fields).unwrap();

        assert_eq!(ds.fields_of(SimulationId::new(1)), &[FieldId(10), FieldId(12)]);
        assert_eq!(ds.fields_of(SimulationId::new(2)), &[FieldId(11)]);
        assert!(ds.fields_of(SimulationId::new(3)).is_empty());
        assert_eq!(ds.simulation_of(FieldId(11)), Some(SimulationId(2)));
    }

    #[test]
    fn parses_json_with_outcome_keys() {
        let json = r#"{
            "simulations": [
                {"id": 1, "recruitment_rate": 0.4, "outcomes": {"cost": 1200.0, "nitrogen_runoff": 3.5}}
            ],
            "fields": [
                {"id": 7, "simulation": 1, "geometry": [[0,0],[1,0],[1,1]], "net_present_cost": 99.0}
            ]
        }"#;
        let ds = Dataset::from_json(json).unwrap();
        let sim = ds.simulation(SimulationId::new(1)).unwrap();
        assert_eq!(sim.outcome(Outcome::Cost), Some(1200.0));
        assert_eq!(sim.outcome(Outcome::SedimentRunoff), None);
        assert_eq!(ds.field(FieldId::new(7)).unwrap().net_present_cost, 99.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            Dataset::from_json("{\"simulations\": 3}"),
            Err(LinkError::Json(_))
        ));
    }

    #[test]
    fn synthetic_is_deterministic_and_valid() {
        let a = Dataset::synthetic(42, 30, 4);
        let b = Dataset::synthetic(42, 30, 4);
        assert_eq!(a.simulations(), b.simulations());
        assert_eq!(a.fields().len(), 120);
        assert_eq!(a.distinct_field_count(), 120);

        // Re-validating the generated data must succeed
        let revalidated = Dataset::new(a.simulations().to_vec(), a.fields().to_vec());
        assert!(revalidated.is_ok());

        for sim in a.simulations() {
            assert_eq!(a.fields_of(sim.id).len(), 4);
            assert_eq!(sim.outcomes.len(), Outcome::all().count());
        }
    }

    #[test]
    fn oversized_synthetic_request_is_counted_without_overflow() {
        let count = Dataset::synthetic_field_count(u32::MAX, u32::MAX);
        assert_eq!(count, u64::from(u32::MAX) * u64::from(u32::MAX));
        assert!(count > MAX_SYNTHETIC_FIELDS);
        assert_eq!(field_capacity(count), PREALLOCATED_FIELDS as usize);
        assert_eq!(field_capacity(12), 12);

        // A huge per-simulation count with no simulations allocates nothing
        let ds = Dataset::synthetic(1, 0, u32::MAX);
        assert!(ds.is_empty());
        assert!(ds.fields().is_empty());
    }
}
