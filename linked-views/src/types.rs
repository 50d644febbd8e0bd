use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use tsify_next::Tsify;

// ============================================================================
// IDs - Data identifiers come from the loader, session handles from slotmap
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct SimulationId(pub u32);

impl SimulationId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sim#{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct FieldId(pub u32);

impl FieldId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}

new_key_type! {
    /// Handle for a view registered with a coordinator.
    pub struct ViewId;
    /// Handle for a selection-store observer.
    pub struct ObserverId;
}

/// Trait for converting SlotMap keys to u64 for WASM boundary
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for ViewId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for ObserverId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

/// Store write counter. Bumped on every `SelectionStore::set`, including resets.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Revision(pub u64);

impl Revision {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

// ============================================================================
// Outcomes - The summed program results carried by every simulation
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[serde(rename_all = "snake_case")]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Outcome {
    Cost,
    NitrogenRunoff,
    PhosphorusRunoff,
    SedimentRunoff,
    InfiltrationStorage,
    InfiltrationGde,
    IrrigationGroundwater,
    IrrigationSurface,
}

impl Outcome {
    /// Returns an iterator over all outcomes in display order
    pub fn all() -> impl Iterator<Item = Outcome> {
        [
            Outcome::Cost,
            Outcome::NitrogenRunoff,
            Outcome::PhosphorusRunoff,
            Outcome::SedimentRunoff,
            Outcome::InfiltrationStorage,
            Outcome::InfiltrationGde,
            Outcome::IrrigationGroundwater,
            Outcome::IrrigationSurface,
        ]
        .into_iter()
    }

    /// Stable key used in JSON payloads.
    pub fn key(self) -> &'static str {
        match self {
            Outcome::Cost => "cost",
            Outcome::NitrogenRunoff => "nitrogen_runoff",
            Outcome::PhosphorusRunoff => "phosphorus_runoff",
            Outcome::SedimentRunoff => "sediment_runoff",
            Outcome::InfiltrationStorage => "infiltration_storage",
            Outcome::InfiltrationGde => "infiltration_gde",
            Outcome::IrrigationGroundwater => "irrigation_groundwater",
            Outcome::IrrigationSurface => "irrigation_surface",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Cost => "Cost",
            Outcome::NitrogenRunoff => "Nitrogen runoff",
            Outcome::PhosphorusRunoff => "Phosphorus runoff",
            Outcome::SedimentRunoff => "Sediment runoff",
            Outcome::InfiltrationStorage => "Infiltration for storage",
            Outcome::InfiltrationGde => "Infiltration for GDEs",
            Outcome::IrrigationGroundwater => "Irrigation from groundwater",
            Outcome::IrrigationSurface => "Irrigation from surface water",
        }
    }

    pub fn from_key(key: &str) -> Option<Outcome> {
        Outcome::all().find(|o| o.key() == key)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
