use serde::Serialize;
use tsify_next::Tsify;

use crate::dataset::Dataset;
use crate::selection::Highlight;
use crate::types::Outcome;

#[derive(Debug, Clone, PartialEq, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct OutcomeStats {
    pub outcome: Outcome,
    pub count: usize, // simulations that report this outcome
    pub sum: f64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl OutcomeStats {
    fn empty(outcome: Outcome) -> Self {
        Self {
            outcome,
            count: 0,
            sum: 0.0,
            mean: None,
            min: None,
            max: None,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.mean = Some(self.sum / self.count as f64);
    }
}

/// Aggregated outcomes over the highlighted simulations.
#[derive(Debug, Clone, PartialEq, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Summary {
    pub simulations: usize,
    pub fields: usize,
    pub mean_recruitment_rate: Option<f64>,
    pub outcomes: Vec<OutcomeStats>,
}

impl Summary {
    pub fn of(dataset: &Dataset, highlight: &Highlight) -> Self {
        let mut outcomes: Vec<OutcomeStats> = Outcome::all().map(OutcomeStats::empty).collect();
        let mut rate_sum = 0.0;
        let mut simulations = 0usize;

        for sim in highlight
            .simulations
            .iter()
            .filter_map(|id| dataset.simulation(*id))
        {
            simulations += 1;
            rate_sum += sim.recruitment_rate;
            for stats in &mut outcomes {
                if let Some(value) = sim.outcome(stats.outcome) {
                    stats.push(value);
                }
            }
        }

        Self {
            simulations,
            fields: highlight.fields.len(),
            mean_recruitment_rate: (simulations > 0).then(|| rate_sum / simulations as f64),
            outcomes,
        }
    }

    pub fn get(&self, outcome: Outcome) -> Option<&OutcomeStats> {
        self.outcomes.iter().find(|s| s.outcome == outcome)
    }
}
