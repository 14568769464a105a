//! This module provides a struct for representing reactions
use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::configuration::{default_lower_bound, default_upper_bound};

/// Represents a reaction of the network
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Compound stoichiometry of the reaction, substrates are negative and products positive
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lower flux bound
    #[builder(default = "default_lower_bound()")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "default_upper_bound()")]
    pub upper_bound: f64,
    /// EC numbers of the enzymes catalysing the reaction
    #[builder(default = "Vec::new()")]
    pub ec_numbers: Vec<String>,
    /// Name of the enzyme catalysing the reaction
    #[builder(default = "None")]
    pub enzyme: Option<String>,
    /// Marks the biomass reaction of networks without a biomass compartment
    #[builder(default = "false")]
    pub is_biomass: bool,
    /// Simulated flux values, one entry per simulation
    #[builder(default = "Vec::new()")]
    pub simulations: Vec<FluxSimulation>,
}

impl ReactionBuilder {
    fn validate(&self) -> Result<(), String> {
        let lower_bound = self.lower_bound.unwrap_or_else(default_lower_bound);
        let upper_bound = self.upper_bound.unwrap_or_else(default_upper_bound);
        if lower_bound.is_nan() || upper_bound.is_nan() {
            return Err("reaction bounds can't be NaN".to_string());
        }
        if lower_bound > upper_bound {
            return Err(format!(
                "lower_bound ({}) is greater than upper_bound ({})",
                lower_bound, upper_bound
            ));
        }
        Ok(())
    }
}

impl Reaction {
    /// Direction implied by the flux bounds
    pub fn direction(&self) -> ReactionDirection {
        if self.lower_bound < 0. && self.upper_bound > 0. {
            ReactionDirection::Bidirectional
        } else if self.upper_bound > 0. {
            ReactionDirection::Forward
        } else if self.lower_bound < 0. {
            ReactionDirection::Backward
        } else {
            ReactionDirection::Blocked
        }
    }

    /// Compounds consumed by the reaction, with positive stoichiometry
    pub fn substrates(&self) -> impl Iterator<Item = (&str, f64)> {
        self.metabolites
            .iter()
            .filter(|(_, coef)| **coef < 0.)
            .map(|(id, coef)| (id.as_str(), -coef))
    }

    /// Compounds produced by the reaction
    pub fn products(&self) -> impl Iterator<Item = (&str, f64)> {
        self.metabolites
            .iter()
            .filter(|(_, coef)| **coef > 0.)
            .map(|(id, coef)| (id.as_str(), *coef))
    }

    /// Simulated flux of a given simulation, if the reaction was annotated
    pub fn simulation(&self, simulation: usize) -> Option<&FluxSimulation> {
        self.simulations.iter().find(|s| s.simulation == simulation)
    }
}

/// Direction of a reaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionDirection {
    /// Only carries positive flux
    Forward,
    /// Only carries negative flux
    Backward,
    /// Can carry flux in both directions
    Bidirectional,
    /// Can't carry any flux
    Blocked,
}

/// Simulated flux of a reaction (the `notes["simulations"]` entries)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluxSimulation {
    /// Index of the simulation the value belongs to
    pub simulation: usize,
    /// Flux value
    #[serde(deserialize_with = "null_as_nan")]
    pub value: f64,
    /// Lower bound of the flux estimate
    #[serde(deserialize_with = "null_as_nan")]
    pub lower_bound: f64,
    /// Upper bound of the flux estimate
    #[serde(deserialize_with = "null_as_nan")]
    pub upper_bound: f64,
}

/// serde_json writes non finite floats as null
fn null_as_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
