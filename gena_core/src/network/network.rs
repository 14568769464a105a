//! This module provides the Network struct for representing an entire metabolic network
use indexmap::IndexMap;
use thiserror::Error;

use crate::network::compartment::{Compartment, CompartmentResolver};
use crate::network::compound::Compound;
use crate::network::reaction::{FluxSimulation, Reaction};

/// Represents a genome scale metabolic network
///
/// Compounds are the nodes of the network and reactions the hyperedges linking
/// them. Every compound referenced by a reaction is part of the network, and every
/// compound's compartment is known.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Network {
    /// Id associated with the network
    pub id: Option<String>,
    /// Human readable name
    pub name: Option<String>,
    compartments: IndexMap<String, Compartment>,
    compounds: IndexMap<String, Compound>,
    reactions: IndexMap<String, Reaction>,
}

impl Network {
    pub fn new_empty() -> Self {
        Network::default()
    }

    // region Adding Components
    /// Add a compartment to the network, replacing a compartment with the same id
    pub fn add_compartment(&mut self, compartment: Compartment) {
        self.compartments.insert(compartment.id.clone(), compartment);
    }

    /// Add a compound to the network
    ///
    /// The compartment of the compound must already be part of the network
    pub fn add_compound(&mut self, compound: Compound) -> Result<(), NetworkError> {
        if self.compounds.contains_key(&compound.id) {
            return Err(NetworkError::DuplicateCompound(compound.id));
        }
        if !self.compartments.contains_key(&compound.compartment) {
            return Err(NetworkError::UnknownCompartment {
                compound: compound.id,
                compartment: compound.compartment,
            });
        }
        self.compounds.insert(compound.id.clone(), compound);
        Ok(())
    }

    /// Add a compound, resolving its compartment through `resolver` if it is not known yet
    pub fn add_compound_resolved(
        &mut self,
        compound: Compound,
        resolver: &dyn CompartmentResolver,
    ) -> Result<(), NetworkError> {
        if !self.compartments.contains_key(&compound.compartment) {
            self.add_compartment(resolver.resolve(&compound.compartment));
        }
        self.add_compound(compound)
    }

    /// Add a reaction to the network
    ///
    /// # Examples
    /// ```rust
    /// use gena_core::network::compartment::{CompartmentResolver, StandardCompartments};
    /// use gena_core::network::compound::CompoundBuilder;
    /// use gena_core::network::network::Network;
    /// use gena_core::network::reaction::ReactionBuilder;
    /// let mut network = Network::new_empty();
    /// network.add_compartment(StandardCompartments.resolve("c"));
    /// network
    ///     .add_compound(CompoundBuilder::default().id("a_c").compartment("c").build().unwrap())
    ///     .unwrap();
    /// let mut metabolites = indexmap::IndexMap::new();
    /// metabolites.insert("a_c".to_string(), -1.0);
    /// let reaction = ReactionBuilder::default().id("R1").metabolites(metabolites).build().unwrap();
    /// network.add_reaction(reaction).unwrap();
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<(), NetworkError> {
        if self.reactions.contains_key(&reaction.id) {
            return Err(NetworkError::DuplicateReaction(reaction.id));
        }
        if let Some(missing) = reaction
            .metabolites
            .keys()
            .find(|id| !self.compounds.contains_key(*id))
        {
            return Err(NetworkError::UnknownCompound {
                reaction: reaction.id.clone(),
                compound: missing.clone(),
            });
        }
        self.reactions.insert(reaction.id.clone(), reaction);
        Ok(())
    }
    // endregion Adding Components

    // region Accessors
    pub fn compartments(&self) -> &IndexMap<String, Compartment> {
        &self.compartments
    }

    pub fn compounds(&self) -> &IndexMap<String, Compound> {
        &self.compounds
    }

    pub fn reactions(&self) -> &IndexMap<String, Reaction> {
        &self.reactions
    }

    pub fn get_reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.get(id)
    }

    pub fn get_compound(&self, id: &str) -> Option<&Compound> {
        self.compounds.get(id)
    }

    /// Compartment of a compound
    pub fn compound_compartment(&self, compound_id: &str) -> Option<&Compartment> {
        self.compounds
            .get(compound_id)
            .and_then(|c| self.compartments.get(&c.compartment))
    }

    /// Whether the compound takes part in the steady state mass balance
    pub fn is_steady_compound(&self, compound_id: &str) -> bool {
        self.compound_compartment(compound_id)
            .map(|c| c.is_steady())
            .unwrap_or(false)
    }

    pub fn reaction_ids(&self) -> Vec<String> {
        self.reactions.keys().cloned().collect()
    }

    pub fn compound_ids(&self) -> Vec<String> {
        self.compounds.keys().cloned().collect()
    }

    /// The biomass reaction
    ///
    /// A reaction flagged with `is_biomass` wins, otherwise this is the reaction
    /// producing a compound of a biomass compartment. Either must be unique.
    pub fn biomass_reaction(&self) -> Result<&Reaction, NetworkError> {
        let flagged = self.reactions.values().filter(|rxn| rxn.is_biomass);
        if let Some(reaction) = unique(flagged)? {
            return Ok(reaction);
        }
        let producing = self.reactions.values().filter(|rxn| {
            rxn.products().any(|(id, _)| {
                self.compound_compartment(id)
                    .map(|c| c.is_biomass())
                    .unwrap_or(false)
            })
        });
        unique(producing)?.ok_or(NetworkError::NoBiomassReaction)
    }
    // endregion Accessors

    // region Simulations
    /// Total absolute flux `Σ|v|` of a simulation, from the reaction annotations
    ///
    /// None if no reaction carries a value for this simulation
    pub fn total_abs_flux(&self, simulation: usize) -> Option<f64> {
        let values: Vec<f64> = self
            .reactions
            .values()
            .filter_map(|rxn| rxn.simulation(simulation).map(|s| s.value.abs()))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum())
        }
    }

    /// Create a copy of the network whose reactions carry the given simulations
    ///
    /// Reactions missing from `simulations` keep no simulation values
    pub fn with_simulations(&self, simulations: &IndexMap<String, Vec<FluxSimulation>>) -> Network {
        let mut network = self.clone();
        for (id, rxn) in network.reactions.iter_mut() {
            rxn.simulations = simulations.get(id).cloned().unwrap_or_default();
        }
        network
    }
    // endregion Simulations
}

fn unique<'a>(
    mut candidates: impl Iterator<Item = &'a Reaction>,
) -> Result<Option<&'a Reaction>, NetworkError> {
    let Some(first) = candidates.next() else {
        return Ok(None);
    };
    match candidates.next() {
        None => Ok(Some(first)),
        Some(second) => Err(NetworkError::AmbiguousBiomassReaction(
            first.id.clone(),
            second.id.clone(),
        )),
    }
}

/// Errors associated with building a network
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Compound {0} is already in the network")]
    DuplicateCompound(String),
    #[error("Reaction {0} is already in the network")]
    DuplicateReaction(String),
    #[error("Compartment {compartment} of compound {compound} is not in the network")]
    UnknownCompartment { compound: String, compartment: String },
    #[error("Compound {compound} of reaction {reaction} is not in the network")]
    UnknownCompound { reaction: String, compound: String },
    #[error("No reaction produces a biomass compound")]
    NoBiomassReaction,
    #[error("Several reactions produce a biomass compound ({0}, {1})")]
    AmbiguousBiomassReaction(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::compartment::StandardCompartments;
    use crate::network::compound::CompoundBuilder;
    use crate::network::reaction::ReactionBuilder;

    fn compound(id: &str, compartment: &str) -> Compound {
        CompoundBuilder::default()
            .id(id)
            .compartment(compartment)
            .build()
            .unwrap()
    }

    fn reaction(id: &str, stoichiometry: &[(&str, f64)]) -> Reaction {
        let metabolites = stoichiometry
            .iter()
            .map(|(id, coef)| (id.to_string(), *coef))
            .collect::<IndexMap<_, _>>();
        ReactionBuilder::default()
            .id(id)
            .metabolites(metabolites)
            .build()
            .unwrap()
    }

    fn setup_network() -> Network {
        let mut network = Network::new_empty();
        for (id, compartment) in [("glc_e", "e"), ("glc_c", "c"), ("biomass_b", "b")] {
            network
                .add_compound_resolved(compound(id, compartment), &StandardCompartments)
                .unwrap();
        }
        network
            .add_reaction(reaction("GLCt", &[("glc_e", -1.), ("glc_c", 1.)]))
            .unwrap();
        network
            .add_reaction(reaction("BIOMASS", &[("glc_c", -2.), ("biomass_b", 1.)]))
            .unwrap();
        network
    }

    #[test]
    fn add_components() {
        let network = setup_network();
        assert_eq!(network.compartments().len(), 3);
        assert_eq!(network.compound_ids(), vec!["glc_e", "glc_c", "biomass_b"]);
        assert_eq!(network.reaction_ids(), vec!["GLCt", "BIOMASS"]);
        assert!(network.is_steady_compound("glc_c"));
        assert!(!network.is_steady_compound("glc_e"));
    }

    #[test]
    fn invalid_components() {
        let mut network = setup_network();
        assert_eq!(
            network.add_compound(compound("x_q", "q")),
            Err(NetworkError::UnknownCompartment {
                compound: "x_q".to_string(),
                compartment: "q".to_string()
            })
        );
        assert_eq!(
            network.add_compound(compound("glc_c", "c")),
            Err(NetworkError::DuplicateCompound("glc_c".to_string()))
        );
        assert_eq!(
            network.add_reaction(reaction("BAD", &[("missing_c", -1.)])),
            Err(NetworkError::UnknownCompound {
                reaction: "BAD".to_string(),
                compound: "missing_c".to_string()
            })
        );
    }

    #[test]
    fn biomass_reaction() {
        let network = setup_network();
        assert_eq!(network.biomass_reaction().unwrap().id, "BIOMASS");

        let mut no_biomass = Network::new_empty();
        no_biomass
            .add_compound_resolved(compound("a_c", "c"), &StandardCompartments)
            .unwrap();
        assert_eq!(
            no_biomass.biomass_reaction(),
            Err(NetworkError::NoBiomassReaction)
        );
    }

    #[test]
    fn ambiguous_biomass_reaction() {
        let mut network = setup_network();
        network
            .add_reaction(reaction("BIOMASS2", &[("glc_e", -1.), ("biomass_b", 1.)]))
            .unwrap();
        assert_eq!(
            network.biomass_reaction(),
            Err(NetworkError::AmbiguousBiomassReaction(
                "BIOMASS".to_string(),
                "BIOMASS2".to_string()
            ))
        );

        // A flagged reaction settles it
        let mut flagged = reaction("GROWTH", &[("glc_c", -1.)]);
        flagged.is_biomass = true;
        network.add_reaction(flagged.clone()).unwrap();
        assert_eq!(network.biomass_reaction().unwrap().id, "GROWTH");

        flagged.id = "GROWTH2".to_string();
        network.add_reaction(flagged).unwrap();
        assert_eq!(
            network.biomass_reaction(),
            Err(NetworkError::AmbiguousBiomassReaction(
                "GROWTH".to_string(),
                "GROWTH2".to_string()
            ))
        );
    }

    #[test]
    fn simulations() {
        let network = setup_network();
        assert!(network.total_abs_flux(0).is_none());

        let mut simulations = IndexMap::new();
        simulations.insert(
            "GLCt".to_string(),
            vec![FluxSimulation {
                simulation: 0,
                value: 2.,
                lower_bound: 2.,
                upper_bound: 2.,
            }],
        );
        simulations.insert(
            "BIOMASS".to_string(),
            vec![FluxSimulation {
                simulation: 0,
                value: -1.,
                lower_bound: -1.,
                upper_bound: -1.,
            }],
        );
        let annotated = network.with_simulations(&simulations);
        assert!((annotated.total_abs_flux(0).unwrap() - 3.).abs() < 1e-12);
        // The original network is left untouched
        assert!(network.total_abs_flux(0).is_none());
    }
}
