//! Twins: a network paired with the context it is simulated under
use thiserror::Error;
use tracing::info;

use crate::analysis::result::FbaResult;
use crate::context::Context;
use crate::network::network::Network;

/// A network and its context, the unit of simulation
///
/// Every measure of the context references reactions or compounds of the
/// network. A twin is not modified once built, annotation returns a new twin.
#[derive(Clone, Debug, PartialEq)]
pub struct Twin {
    pub name: Option<String>,
    network: Network,
    context: Option<Context>,
}

impl Twin {
    /// Pair a network with an optional context, checking the references of the measures
    pub fn new(network: Network, context: Option<Context>) -> Result<Twin, TwinError> {
        if let Some(context) = &context {
            for measure in context.measures().values() {
                for variable in &measure.variables {
                    let id = variable.reference_id.as_str();
                    if network.get_reaction(id).is_none() && network.get_compound(id).is_none() {
                        return Err(TwinError::UnresolvedReference {
                            measure: measure.id.clone(),
                            reference: variable.reference_id.clone(),
                        });
                    }
                }
            }
        }
        Ok(Twin {
            name: network.name.clone(),
            network,
            context,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// The context, or an empty one when the twin has none
    pub fn context_or_empty(&self) -> Context {
        self.context.clone().unwrap_or_default()
    }
}

/// Writes simulation results back into the reactions of a twin
pub struct TwinAnnotator;

impl TwinAnnotator {
    /// A copy of the twin whose reactions carry the fluxes of the successful simulations
    pub fn annotate(twin: &Twin, result: &FbaResult) -> Twin {
        let annotations = result.simulation_annotations();
        info!(
            component = "twin",
            operation = "annotate",
            reactions = annotations.len(),
            simulations = result.successful_simulations().len(),
            "Annotated twin network"
        );
        Twin {
            name: twin.name.clone(),
            network: twin.network.with_simulations(&annotations),
            context: twin.context.clone(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TwinError {
    #[error("Measure {measure} references {reference}, which is neither a reaction nor a compound of the network")]
    UnresolvedReference { measure: String, reference: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::{FluxRow, SolverStatusRow};
    use crate::context::measure::Measure;
    use crate::network::compartment::StandardCompartments;
    use crate::network::compound::CompoundBuilder;
    use crate::network::reaction::ReactionBuilder;
    use crate::optimize::OptimizationStatus;
    use indexmap::IndexMap;

    fn setup_network() -> Network {
        let mut network = Network::new_empty();
        for id in ["A", "B"] {
            network
                .add_compound_resolved(
                    CompoundBuilder::default()
                        .id(id)
                        .compartment("e")
                        .build()
                        .unwrap(),
                    &StandardCompartments,
                )
                .unwrap();
        }
        let metabolites = [("A".to_string(), -1.), ("B".to_string(), 1.)]
            .into_iter()
            .collect::<IndexMap<_, _>>();
        network
            .add_reaction(
                ReactionBuilder::default()
                    .id("R1")
                    .metabolites(metabolites)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        network
    }

    #[test]
    fn references_are_checked() {
        let mut context = Context::new(None);
        context
            .add_measure(Measure::new_scalar("m1", "R1", 1., 0., 2., 1.).unwrap())
            .unwrap();
        context
            .add_measure(Measure::new_scalar("m2", "A", 1., 0., 2., 1.).unwrap())
            .unwrap();
        assert!(Twin::new(setup_network(), Some(context)).is_ok());

        let mut context = Context::new(None);
        context
            .add_measure(Measure::new_scalar("m1", "R2", 1., 0., 2., 1.).unwrap())
            .unwrap();
        assert_eq!(
            Twin::new(setup_network(), Some(context)),
            Err(TwinError::UnresolvedReference {
                measure: "m1".to_string(),
                reference: "R2".to_string()
            })
        );
    }

    #[test]
    fn annotate_returns_new_twin() {
        let twin = Twin::new(setup_network(), None).unwrap();
        let status = |simulation, success| SolverStatusRow {
            simulation,
            success,
            status: OptimizationStatus::Optimal,
            message: String::new(),
            objective_value: None,
        };
        let row = |simulation, value| FluxRow {
            simulation,
            reaction_id: "R1".to_string(),
            value,
            lower_bound: value,
            upper_bound: value,
        };
        let result = FbaResult {
            fluxes: vec![row(0, 2.), row(1, -3.)],
            sv: Vec::new(),
            solver_status: vec![status(0, true), status(1, false)],
        };
        let annotated = TwinAnnotator::annotate(&twin, &result);
        // The input twin is untouched
        assert!(twin.network().get_reaction("R1").unwrap().simulations.is_empty());
        let simulations = &annotated.network().get_reaction("R1").unwrap().simulations;
        assert_eq!(simulations.len(), 1);
        assert!((simulations[0].value - 2.).abs() < 1e-25);
        assert!((annotated.network().total_abs_flux(0).unwrap() - 2.).abs() < 1e-25);
        assert!(annotated.network().total_abs_flux(1).is_none());
    }
}
