//! Contexts: experimental measurements used to contextualize a network
pub mod json;
pub mod measure;

use indexmap::IndexMap;
use thiserror::Error;

use crate::context::measure::Measure;

/// A named collection of measures
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    /// Name of the context
    pub name: Option<String>,
    measures: IndexMap<String, Measure>,
}

impl Context {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(|n| n.to_string()),
            measures: IndexMap::new(),
        }
    }

    /// Add a measure, its values are checked before insertion
    pub fn add_measure(&mut self, measure: Measure) -> Result<(), ContextError> {
        measure.validate()?;
        if self.measures.contains_key(&measure.id) {
            return Err(ContextError::DuplicateMeasure(measure.id));
        }
        self.measures.insert(measure.id.clone(), measure);
        Ok(())
    }

    pub fn measures(&self) -> &IndexMap<String, Measure> {
        &self.measures
    }

    pub fn get_measure(&self, id: &str) -> Option<&Measure> {
        self.measures.get(id)
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    /// Length shared by the vector measures, None if every measure is scalar
    ///
    /// Fails when two vector measures have different lengths
    pub fn vector_length(&self) -> Result<Option<usize>, ContextError> {
        let mut length: Option<(&str, usize)> = None;
        for measure in self.measures.values().filter(|m| m.is_vector()) {
            match length {
                None => length = Some((measure.id.as_str(), measure.len())),
                Some((first, len)) if len != measure.len() => {
                    return Err(ContextError::InconsistentSimulationCount(format!(
                        "measure {} has {} values while measure {} has {}",
                        first,
                        len,
                        measure.id,
                        measure.len()
                    )))
                }
                _ => {}
            }
        }
        Ok(length.map(|(_, len)| len))
    }

    /// Number of simulations described by the context, 1 for scalar or empty contexts
    pub fn num_simulations(&self) -> Result<usize, ContextError> {
        Ok(self.vector_length()?.unwrap_or(1))
    }

    /// Whether every measure holds a single value
    pub fn is_single_simulation(&self) -> bool {
        self.measures.values().all(|m| m.len() == 1)
    }

    /// The single valued context of one simulation
    pub fn sub_context(&self, simulation: usize) -> Result<Context, ContextError> {
        let mut measures = IndexMap::new();
        for measure in self.measures.values() {
            let sub = measure
                .at(simulation)
                .ok_or(ContextError::SimulationOutOfRange {
                    measure: measure.id.clone(),
                    simulation,
                    available: measure.len(),
                })?;
            measures.insert(sub.id.clone(), sub);
        }
        Ok(Context {
            name: self.name.clone(),
            measures,
        })
    }
}

/// Errors associated with contexts and measures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    /// The bounds and target of a measure are inconsistent
    #[error("Inconsistent measure {measure}: {reason}")]
    Constraint { measure: String, reason: String },
    /// The numbers of values of vector fields disagree
    #[error("Inconsistent number of simulations: {0}")]
    InconsistentSimulationCount(String),
    #[error("Measure {measure} has {available} values, simulation {simulation} is not available")]
    SimulationOutOfRange {
        measure: String,
        simulation: usize,
        available: usize,
    },
    #[error("Measure {0} is already in the context")]
    DuplicateMeasure(String),
    #[error("Unable to build measure: {0}")]
    Builder(String),
    #[error("Unable to parse context: {0}")]
    Parse(String),
    #[error("Unable to serialize context: {0}")]
    Serialize(String),
    #[error("Unable to read or write context: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::measure::{MeasureBuilder, Variable};

    fn vector_measure(id: &str, values: &[f64]) -> Measure {
        MeasureBuilder::default()
            .id(id)
            .target(values.to_vec())
            .lower_bound(vec![-100.; values.len()])
            .upper_bound(vec![100.; values.len()])
            .confidence_score(vec![1.; values.len()])
            .variables(vec![Variable::new("R1", 1.)])
            .build()
            .unwrap()
    }

    #[test]
    fn num_simulations() {
        let mut context = Context::new(Some("ctx"));
        assert_eq!(context.num_simulations().unwrap(), 1);
        context
            .add_measure(Measure::new_scalar("scalar", "R1", 1., 0., 2., 1.).unwrap())
            .unwrap();
        assert_eq!(context.num_simulations().unwrap(), 1);
        context.add_measure(vector_measure("m1", &[1., 2., 3.])).unwrap();
        assert_eq!(context.num_simulations().unwrap(), 3);
        context.add_measure(vector_measure("m2", &[1., 2.])).unwrap();
        match context.num_simulations() {
            Err(ContextError::InconsistentSimulationCount(_)) => {}
            _ => panic!("Inconsistent simulation count not caught"),
        }
    }

    #[test]
    fn sub_context() {
        let mut context = Context::new(None);
        context
            .add_measure(Measure::new_scalar("scalar", "R1", 1., 0., 2., 1.).unwrap())
            .unwrap();
        context.add_measure(vector_measure("m1", &[1., 2., 3.])).unwrap();
        let sub = context.sub_context(2).unwrap();
        assert!(sub.is_single_simulation());
        assert!((sub.get_measure("m1").unwrap().target[0] - 3.).abs() < 1e-25);
        assert!((sub.get_measure("scalar").unwrap().target[0] - 1.).abs() < 1e-25);
        assert!(context.sub_context(3).is_err());
    }

    #[test]
    fn duplicate_measure() {
        let mut context = Context::new(None);
        context
            .add_measure(Measure::new_scalar("m", "R1", 1., 0., 2., 1.).unwrap())
            .unwrap();
        assert_eq!(
            context.add_measure(Measure::new_scalar("m", "R2", 1., 0., 2., 1.).unwrap()),
            Err(ContextError::DuplicateMeasure("m".to_string()))
        );
    }
}
