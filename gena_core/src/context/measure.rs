//! Measures, the experimental constraints layered onto a network
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::context::ContextError;

/// Links a measure to a reaction or a compound of the network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Id of the referenced reaction or compound
    pub reference_id: String,
    /// Coefficient of the referenced flux (or pool variation) in the measure
    pub coefficient: f64,
}

impl Variable {
    pub fn new(reference_id: &str, coefficient: f64) -> Self {
        Self {
            reference_id: reference_id.to_string(),
            coefficient,
        }
    }
}

/// A measurement of a combination of fluxes
///
/// Every numeric field holds one value per simulation. A scalar measure has
/// single valued fields, and is shared by all the simulations. `NaN` marks a
/// missing value.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(build_fn(private, name = "build_unchecked"))]
pub struct Measure {
    /// Used to identify the measure
    #[builder(setter(into))]
    pub id: String,
    /// Human readable name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Measured values
    #[builder(default = "vec![f64::NAN]")]
    pub target: Vec<f64>,
    /// Lowest admissible values
    #[builder(default = "vec![f64::NAN]")]
    pub lower_bound: Vec<f64>,
    /// Highest admissible values
    #[builder(default = "vec![f64::NAN]")]
    pub upper_bound: Vec<f64>,
    /// Confidence in the measured values, used to weight them
    #[builder(default = "vec![1.0]")]
    pub confidence_score: Vec<f64>,
    /// The fluxes combined by the measure
    #[builder(default = "Vec::new()")]
    pub variables: Vec<Variable>,
}

impl MeasureBuilder {
    /// Build the measure, checking the consistency of its values
    pub fn build(&self) -> Result<Measure, ContextError> {
        let measure = self
            .build_unchecked()
            .map_err(|err| ContextError::Builder(err.to_string()))?;
        measure.validate()?;
        Ok(measure)
    }
}

impl Measure {
    /// Create a single simulation measure on one reaction or compound
    pub fn new_scalar(
        id: &str,
        reference_id: &str,
        target: f64,
        lower_bound: f64,
        upper_bound: f64,
        confidence_score: f64,
    ) -> Result<Measure, ContextError> {
        MeasureBuilder::default()
            .id(id)
            .target(vec![target])
            .lower_bound(vec![lower_bound])
            .upper_bound(vec![upper_bound])
            .confidence_score(vec![confidence_score])
            .variables(vec![Variable::new(reference_id, 1.0)])
            .build()
    }

    /// Number of values held by each field
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Whether the measure holds one value per simulation rather than a shared scalar
    pub fn is_vector(&self) -> bool {
        self.len() > 1
    }

    /// Check that the fields have equal lengths and that the values present are ordered
    pub fn validate(&self) -> Result<(), ContextError> {
        let lengths = [
            self.target.len(),
            self.lower_bound.len(),
            self.upper_bound.len(),
            self.confidence_score.len(),
        ];
        if lengths[0] == 0 || lengths.iter().any(|l| *l != lengths[0]) {
            return Err(ContextError::InconsistentSimulationCount(format!(
                "measure {} has fields of lengths {:?} (target, lower_bound, upper_bound, confidence_score)",
                self.id, lengths
            )));
        }
        for i in 0..self.len() {
            check_ordering(
                &self.id,
                self.target[i],
                self.lower_bound[i],
                self.upper_bound[i],
            )?;
        }
        Ok(())
    }

    /// The single valued measure of a simulation
    ///
    /// Scalar measures are shared by every simulation. Returns None when a vector
    /// measure has no value for `simulation`.
    pub fn at(&self, simulation: usize) -> Option<Measure> {
        let index = if self.is_vector() { simulation } else { 0 };
        if index >= self.len() {
            return None;
        }
        Some(Measure {
            id: self.id.clone(),
            name: self.name.clone(),
            target: vec![self.target[index]],
            lower_bound: vec![self.lower_bound[index]],
            upper_bound: vec![self.upper_bound[index]],
            confidence_score: vec![self.confidence_score[index]],
            variables: self.variables.clone(),
        })
    }
}

/// Check `lower_bound <= target <= upper_bound`, ignoring missing (NaN) values
pub(crate) fn check_ordering(
    measure: &str,
    target: f64,
    lower_bound: f64,
    upper_bound: f64,
) -> Result<(), ContextError> {
    if upper_bound < lower_bound {
        return Err(ContextError::Constraint {
            measure: measure.to_string(),
            reason: format!(
                "upper_bound ({}) is lower than lower_bound ({})",
                upper_bound, lower_bound
            ),
        });
    }
    if target < lower_bound || target > upper_bound {
        return Err(ContextError::Constraint {
            measure: measure.to_string(),
            reason: format!(
                "target ({}) is outside of [{}, {}]",
                target, lower_bound, upper_bound
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_measure() {
        let measure = Measure::new_scalar("m1", "R1", 5., 0., 10., 1.).unwrap();
        assert_eq!(measure.len(), 1);
        assert!(!measure.is_vector());
        assert_eq!(measure.variables, vec![Variable::new("R1", 1.)]);
        // A scalar measure is shared by all simulations
        let sub = measure.at(7).unwrap();
        assert!((sub.target[0] - 5.).abs() < 1e-25);
    }

    #[test]
    fn inverted_bounds() {
        match Measure::new_scalar("m1", "R1", 3., 5., 2., 1.) {
            Err(ContextError::Constraint { measure, .. }) => assert_eq!(measure, "m1"),
            _ => panic!("Inverted bounds not caught"),
        }
    }

    #[test]
    fn target_out_of_bounds() {
        match Measure::new_scalar("m1", "R1", 12., 0., 10., 1.) {
            Err(ContextError::Constraint { .. }) => {}
            _ => panic!("Target out of bounds not caught"),
        }
    }

    #[test]
    fn missing_values_are_not_checked() {
        let measure = MeasureBuilder::default()
            .id("m1")
            .target(vec![f64::NAN])
            .upper_bound(vec![10.])
            .build()
            .unwrap();
        assert!(measure.target[0].is_nan());
        assert!(measure.lower_bound[0].is_nan());
    }

    #[test]
    fn inconsistent_lengths() {
        let res = MeasureBuilder::default()
            .id("m1")
            .target(vec![1., 2., 3.])
            .lower_bound(vec![0., 0.])
            .upper_bound(vec![10., 10., 10.])
            .confidence_score(vec![1., 1., 1.])
            .build();
        match res {
            Err(ContextError::InconsistentSimulationCount(_)) => {}
            _ => panic!("Inconsistent lengths not caught"),
        }
    }

    #[test]
    fn vector_measure() {
        let measure = MeasureBuilder::default()
            .id("m1")
            .target(vec![1., 2., 3.])
            .lower_bound(vec![0., 0., 0.])
            .upper_bound(vec![10., 10., 10.])
            .confidence_score(vec![1., 0.5, 1.])
            .variables(vec![Variable::new("R1", 1.)])
            .build()
            .unwrap();
        assert!(measure.is_vector());
        let second = measure.at(1).unwrap();
        assert!((second.target[0] - 2.).abs() < 1e-25);
        assert!((second.confidence_score[0] - 0.5).abs() < 1e-25);
        assert!(measure.at(3).is_none());
    }
}
