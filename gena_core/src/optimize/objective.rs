//! Provides the objective of a flux optimization problem
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimize::sparse::SparseAccumulator;

/// Sense of a linear flux objective
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

impl ObjectiveSense {
    /// Sign applied to a weight to express it in a minimization
    pub fn sign(&self) -> f64 {
        match self {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        }
    }
}

impl FromStr for ObjectiveSense {
    type Err = ObjectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min" | "minimize" => Ok(ObjectiveSense::Minimize),
            "max" | "maximize" => Ok(ObjectiveSense::Maximize),
            _ => Err(ObjectiveError::InvalidSense(s.to_string())),
        }
    }
}

impl Display for ObjectiveSense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveSense::Minimize => write!(f, "minimize"),
            ObjectiveSense::Maximize => write!(f, "maximize"),
        }
    }
}

/// A weighted reaction flux in a linear objective
#[derive(Clone, Debug, PartialEq)]
pub struct FluxObjective {
    pub reaction_id: String,
    pub weight: f64,
}

impl FluxObjective {
    pub fn new(reaction_id: &str, weight: f64) -> Self {
        Self {
            reaction_id: reaction_id.to_string(),
            weight,
        }
    }

    /// Parse an objective entry of the form `reaction_id` or `reaction_id:weight`
    pub fn parse(entry: &str) -> Result<Self, ObjectiveError> {
        match entry.rsplit_once(':') {
            Some((id, weight)) => {
                let weight = weight
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ObjectiveError::InvalidEntry(entry.to_string()))?;
                if id.trim().is_empty() || !weight.is_finite() {
                    return Err(ObjectiveError::InvalidEntry(entry.to_string()));
                }
                Ok(FluxObjective::new(id.trim(), weight))
            }
            None if !entry.trim().is_empty() => Ok(FluxObjective::new(entry.trim(), 1.)),
            None => Err(ObjectiveError::InvalidEntry(entry.to_string())),
        }
    }
}

/// Objective of a problem in standard form: minimize `½·vᵀ·P·v + qᵀ·v + offset`
///
/// `P` only stores its upper triangle. Maximized fluxes are stored with a negated
/// weight, `sense` records the direction requested by the caller so the optimal
/// value can be reported in its terms.
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemObjective {
    /// Linear coefficients `q`, one per reaction
    pub linear: Vec<f64>,
    /// Quadratic coefficients `P`, upper triangle
    pub quadratic: SparseAccumulator,
    /// Constant term
    pub offset: f64,
    /// Sense of the linear part requested by the caller
    pub sense: ObjectiveSense,
}

impl ProblemObjective {
    /// An empty (feasibility) objective over `num_variables` fluxes
    pub fn zero(num_variables: usize) -> Self {
        Self {
            linear: vec![0.; num_variables],
            quadratic: SparseAccumulator::new(num_variables, num_variables),
            offset: 0.,
            sense: ObjectiveSense::Minimize,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.linear.len()
    }

    pub fn is_quadratic(&self) -> bool {
        !self.quadratic.is_empty()
    }

    pub fn has_linear_terms(&self) -> bool {
        self.linear.iter().any(|q| *q != 0.)
    }

    /// Add `weight·v[index]` to the objective, in the given sense
    pub fn add_linear(&mut self, index: usize, weight: f64, sense: ObjectiveSense) {
        self.linear[index] += sense.sign() * weight;
    }

    /// Add `confidence·(row·v − target)²` to the objective
    pub fn add_squared_residual(&mut self, row: &[(usize, f64)], target: f64, confidence: f64) {
        if confidence == 0. {
            return;
        }
        self.quadratic.add_gram_upper(row, 2. * confidence);
        for &(col, coef) in row {
            self.linear[col] -= 2. * confidence * target * coef;
        }
        self.offset += confidence * target * target;
    }

    /// Add `strength·Σ v²` to the objective
    pub fn add_l2_penalty(&mut self, strength: f64) {
        if strength == 0. {
            return;
        }
        for i in 0..self.num_variables() {
            self.quadratic.add(i, i, 2. * strength);
        }
    }

    /// Value of the standard form objective at `x`
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        let linear: f64 = self.linear.iter().zip(x).map(|(q, v)| q * v).sum();
        let quadratic: f64 = self
            .quadratic
            .iter()
            .map(|(i, j, p)| {
                let term = p * x[i] * x[j];
                // Off diagonal entries stand for both triangles
                if i == j {
                    0.5 * term
                } else {
                    term
                }
            })
            .sum();
        quadratic + linear + self.offset
    }

    /// Convert a standard form objective value to the sense requested by the caller
    pub fn report(&self, value: f64) -> f64 {
        self.sense.sign() * value
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjectiveError {
    #[error("Invalid objective sense {0}, expected minimize or maximize")]
    InvalidSense(String),
    #[error("Invalid objective entry {0}, expected reaction_id or reaction_id:weight")]
    InvalidEntry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sense() {
        assert_eq!(
            "Maximize".parse::<ObjectiveSense>().unwrap(),
            ObjectiveSense::Maximize
        );
        assert_eq!(
            "min".parse::<ObjectiveSense>().unwrap(),
            ObjectiveSense::Minimize
        );
        assert!("sideways".parse::<ObjectiveSense>().is_err());
    }

    #[test]
    fn parse_flux_objective() {
        assert_eq!(
            FluxObjective::parse("BIOMASS").unwrap(),
            FluxObjective::new("BIOMASS", 1.)
        );
        assert_eq!(
            FluxObjective::parse("R1:0.5").unwrap(),
            FluxObjective::new("R1", 0.5)
        );
        assert!(FluxObjective::parse("R1:abc").is_err());
        assert!(FluxObjective::parse(":2").is_err());
        assert!(FluxObjective::parse("").is_err());
    }

    #[test]
    fn squared_residual() {
        // 2·(v0 + v1 − 3)²
        let mut objective = ProblemObjective::zero(2);
        objective.add_squared_residual(&[(0, 1.), (1, 1.)], 3., 2.);
        assert!(objective.is_quadratic());
        assert!(objective.evaluate(&[1., 2.]).abs() < 1e-12);
        assert!((objective.evaluate(&[0., 0.]) - 18.).abs() < 1e-12);
        assert!((objective.evaluate(&[2., 2.]) - 2.).abs() < 1e-12);
    }

    #[test]
    fn linear_and_penalty() {
        let mut objective = ProblemObjective::zero(2);
        objective.sense = ObjectiveSense::Maximize;
        objective.add_linear(1, 2., ObjectiveSense::Maximize);
        assert!((objective.linear[1] + 2.).abs() < 1e-25);
        objective.add_l2_penalty(0.5);
        // 0.5·(1 + 4) − 2·2
        assert!((objective.evaluate(&[1., 2.]) + 1.5).abs() < 1e-12);
        assert!((objective.report(-4.) - 4.).abs() < 1e-25);
    }
}
