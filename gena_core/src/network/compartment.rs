//! Compartments, and the lookup service used to resolve them from their ids
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A cellular compartment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compartment {
    /// Short identifier (for example `c` or `e`)
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Kind of compartment, which determines mass balance participation
    pub kind: CompartmentKind,
}

impl Compartment {
    pub fn new(id: &str, name: &str, kind: CompartmentKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
        }
    }

    /// Whether compounds of this compartment are at quasi steady state
    pub fn is_steady(&self) -> bool {
        self.kind.is_steady()
    }

    /// Whether this is a biomass compartment
    pub fn is_biomass(&self) -> bool {
        self.kind == CompartmentKind::Biomass
    }
}

impl Display for Compartment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.name)
    }
}

/// Kinds of compartments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompartmentKind {
    /// Intracellular compartment, compounds are at steady state
    Intracellular,
    /// Extracellular medium
    Extracellular,
    /// Pseudo-compartment holding the biomass compound
    Biomass,
    /// Pseudo-compartment used to drain compounds out of the network
    Sink,
}

impl CompartmentKind {
    pub fn is_steady(&self) -> bool {
        matches!(self, CompartmentKind::Intracellular)
    }
}

/// Lookup service providing compartment definitions
///
/// Networks never query an external database directly, the resolver is passed
/// to the code that creates compartments.
pub trait CompartmentResolver {
    /// Resolve a compartment from its id
    fn resolve(&self, id: &str) -> Compartment;
}

/// Resolver knowing the usual compartment suffixes of metabolic reconstructions
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCompartments;

impl CompartmentResolver for StandardCompartments {
    fn resolve(&self, id: &str) -> Compartment {
        let (name, kind) = match id {
            "c" => ("cytosol", CompartmentKind::Intracellular),
            "n" => ("nucleus", CompartmentKind::Intracellular),
            "m" => ("mitochondrion", CompartmentKind::Intracellular),
            "r" => ("endoplasmic reticulum", CompartmentKind::Intracellular),
            "g" => ("golgi apparatus", CompartmentKind::Intracellular),
            "x" => ("peroxisome", CompartmentKind::Intracellular),
            "l" => ("lysosome", CompartmentKind::Intracellular),
            "v" => ("vacuole", CompartmentKind::Intracellular),
            "p" => ("periplasm", CompartmentKind::Intracellular),
            "h" => ("chloroplast", CompartmentKind::Intracellular),
            "e" => ("extracellular space", CompartmentKind::Extracellular),
            "b" => ("biomass", CompartmentKind::Biomass),
            "s" => ("sink", CompartmentKind::Sink),
            _ => ("", CompartmentKind::Intracellular),
        };
        let name = if name.is_empty() { id } else { name };
        Compartment::new(id, name, kind)
    }
}
