//! Module providing the Network struct for representing a metabolic network.

pub mod compartment;
pub mod compound;
pub mod network;
pub mod reaction;
pub mod stoichiometry;
