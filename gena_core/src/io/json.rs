//! Module providing JSON IO for GENA networks
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::network::compartment::{CompartmentResolver, StandardCompartments};
use crate::network::compound::{Compound, CompoundBuilder, CompoundBuilderError};
use crate::network::network::{Network, NetworkError};
use crate::network::reaction::{FluxSimulation, Reaction, ReactionBuilder, ReactionBuilderError};

// region JSON Network
/// Represents a JSON serialized network, used for reading and writing networks in json format
#[derive(Serialize, Deserialize, Debug, Default)]
struct JsonNetwork {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    compartments: IndexMap<String, String>,
    #[serde(default)]
    metabolites: Vec<JsonCompound>,
    #[serde(default)]
    reactions: Vec<JsonReaction>,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonCompound {
    id: String,
    #[serde(default)]
    name: Option<String>,
    compartment: String,
    #[serde(default)]
    chebi_id: Option<String>,
    #[serde(default)]
    kegg_id: Option<String>,
    #[serde(default)]
    charge: Option<i32>,
    #[serde(default)]
    formula: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonReaction {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    metabolites: IndexMap<String, f64>,
    /// Missing bounds take the configured defaults
    #[serde(default)]
    lower_bound: Option<f64>,
    #[serde(default)]
    upper_bound: Option<f64>,
    #[serde(default)]
    ec_numbers: Vec<String>,
    #[serde(default)]
    enzyme: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_biomass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<JsonNotes>,
}

/// Only the simulation annotations of the notes are kept
#[derive(Serialize, Deserialize, Debug, Default)]
struct JsonNotes {
    #[serde(default)]
    simulations: Vec<FluxSimulation>,
}
// endregion JSON Network

// region Conversions
impl TryFrom<JsonCompound> for Compound {
    type Error = JsonError;

    fn try_from(c: JsonCompound) -> Result<Self, Self::Error> {
        Ok(CompoundBuilder::default()
            .id(c.id)
            .name(c.name)
            .compartment(c.compartment)
            .chebi_id(c.chebi_id)
            .kegg_id(c.kegg_id)
            .charge(c.charge.unwrap_or_default())
            .formula(c.formula)
            .build()?)
    }
}

impl TryFrom<JsonReaction> for Reaction {
    type Error = JsonError;

    fn try_from(r: JsonReaction) -> Result<Self, Self::Error> {
        let mut builder = ReactionBuilder::default();
        builder
            .id(r.id)
            .metabolites(r.metabolites)
            .name(r.name)
            .ec_numbers(r.ec_numbers)
            .enzyme(r.enzyme)
            .is_biomass(r.is_biomass)
            .simulations(r.notes.map(|n| n.simulations).unwrap_or_default());
        if let Some(lower_bound) = r.lower_bound {
            builder.lower_bound(lower_bound);
        }
        if let Some(upper_bound) = r.upper_bound {
            builder.upper_bound(upper_bound);
        }
        Ok(builder.build()?)
    }
}

impl From<&Compound> for JsonCompound {
    fn from(c: &Compound) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            compartment: c.compartment.clone(),
            chebi_id: c.chebi_id.clone(),
            kegg_id: c.kegg_id.clone(),
            charge: Some(c.charge),
            formula: c.formula.clone(),
        }
    }
}

impl From<&Reaction> for JsonReaction {
    fn from(r: &Reaction) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            metabolites: r.metabolites.clone(),
            lower_bound: Some(r.lower_bound),
            upper_bound: Some(r.upper_bound),
            ec_numbers: r.ec_numbers.clone(),
            enzyme: r.enzyme.clone(),
            is_biomass: r.is_biomass,
            notes: (!r.simulations.is_empty()).then(|| JsonNotes {
                simulations: r.simulations.clone(),
            }),
        }
    }
}

impl Network {
    /// Read a network, resolving compartment kinds from their usual suffixes
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Network, JsonError> {
        Network::read_json_with(path, &StandardCompartments)
    }

    /// Read a network, resolving compartment kinds through `resolver`
    pub fn read_json_with<P: AsRef<Path>>(
        path: P,
        resolver: &dyn CompartmentResolver,
    ) -> Result<Network, JsonError> {
        let data = fs::read_to_string(path.as_ref())
            .map_err(|err| JsonError::UnableToRead(format!("{:?}", err)))?;
        let network = Network::loads_with(&data, resolver)?;
        debug!(
            component = "io",
            operation = "read_network",
            path = %path.as_ref().display(),
            compounds = network.compounds().len(),
            reactions = network.reactions().len(),
            "Read network"
        );
        Ok(network)
    }

    /// Parse a network from a JSON string
    pub fn loads_with(data: &str, resolver: &dyn CompartmentResolver) -> Result<Network, JsonError> {
        let json_network = serde_json::from_str::<JsonNetwork>(data)
            .map_err(|err| JsonError::UnableToParse(format!("{:?}", err)))?;
        Network::from_json(json_network, resolver)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        fs::write(path, self.dumps()?)?;
        Ok(())
    }

    /// Serialize the network, including the simulation annotations of its reactions
    pub fn dumps(&self) -> Result<String, JsonError> {
        Ok(serde_json::to_string(&self.to_json())?)
    }

    fn from_json(
        json_network: JsonNetwork,
        resolver: &dyn CompartmentResolver,
    ) -> Result<Self, JsonError> {
        let mut network = Network::new_empty();
        network.id = json_network.id;
        network.name = json_network.name;
        // The kind always comes from the resolver, the file only names compartments
        for (id, name) in json_network.compartments {
            let mut compartment = resolver.resolve(&id);
            if !name.is_empty() {
                compartment.name = name;
            }
            network.add_compartment(compartment);
        }
        for compound in json_network.metabolites {
            network.add_compound_resolved(Compound::try_from(compound)?, resolver)?;
        }
        for reaction in json_network.reactions {
            network.add_reaction(Reaction::try_from(reaction)?)?;
        }
        Ok(network)
    }

    fn to_json(&self) -> JsonNetwork {
        JsonNetwork {
            id: self.id.clone(),
            name: self.name.clone(),
            compartments: self
                .compartments()
                .values()
                .map(|c| (c.id.clone(), c.name.clone()))
                .collect(),
            metabolites: self.compounds().values().map(JsonCompound::from).collect(),
            reactions: self.reactions().values().map(JsonReaction::from).collect(),
        }
    }
}

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Unable to build compound: {0}")]
    UnableToBuildCompound(#[from] CompoundBuilderError),
    #[error("Unable to build reaction: {0}")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Serde json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Unable to write to file")]
    UnableToWrite(#[from] std::io::Error),
}

// endregion Conversions

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::compartment::{Compartment, CompartmentKind};

    const NETWORK: &str = r#"{
"id": "toy",
"name": "Toy network",
"compartments": {"c": "cytosol", "e": "extracellular space", "b": ""},
"metabolites": [
    {"id": "glc_e", "name": "D-Glucose", "compartment": "e", "chebi_id": "CHEBI:4167", "charge": 0, "formula": "C6H12O6"},
    {"id": "glc_c", "compartment": "c"},
    {"id": "h2o_c", "compartment": "c", "chebi_id": "CHEBI:15377"},
    {"id": "biomass_b", "compartment": "b"}
],
"reactions": [
    {"id": "GLCt", "name": "Glucose transport", "metabolites": {"glc_e": -1, "glc_c": 1}, "lower_bound": 0, "upper_bound": 10, "ec_numbers": ["7.5.2.-"]},
    {"id": "BIOMASS", "metabolites": {"glc_c": -1, "h2o_c": -1, "biomass_b": 1},
     "notes": {"simulations": [{"simulation": 0, "value": 2.5, "lower_bound": 2.0, "upper_bound": 3.0}], "comment": "ignored"}}
]
}"#;

    #[test]
    fn loads_network() {
        let network = Network::loads_with(NETWORK, &StandardCompartments).unwrap();
        assert_eq!(network.id.clone().unwrap(), "toy");
        assert_eq!(network.compound_ids(), vec!["glc_e", "glc_c", "h2o_c", "biomass_b"]);
        assert_eq!(network.reaction_ids(), vec!["GLCt", "BIOMASS"]);

        // Compartment kinds come from the resolver, empty names are resolved too
        let biomass = network.compartments().get("b").unwrap();
        assert_eq!(biomass.kind, CompartmentKind::Biomass);
        assert_eq!(biomass.name, "biomass");
        assert_eq!(network.compartments().get("c").unwrap().name, "cytosol");

        let glc = network.get_compound("glc_e").unwrap();
        assert_eq!(glc.name.clone().unwrap(), "D-Glucose");
        assert_eq!(glc.formula.clone().unwrap(), "C6H12O6");
        assert!(network.get_compound("h2o_c").unwrap().is_cofactor());

        let transport = network.get_reaction("GLCt").unwrap();
        assert!((transport.lower_bound - 0.).abs() < 1e-25);
        assert!((transport.upper_bound - 10.).abs() < 1e-25);
        assert_eq!(transport.ec_numbers, vec!["7.5.2.-"]);

        // Missing bounds take the defaults
        let biomass = network.get_reaction("BIOMASS").unwrap();
        assert!((biomass.lower_bound + 1000.).abs() < 1e-25);
        assert!((biomass.upper_bound - 1000.).abs() < 1e-25);
        assert_eq!(biomass.simulations.len(), 1);
        assert!((biomass.simulations[0].value - 2.5).abs() < 1e-25);
        assert_eq!(network.biomass_reaction().unwrap().id, "BIOMASS");
    }

    #[test]
    fn flagged_biomass_reaction() {
        let data = r#"{
"metabolites": [{"id": "a_c", "compartment": "c"}],
"reactions": [
    {"id": "R1", "metabolites": {"a_c": 1}},
    {"id": "GROWTH", "metabolites": {"a_c": -1}, "is_biomass": true}
]
}"#;
        let network = Network::loads_with(data, &StandardCompartments).unwrap();
        assert!(!network.get_reaction("R1").unwrap().is_biomass);
        assert_eq!(network.biomass_reaction().unwrap().id, "GROWTH");

        let value: serde_json::Value = serde_json::from_str(&network.dumps().unwrap()).unwrap();
        assert!(value["reactions"][0].get("is_biomass").is_none());
        assert_eq!(value["reactions"][1]["is_biomass"], serde_json::json!(true));
    }

    #[test]
    fn custom_resolver() {
        struct AllSteady;
        impl CompartmentResolver for AllSteady {
            fn resolve(&self, id: &str) -> Compartment {
                Compartment::new(id, id, CompartmentKind::Intracellular)
            }
        }
        let network = Network::loads_with(NETWORK, &AllSteady).unwrap();
        assert!(network.is_steady_compound("glc_e"));
        assert!(network.is_steady_compound("biomass_b"));
    }

    #[test]
    fn unknown_compound() {
        let data = r#"{
"metabolites": [{"id": "a_c", "compartment": "c"}],
"reactions": [{"id": "R1", "metabolites": {"a_c": -1, "b_c": 1}}]
}"#;
        match Network::loads_with(data, &StandardCompartments) {
            Err(JsonError::Network(NetworkError::UnknownCompound { reaction, compound })) => {
                assert_eq!(reaction, "R1");
                assert_eq!(compound, "b_c");
            }
            other => panic!("Unexpected result {:?}", other),
        }
        assert!(matches!(
            Network::loads_with("{\"reactions\": 3}", &StandardCompartments),
            Err(JsonError::UnableToParse(_))
        ));
    }

    #[test]
    fn write_and_read() {
        let network = Network::loads_with(NETWORK, &StandardCompartments).unwrap();
        let path = std::env::temp_dir().join(format!("gena_network_{}.json", std::process::id()));
        network.write_json(&path).unwrap();
        let read = Network::read_json(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(read, network);

        // Reactions without simulations have no notes
        let value: serde_json::Value = serde_json::from_str(&network.dumps().unwrap()).unwrap();
        assert!(value["reactions"][0].get("notes").is_none());
        assert_eq!(
            value["reactions"][1]["notes"]["simulations"][0]["simulation"],
            serde_json::json!(0)
        );
    }
}
