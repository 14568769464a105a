//! This module provides the compound struct representing a metabolite of the network

use std::hash::Hash;

use derive_builder::Builder;

/// ChEBI ids of compounds considered cofactors
///
/// Rows of these compounds can be left out of the mass balance.
pub const COFACTOR_CHEBI_IDS: &[&str] = &[
    "CHEBI:15377",  // water
    "CHEBI:15378",  // proton
    "CHEBI:30616",  // ATP(4-)
    "CHEBI:456216", // ADP(3-)
    "CHEBI:456215", // AMP(2-)
    "CHEBI:57540",  // NAD(1-)
    "CHEBI:57945",  // NADH(2-)
    "CHEBI:58349",  // NADP(3-)
    "CHEBI:57783",  // NADPH(4-)
    "CHEBI:43474",  // hydrogenphosphate
    "CHEBI:33019",  // diphosphate(3-)
    "CHEBI:57287",  // coenzyme A(4-)
    "CHEBI:16526",  // carbon dioxide
    "CHEBI:15379",  // dioxygen
    "CHEBI:58307",  // FADH2(2-)
    "CHEBI:57692",  // FAD(3-)
    "CHEBI:37565",  // GTP(4-)
    "CHEBI:58189",  // GDP(3-)
    "CHEBI:28938",  // ammonium
];

/// Represents a compound
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Compound {
    /// Used to identify the compound (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the compound
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Id of the compartment the compound is in
    #[builder(setter(into))]
    pub compartment: String,
    /// ChEBI identifier
    #[builder(default = "None")]
    pub chebi_id: Option<String>,
    /// KEGG identifier
    #[builder(default = "None")]
    pub kegg_id: Option<String>,
    /// Electrical charge of the compound
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the compound
    #[builder(default = "None")]
    pub formula: Option<String>,
}

impl Compound {
    /// Whether the compound is in the cofactor list
    pub fn is_cofactor(&self) -> bool {
        match &self.chebi_id {
            Some(chebi) => COFACTOR_CHEBI_IDS.contains(&chebi.as_str()),
            None => false,
        }
    }
}

impl Hash for Compound {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.compartment.hash(state);
    }
}
