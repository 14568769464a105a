//! Module for reading and writing networks
pub mod json;
