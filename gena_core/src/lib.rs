//! Core rust implementation of GENA, genome scale flux analysis of metabolic networks
//! constrained by experimental measures.
//!
//! A [`twin::Twin`] pairs a [`network::network::Network`] with a [`context::Context`]
//! of measures. The [`analysis::runner::SimulationRunner`] assembles one optimization
//! problem per simulation of the context, solves it, and merges the fluxes into an
//! [`analysis::result::FbaResult`].

pub mod analysis;
pub mod configuration;
pub mod context;
pub mod io;
pub mod network;
pub mod optimize;
pub mod twin;
mod utils;
