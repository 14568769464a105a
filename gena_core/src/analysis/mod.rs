//! Flux analyses of twins: options, per simulation tasks, the runner driving them and their results
pub mod fba;
pub mod fva;
pub mod options;
pub mod result;
pub mod runner;
