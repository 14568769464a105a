//! Internal helpers
pub(crate) mod stats;
