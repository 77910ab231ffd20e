//! Route Handlers

pub mod alerts;
pub mod machines;
pub mod sessions;
