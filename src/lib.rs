// Rebindable per-player input actions

pub mod core;
pub mod input;
pub mod settings;
