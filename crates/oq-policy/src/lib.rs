//! C3 — Policy Engine. Decides whether a classified statement may run under
//! a profile's current power settings and mode, and rewrites it when it's
//! allowed to run (spec §4.3).

pub mod config;
pub mod dangerous_functions;
pub mod engine;

pub use config::{ModeConfig, PolicyConfig};
pub use engine::validate;
