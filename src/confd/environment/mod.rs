//! Turns a resolved `Locations` into the JSON `Environment` the HTTP
//! layer returns.

mod assembler;
mod materialize;

pub use assembler::EnvironmentAssembler;
pub use materialize::materialise;

use serde::Serialize;

/// One named bag of key/value pairs. Property files earlier in the
/// search path order win on key conflicts.
#[derive(Debug, Clone, Serialize)]
pub struct PropertySource {
    pub name: String,
    pub source: serde_json::Map<String, serde_json::Value>,
}

/// Wire shape of `GET /{app}/{profile}[/{label}]`.
#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    pub name: String,
    pub profiles: Vec<String>,
    pub label: String,
    pub version: String,
    #[serde(rename = "propertySources")]
    pub property_sources: Vec<PropertySource>,
    pub state: Option<String>,
}
