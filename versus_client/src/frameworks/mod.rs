// Frameworks layer: configuration, bootstrap, headless host and local persistence.

pub mod config;
pub mod headless;
pub mod profile;
pub mod runtime;
