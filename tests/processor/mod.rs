//! Processor Integration Test Modules

pub mod config_files;
pub mod custom_collaborators;
pub mod scenarios;
