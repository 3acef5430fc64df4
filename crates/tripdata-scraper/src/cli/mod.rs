//! Subcommand implementations for the `tripdata` binary.

pub mod doctor;
