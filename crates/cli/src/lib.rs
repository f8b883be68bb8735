//! Command line front end for folder mirroring

pub mod config;
pub mod daemon;
pub mod logging;
