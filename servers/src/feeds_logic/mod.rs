pub mod config;
pub mod downstream;
pub mod probe;
pub mod startup;
