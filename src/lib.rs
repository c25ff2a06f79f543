pub mod config;
pub mod declination;
pub mod drain;
pub mod error;
pub mod event;
pub mod geo;
pub mod normalizer;
pub mod output;
pub mod schema;
pub mod service;
pub mod store;
pub mod trips;
