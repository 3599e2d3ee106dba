pub mod errors;
pub mod models;
pub mod relay;
pub mod service;
pub mod store;
