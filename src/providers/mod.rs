pub mod envelope;
pub mod rest;

pub use rest::RestBackend;
