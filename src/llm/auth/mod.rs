//! Credentials for the Vertex AI model service

pub mod adc;

pub use adc::AuthenticationManager;
