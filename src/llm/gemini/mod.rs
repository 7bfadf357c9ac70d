//! Gemini provider implementation
//!
//! This module provides a client for Google's Gemini models on Vertex AI,
//! implementing the [`LlmProvider`](crate::llm::LlmProvider) trait.

pub mod client;
pub mod mapper;
pub mod sse;
pub mod types;

pub use client::{GeminiClient, GeminiModel};
