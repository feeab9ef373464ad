#![deny(missing_docs)]

//! Core library for the paperslice exam-paper pipeline.

/// Structural analysis of PDFs into paper boundaries.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Google Cloud access tokens.
pub mod auth;
/// Semantic markdown chunking.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Question and answer extraction with a generative model.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// PDF reading, splitting, and markdown rendering.
pub mod pdf;
/// Split, extraction, and ingestion services.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Cloud Storage access.
pub mod storage;
