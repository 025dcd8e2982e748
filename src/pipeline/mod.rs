//! Pipeline stages for batch document OCR.
//!
//! Each submodule implements exactly one step, so each is testable on its own
//! and the two network-facing stages can be swapped for in-process fakes.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ segment ──▶ slices ──▶ recognize ──▶ postprocess
//! (GET)     (lopdf)     (fan-out)   (POST)        (normalize)
//! ```
//!
//! 1. [`fetch`]       — `GET {base_url}{location}` with a fixed retry budget
//! 2. [`segment`]     — split a PDF into page-range slices; runs in
//!    `spawn_blocking` because parsing is CPU-bound
//! 3. [`slices`]      — bounded fan-out over one PDF's slices with ordered
//!    reassembly
//! 4. [`recognize`]   — base64 the unit and call the layout-parsing service
//! 5. [`postprocess`] — deterministic Markdown normalization per document

pub mod fetch;
pub mod postprocess;
pub mod recognize;
pub mod segment;
pub mod slices;
