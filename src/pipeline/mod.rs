//! Building blocks the orchestrator sequences.
//!
//! ```text
//! engine ──▶ render ──▶ encode            reply ◀── llm
//! (once)    (pdfium)   (PNG/base64)      (parse)   (VLM)
//! ```
//!
//! 1. [`engine`]: process-wide, lazily initialised rendering engine
//! 2. [`render`]: rasterise page 1 at a fixed 4× scale; blocking work runs
//!    in `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]: PNG encoding and the base64 image attachment for the VLM
//! 4. [`llm`]   : the vision-model analysis client
//! 5. [`reply`] : normalise the reply shape and parse the evaluation

pub mod encode;
pub mod engine;
pub mod llm;
pub mod render;
pub mod reply;
