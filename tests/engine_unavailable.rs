//! A missing engine library is a conversion error, not a panic.
//!
//! Runs on every `cargo test`: an explicit library path is checked before any
//! cache lookup or download, so no network is touched. Kept in its own test
//! binary so no other test has bound the process-wide engine first.

mod common;

use common::blank_pdf;
use futures::future::join_all;
use resumind::{engine_init_count, ConvertError, DocumentFile, PdfiumRasterizer, Rasterizer};
use std::sync::Arc;

const MISSING_LIB: &str = "/nonexistent/libpdfium.so";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn missing_library_is_engine_unavailable() {
    let rasterizer = Arc::new(PdfiumRasterizer::with_library(MISSING_LIB));
    let doc = Arc::new(DocumentFile::pdf("cv.pdf", blank_pdf(200, 100)));

    let calls = (0..4).map(|_| {
        let rasterizer = Arc::clone(&rasterizer);
        let doc = Arc::clone(&doc);
        tokio::spawn(async move { rasterizer.rasterize(&doc).await })
    });

    for joined in join_all(calls).await {
        let err = joined.expect("task must not panic").expect_err("no engine");
        match err {
            ConvertError::EngineUnavailable(ref reason) => {
                assert!(reason.contains(MISSING_LIB), "reason: {reason}")
            }
            other => panic!("expected EngineUnavailable, got {other:?}"),
        }
    }
    assert_eq!(engine_init_count(), 0);

    // A later call tries again instead of replaying the old failure forever.
    let again = rasterizer.rasterize(&doc).await;
    assert!(matches!(again, Err(ConvertError::EngineUnavailable(_))));
}
