//! One PDFium bind for many concurrent first callers.
//!
//! Lives in its own test binary so the process-wide engine is untouched when
//! the callers start. Skipped unless a pdfium library is available offline.

mod common;

use common::blank_pdf;
use futures::future::join_all;
use resumind::{engine_init_count, DocumentFile, PdfiumRasterizer, Rasterizer};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_calls_initialise_once() {
    if !pdfium_loader::is_available_offline() {
        println!("SKIP: set PDFIUM_LIB_PATH to run engine init tests");
        return;
    }
    assert_eq!(engine_init_count(), 0, "engine already bound in this process");

    let rasterizer = Arc::new(PdfiumRasterizer::new());
    let doc = Arc::new(DocumentFile::pdf("a.pdf", blank_pdf(100, 100)));

    let calls = (0..8).map(|_| {
        let rasterizer = Arc::clone(&rasterizer);
        let doc = Arc::clone(&doc);
        tokio::spawn(async move { rasterizer.rasterize(&doc).await })
    });
    for result in join_all(calls).await {
        result.expect("task").expect("rasterize");
    }

    assert_eq!(engine_init_count(), 1);
}
