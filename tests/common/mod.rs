//! Shared tracing harness for the integration tests.
//!
//! Open a span at the top of each test; the subscriber is installed on first
//! use and every event inside the span carries the test's name:
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn grows_under_contention() {
//!     let _span = common::test_span("grows_under_contention");
//!     // ...
//! }
//! ```
//!
//! Events are appended to `logs/pipeheap.jsonl`, one JSON object per line.
//! `PIPEHEAP_LOG_DIR` moves the file, `PIPEHEAP_LOG_CONSOLE=0` keeps events
//! off stderr, and `RUST_LOG` overrides the default `pipeheap=debug,info`
//! filter. The heap itself only emits events when built with
//! `--features tracing`.
//!
//! ```bash
//! # Every growth of the slot array, with old and new lengths
//! jq 'select(.fields.message == "slot array grown") | .fields' logs/pipeheap.jsonl
//!
//! # Corruption found by a walk or by check_invariants
//! jq 'select(.level == "ERROR") | {test: .span.test, fields}' logs/pipeheap.jsonl
//!
//! # Inserts refused at the size limit
//! jq 'select(.fields.message == "slot array cannot grow further")' logs/pipeheap.jsonl
//! ```

use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Mutex, Once};

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE: &str = "pipeheap.jsonl";
const DEFAULT_FILTER: &str = "pipeheap=debug,info";

static INIT: Once = Once::new();

/// Enter a span tagging every event with `name`, installing the subscriber
/// on first call.
///
/// Hold the guard for the whole test body.
pub fn test_span(name: &'static str) -> tracing::span::EnteredSpan {
    INIT.call_once(install_subscriber);
    tracing::info_span!("heap_test", test = name).entered()
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[expect(clippy::expect_used, reason = "a broken log sink should fail the run")]
fn install_subscriber() {
    let dir: PathBuf = env::var_os("PIPEHEAP_LOG_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from);
    fs::create_dir_all(&dir).expect("create log directory");

    // Append: nextest runs each test in its own process.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
        .expect("open log file");

    let json = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(Mutex::new(file))
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(filter());

    let quiet = env::var("PIPEHEAP_LOG_CONSOLE").is_ok_and(|v| v == "0");
    let console = (!quiet).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_names(true)
            .with_test_writer()
            .with_filter(filter())
    });

    // Another harness may already own the global subscriber.
    let _ = Registry::default().with(json).with(console).try_init();
}
