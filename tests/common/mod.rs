//! Shared test setup: a once-per-process tracing subscriber and the small
//! node limits that make a few hundred items build a deep tree.
//!
//! Environment variables:
//! - `RUST_LOG`: filter directives, e.g. `atree=debug,atree::tree::bulk=trace`
//! - `ATREE_LOG_DIR`: directory for `atree.jsonl` (default `logs/`)
//! - `ATREE_LOG_CONSOLE`: set to `0` to silence console output
//!
//! Structural events only appear with `--features tracing`. The file holds
//! one JSON object per line:
//!
//! ```bash
//! jq 'select(.fields.message == "graft complete")' logs/atree.jsonl
//! ```

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

static INIT: Once = Once::new();

/// Install the subscriber; later calls do nothing.
pub fn init_tracing() {
    INIT.call_once(setup_tracing);
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[expect(clippy::expect_used)]
fn setup_tracing() {
    let dir = env::var("ATREE_LOG_DIR").map_or_else(|_| PathBuf::from("logs"), PathBuf::from);
    std::fs::create_dir_all(&dir).expect("Failed to create log directory");

    // Append: each test binary is its own process.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("atree.jsonl"))
        .expect("Failed to open log file");

    let console_enabled = !env::var("ATREE_LOG_CONSOLE").is_ok_and(|v| v == "0");
    let console_layer = console_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .compact()
            .with_filter(filter())
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .with_filter(filter());

    let _ = Registry::default().with(console_layer).with(file_layer).try_init();
}

/// Leaf and inner limits of 4.
pub fn small_config() -> atree::TreeConfig {
    atree::TreeConfig::default()
        .with_max_leaf_size(4)
        .with_max_inner_size(4)
}
