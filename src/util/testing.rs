//! Shared test setup: one global tracing subscriber and small tree helpers.

use std::env;
use std::path::PathBuf;
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{Document, DocumentBuilder, DomainResult, TreeDescription};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // RUST_LOG wins; otherwise debug for this crate only
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("declutter=debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Directory holding the tree and script fixtures.
pub fn resources_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/resources")
}

/// Build a document from TOML tree text.
pub fn document_from_toml(content: &str) -> DomainResult<Document> {
    DocumentBuilder::new().build(&TreeDescription::from_toml(content)?)
}

/// Build a document from a fixture under [`resources_dir`].
pub fn fixture_document(name: &str) -> Document {
    let path = resources_dir().join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()));
    document_from_toml(&content).unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()))
}
