//! Tracing setup for the `stagewatch` binary.
//!
//! Filter directives come from `STAGEWATCH_LOG`, then `RUST_LOG`, then the
//! level chosen on the command line. `STAGEWATCH_LOG_FORMAT=json` switches
//! to JSON lines without the `--json` flag. Output always goes to stderr,
//! leaving stdout to rendered timelines.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives for Stagewatch diagnostics.
pub const LOG_ENV: &str = "STAGEWATCH_LOG";

/// Output format override (`json` or `text`).
pub const LOG_FORMAT_ENV: &str = "STAGEWATCH_LOG_FORMAT";

/// Pick the filter directive. Blank variables are ignored.
fn filter_directive(stagewatch_log: Option<String>, rust_log: Option<String>, level: Level) -> String {
    [stagewatch_log, rust_log]
        .into_iter()
        .flatten()
        .map(|d| d.trim().to_string())
        .find(|d| !d.is_empty())
        .unwrap_or_else(|| level.as_str().to_ascii_lowercase())
}

/// The `--json` flag wins; otherwise the format variable decides.
fn wants_json(flag: bool, format: Option<&str>) -> bool {
    flag || format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}

/// Initialise the global tracing subscriber. Later calls are ignored.
///
/// An unparsable directive falls back to `level`.
pub fn init_tracing(json: bool, level: Level) {
    let directive = filter_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        level,
    );
    let env_filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);

    if wants_json(json, std::env::var(LOG_FORMAT_ENV).ok().as_deref()) {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}
