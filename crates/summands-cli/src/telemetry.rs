//! Log output for the command line front end.
//!
//! Events go to stderr so stdout stays free for the `--json` summary. The
//! filter is read from `RUST_LOG` and defaults to `info`; raise it to `debug`
//! for search and sink lifecycle events or `trace` for every drained batch and
//! closed page.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    Ok(())
}
