//! Optional log output for hosts that do not configure `tracing` themselves.
//!
//! The pipeline emits `debug!`/`trace!` events for update passes, archive
//! spills and queue lifecycle, plus `warn!` when a spill or an update pass
//! fails. Nothing is printed unless a subscriber is installed.

/// Installs a compact stderr subscriber filtered by `RUST_LOG`, falling back
/// to `stripchart=info`. Thread names are included so events from the
/// `stripchart-update` consumer are easy to tell apart.
///
/// Returns `false` without the `telemetry` feature or when the host already
/// installed a global subscriber.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stripchart=info")),
            )
            .with_target(true)
            .with_thread_names(true)
            .compact();

        return builder.try_init().is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
