//! src/logging.rs
//! ============================================================================
//! # Logger: tracing subscriber setup
//!
//! Installs a registry with an optional daily-rolling file layer and a stderr
//! layer. Both use a compact `[SEQ] LEVEL [file:line module] message` format.

use std::{
    fs,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::Context;
use tracing::Metadata;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        self, FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    prelude::*,
};

use crate::config::LogConfig;

pub struct Logger;

impl Logger {
    /// Call **once** near the start of `main`. Keep the returned guard alive
    /// for as long as file logging should keep flushing.
    pub fn init_tracing(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
        let (file_layer, guard) = match &config.log_dir {
            Some(log_dir) => {
                fs::create_dir_all(log_dir)
                    .with_context(|| format!("cannot create log dir {}", log_dir.display()))?;

                // daily rolling file appender → <log_dir>/<prefix>.YYYY-MM-DD
                let file = tracing_appender::rolling::daily(log_dir, &config.file_prefix);
                let (writer, guard) = tracing_appender::non_blocking(file);

                let layer = fmt::layer()
                    .event_format(SeqFileMod)
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(Self::filter(&config.level)?);

                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        let stderr_layer = fmt::layer()
            .event_format(SeqFileMod)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_filter(Self::filter(&config.level)?);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .try_init()
            .context("tracing subscriber already installed")?;

        Ok(guard)
    }

    fn filter(level: &str) -> anyhow::Result<EnvFilter> {
        let directive = level
            .parse()
            .with_context(|| format!("invalid log level directive '{level}'"))?;
        Ok(EnvFilter::from_default_env().add_directive(directive))
    }
}

static SEQ: AtomicUsize = AtomicUsize::new(1);

/// Custom formatter: `[SEQ] LEVEL [file:line mod::path] message`
struct SeqFileMod;

impl<S, N> FormatEvent<S, N> for SeqFileMod
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut w: Writer<'_>,
        ev: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        // monotonically-increasing sequence number
        let seq: usize = SEQ.fetch_add(1, Ordering::Relaxed);

        let meta: &'static Metadata<'static> = ev.metadata();
        write!(
            w,
            "{seq:06} {:5} [{}:{} {}] ",
            meta.level(),
            meta.file().unwrap_or("??"),
            meta.line().unwrap_or(0),
            meta.module_path().unwrap_or("???"),
        )?;

        ctx.field_format().format_fields(w.by_ref(), ev)?;
        writeln!(w)
    }
}
