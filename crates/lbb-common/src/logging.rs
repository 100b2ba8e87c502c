use std::{panic, path::PathBuf, sync::OnceLock};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt::writer::BoxMakeWriter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Process-wide logging options read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// `LBB_LOG_DIR`: daily-rotated log files go there instead of stdout.
    pub dir: Option<PathBuf>,
    /// `LBB_LOG_INCLUDE_BACKTRACE`: also run the default panic hook.
    pub include_backtrace: bool,
}

fn truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self {
            dir: std::env::var_os("LBB_LOG_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            include_backtrace: std::env::var("LBB_LOG_INCLUDE_BACKTRACE")
                .map(|value| truthy(value.trim()))
                .unwrap_or(false),
        }
    }
}

/// Routes panics through `tracing`. Installed once per process.
pub fn install_tracing_panic_hook(app_name: &'static str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let default_hook = panic::take_hook();
        let include_backtrace = LogSettings::from_env().include_backtrace;

        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()));
            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());

            tracing::error!(
                application = app_name,
                thread = thread.name().unwrap_or("unnamed"),
                location = location.as_deref().unwrap_or("unknown"),
                panic_message = %message,
                "panic"
            );

            if include_backtrace {
                default_hook(info);
            }
        }));
    });
}

fn rotating_file_writer(app_name: &'static str, dir: PathBuf) -> Option<BoxMakeWriter> {
    if let Err(err) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %err, dir = %dir.display(), "cannot create LBB_LOG_DIR, logging to stdout");
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(BoxMakeWriter::new(non_blocking))
}

/// Installs the global subscriber. `RUST_LOG` drives filtering (default
/// `info`); `LBB_LOG_DIR` switches output to `<dir>/<app>.log`, rotated daily.
pub fn init_tracing_subscriber(app_name: &'static str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    match LogSettings::from_env()
        .dir
        .and_then(|dir| rotating_file_writer(app_name, dir))
    {
        Some(writer) => {
            let _ = builder.with_writer(writer).try_init();
        }
        None => {
            let _ = builder.try_init();
        }
    }
}
