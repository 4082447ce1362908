//! Logging through `tracing`.
//!
//! Compiles are logged at `DEBUG`, every render at `TRACE`. `RUST_LOG` overrides
//! the default level, e.g. `RUST_LOG=viewdoo=trace`. Applications with their own
//! subscriber don't need the [`Logger`] at all.
//!
//! ```rust
//! use viewdoo::prelude::*;
//!
//! Logger::init();
//! ```
use crate::config::get_config;
use once_cell::sync::OnceCell;
use tracing_subscriber::{filter::LevelFilter, fmt, util::SubscriberInitExt, EnvFilter};

static INITIALIZED: OnceCell<LevelFilter> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Log to stderr at `INFO`. Only the first call does anything.
    pub fn init() {
        Self::init_with(LevelFilter::INFO);
    }

    /// Log to stderr at `level`, unless `RUST_LOG` says otherwise.
    /// Returns the level the logger was first initialized with.
    pub fn init_with(level: LevelFilter) -> LevelFilter {
        *INITIALIZED.get_or_init(|| {
            let filter = EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy();

            // Fails if the host installed a subscriber already, which is fine.
            let _ = fmt()
                .with_env_filter(filter)
                .with_ansi(get_config().general.tty)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish()
                .try_init();

            get_config().log_info();
            level
        })
    }
}
