//! Tracing initialization for the CLI.
//!
//! `DEEPCTX_LOG` takes an `EnvFilter` directive string
//! (e.g. `DEEPCTX_LOG=deepctx=debug`). Without it the level follows
//! the global flags: `--verbose` → debug, `--quiet` → errors only.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::AppContext;

static INIT: Once = Once::new();

/// Environment variable holding filter directives
pub const LOG_ENV: &str = "DEEPCTX_LOG";

/// Default directive for the given global flags
pub fn default_directive(ctx: &AppContext) -> &'static str
{
    if ctx.verbose
    {
        "deepctx=debug,dctx=debug"
    }
    else if ctx.quiet
    {
        "deepctx=error,dctx=error"
    }
    else
    {
        "deepctx=info,dctx=info"
    }
}

/// Install the global subscriber (stderr, compact). Idempotent.
pub fn init_tracing(ctx: &AppContext)
{
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(ctx)));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(!ctx.no_color)
                    .compact(),
            )
            .with(filter)
            .init();
    });
}
