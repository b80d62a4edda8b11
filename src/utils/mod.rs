pub mod build_info;

use std::sync::Once;

use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

/// Default directive applied when `RUST_LOG` does not mention the engine.
pub const DEFAULT_LOG_DIRECTIVE: &str = "timeledger=info";

/// Installs the global fmt subscriber on stderr so JSON output on stdout stays clean.
/// `directive` is usually the configured `log_filter`; unparseable values fall back
/// to [`DEFAULT_LOG_DIRECTIVE`].
pub fn init_tracing_with(directive: &str) {
    TRACING_INIT.call_once(|| {
        let directive = directive
            .parse::<Directive>()
            .or_else(|_| DEFAULT_LOG_DIRECTIVE.parse::<Directive>());
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = directive {
            filter = filter.add_directive(directive);
        }
        // A subscriber installed elsewhere (tests, embedding apps) wins.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
