//! Log output for the command-line front end.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a stderr `tracing` subscriber.
///
/// `RUST_LOG` overrides the default filter of `warn`. `trace_vm` raises the
/// interpreter to per-opcode tracing.
pub fn init_logging(trace_vm: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if trace_vm {
        if let Ok(directive) = "picklejar_machine=trace".parse() {
            filter = filter.add_directive(directive);
        }
    }

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
