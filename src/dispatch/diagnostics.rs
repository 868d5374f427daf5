//! Where handler faults are reported.

/// Sink for errors recovered at the dispatch boundary.
pub trait Diagnostics: Send + Sync + 'static {
    fn report(&self, err: &anyhow::Error);
}

/// Logs faults with `tracing::error!`; `debug` includes the full chain.
#[derive(Debug, Clone, Default)]
pub struct TracingDiagnostics {
    pub debug: bool,
}

impl TracingDiagnostics {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl Diagnostics for TracingDiagnostics {
    fn report(&self, err: &anyhow::Error) {
        if self.debug {
            tracing::error!(error = ?err, "Handler failed");
        } else {
            tracing::error!(error = %err, "Handler failed");
        }
    }
}
