use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    /// A synchronous handler failed; the handler's own error is kept as the source.
    #[error("handler for `{event}` failed: {source}")]
    Handler {
        event: String,
        #[source]
        source: anyhow::Error,
    },
}

impl BusError {
    /// Name of the event whose handler failed
    pub fn event(&self) -> &str {
        match self {
            BusError::Handler { event, .. } => event,
        }
    }

    /// Unwrap into the handler's original error
    pub fn into_source(self) -> anyhow::Error {
        match self {
            BusError::Handler { source, .. } => source,
        }
    }
}
