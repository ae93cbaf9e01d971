use thiserror::Error;

/// Transport-level errors shared by the gateway and client crates.
///
/// Deliberately narrower than a direct venue `SocketError` (which also
/// covers WebSocket/URL-parsing concerns specific to a live venue
/// connection): here the only wire is the internal
/// [`vantage_integration::channel`] transport, or a future HTTP/2 transport,
/// so only connectivity, (de)serialisation and subscription failures are
/// represented.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport sink closed")]
    Sink,

    #[error("failed to deserialise payload: {error}, payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("failed to serialise payload: {0}")]
    Serialise(serde_json::Error),

    #[error("failed to subscribe: {0}")]
    Subscribe(String),

    #[error("transport terminated: {0}")]
    Terminated(String),

    #[error("unsupported: {entity} does not support {item}")]
    Unsupported { entity: String, item: String },
}
