use rdkafka::error::KafkaError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure reported by the Kafka client.
    #[error("kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("failed to decode {format} payload: {reason}")]
    Decode { format: &'static str, reason: String },

    #[error("failed to encode {format} payload: {reason}")]
    Encode { format: &'static str, reason: String },

    /// A shared structure was poisoned by a panicking writer. Joins served
    /// after this point could observe stale state, so this is fatal.
    #[error("'{resource}' lock poisoned, refusing to continue")]
    Poisoned { resource: String },

    #[error("'{name}' is closed")]
    Closed { name: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn decode(format: &'static str, reason: impl ToString) -> Self {
        Error::Decode {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(format: &'static str, reason: impl ToString) -> Self {
        Error::Encode {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn poisoned(resource: &str) -> Self {
        Error::Poisoned {
            resource: resource.to_string(),
        }
    }

    /// Fatal errors stop a pipeline; everything else is a collaborator failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Poisoned { .. })
    }
}
