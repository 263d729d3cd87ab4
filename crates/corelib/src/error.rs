//! Error types for the core library.

use std::fmt;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Step of channel creation at which a fatal error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Constructing or initializing the transport module.
    Transport,
    /// Constructing or initializing a configured protocol module.
    Protocol,
    /// Assembling the relay module.
    Relay,
    /// Obtaining a bridge channel for a remote site.
    Bridge,
    /// Installing the fork module.
    Fork,
    /// Materializing the channel itself.
    Channel,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transport => "transport",
            Stage::Protocol => "protocol",
            Stage::Relay => "relay",
            Stage::Bridge => "bridge",
            Stage::Fork => "fork",
            Stage::Channel => "channel",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while configuring or assembling a stack.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid stack configuration
    #[error("invalid configuration: {0}")]
    Config(String),
    /// No module is registered under this protocol name
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
    /// Socket binding lookup failed
    #[error("unknown socket binding: {0}")]
    UnknownSocketBinding(String),
    /// The socket binding resolves no multicast address
    #[error("no multicast address configured for socket binding {0}")]
    NoMulticast(String),
    /// The module does not declare the property or field
    #[error("protocol {protocol} has no property {property}")]
    UnknownProperty { protocol: String, property: String },
    /// The module declares the property but rejects the value
    #[error("invalid value {value:?} for property {property} of protocol {protocol}")]
    InvalidProperty {
        protocol: String,
        property: String,
        value: String,
    },
    /// Module initialization failed
    #[error("protocol {protocol} failed to initialize: {reason}")]
    Init { protocol: String, reason: String },
    /// The remote-site channel provider failed
    #[error("no channel available for site {site}: {reason}")]
    SiteChannel { site: String, reason: String },
    /// An executor refused a task
    #[error("task rejected: {0}")]
    Rejected(String),
    /// Channel creation aborted at the given stage
    #[error("channel creation failed at {stage} stage: {source}")]
    Creation {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attributes this error to a creation stage.
    ///
    /// An error that already carries a stage keeps it, so the innermost
    /// failing step is what the caller sees.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            Error::Creation { .. } => self,
            other => Error::Creation {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The creation stage this error was attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Creation { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_stage_wins() {
        let err = Error::Init {
            protocol: "FORK".into(),
            reason: "boom".into(),
        }
        .at(Stage::Fork)
        .at(Stage::Channel);

        assert_eq!(err.stage(), Some(Stage::Fork));
        assert!(err.to_string().starts_with("channel creation failed at fork stage"));
    }

    #[test]
    fn test_unstaged_error() {
        assert_eq!(Error::Config("x".into()).stage(), None);
    }
}
