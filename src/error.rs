use crate::ids::NodeId;
use crate::model::Section;
use thiserror::Error;

/// Reasons a mutation was refused and left the store untouched.
///
/// A rejection is an expected outcome of an unconstrained user gesture, so it travels as a
/// value inside [`crate::store::Outcome::Rejected`] instead of an `Err`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Node '{0}' cannot be linked to itself")]
    SelfLink(NodeId),

    #[error("Node '{from}' and node '{to}' are a container and its descendant")]
    AncestryLink { from: NodeId, to: NodeId },

    #[error("Node '{from}' and node '{to}' live in different sections")]
    CrossSection { from: NodeId, to: NodeId },

    #[error("Entry marker '{0}' cannot be the target of a link")]
    EntryMarkerTarget(NodeId),

    #[error("Entry marker '{marker}' does not start the section of node '{target}'")]
    EntryMarkerMismatch { marker: NodeId, target: NodeId },

    #[error("Node '{0}' has links and cannot leave its section")]
    LinkProtected(NodeId),

    #[error("Node '{0}' is protected and cannot be deleted")]
    ProtectedNode(NodeId),

    #[error("Container '{0}' holds linked members and cannot be deleted")]
    LinkProtectedMembers(NodeId),

    #[error("Node '{node}' cannot be placed inside '{target}', which it contains")]
    CyclicContainment { node: NodeId, target: NodeId },

    #[error("Node '{0}' is not a container")]
    NotAContainer(NodeId),

    #[error("Section '{section}' is not valid for {placement}")]
    SectionKindMismatch {
        section: Section,
        placement: &'static str,
    },

    #[error("Node '{0}' already exists with a different kind")]
    KindChange(NodeId),

    #[error("Entry marker '{0}' can only be repositioned within its section")]
    EntryMarkerMove(NodeId),

    #[error("Entry markers are synthesized and cannot be added directly ('{0}')")]
    EntryMarkerAdd(NodeId),

    #[error("Variable '{0}' is declared more than once")]
    DuplicateVariable(String),

    #[error("Variable '{key}' has an invalid validation pattern: {message}")]
    InvalidPattern { key: String, message: String },

    #[error("No scope is active")]
    NoActiveScope,
}

/// Errors raised while converting a persisted document to and from its text form.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to parse playbook document JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Could not access document file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while decoding an inbound collaboration message.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Malformed collaboration message: {0}")]
    MalformedEnvelope(serde_json::Error),

    #[error("Unknown update kind '{0}'")]
    UnknownKind(String),

    #[error("Payload for '{kind}' is malformed: {source}")]
    MalformedPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors a persistence sink reports back to the save scheduler.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Persistence backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised when loading an engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse engine configuration: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}
