//! Error kinds per the propagation policy: only document-load failures are
//! hard errors. Everything else (oscillation, timeout, topology issues,
//! a misbehaving component, an interaction on an unknown component)
//! becomes a state transition or a logged/collected diagnostic.

use thiserror::Error;

/// Hard failure while loading a document. No partial document is ever
/// installed when one of these is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("document schema version {found} is incompatible with supported major version {supported}")]
    IncompatibleVersion { found: String, supported: u32 },

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate identifier `{0}` encountered while loading document")]
    DuplicateId(String),

    #[error("`{value}` on {entity} is not a well-formed 8-hex-character identifier")]
    InvalidId { entity: String, value: String },

    #[error("missing required field `{field}` on {entity}")]
    MissingField { entity: String, field: String },

    #[error("unknown component type `{0}`")]
    UnknownComponentType(String),
}

/// Non-fatal topology issue discovered while building VNETs or resolving
/// links. Collected as diagnostics rather than raised; the offending
/// edge is skipped and simulation proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyWarning {
    UnresolvedWireEndpoint { wire_id: String },
    DegenerateWire { wire_id: String },
    UnresolvedLinkName { link_name: String },
    SingleComponentLink { link_name: String },
}

impl std::fmt::Display for TopologyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyWarning::UnresolvedWireEndpoint { wire_id } => {
                write!(f, "wire {wire_id} has an unresolved endpoint and was skipped")
            }
            TopologyWarning::DegenerateWire { wire_id } => {
                write!(f, "wire {wire_id} is degenerate (start == end) and was skipped")
            }
            TopologyWarning::UnresolvedLinkName { link_name } => {
                write!(f, "link '{link_name}' has components but resolved to no VNETs")
            }
            TopologyWarning::SingleComponentLink { link_name } => {
                write!(f, "link '{link_name}' has only one component")
            }
        }
    }
}

/// Why an interaction call (toggle/press/release/...) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("unknown component")]
    UnknownComponent,
    #[error("interaction not supported by this component type")]
    WrongType,
}
