//! error.rs
//! Error taxonomy surfaced to callers (spec §7). Every variant carries the
//! originating request/decision id when one was available at the failure
//! site, so callers never have to thread ids through separately.

use thiserror::Error;

/// Stable machine-readable kind, paired with the human message carried by
/// the `Error` impl. Callers that need to branch on failure category should
/// match on this rather than parsing the display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    MissingInput,
    InputConflict,
    PluginSecurity,
    PluginLoad,
    RightsViolation,
    FallbackValidation,
    OverrideValidation,
    AuditWrite,
    PrecedentStore,
    RequestCancelled,
}

#[derive(Debug, Error)]
pub enum EjeError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("missing input: {message}")]
    MissingInput { message: String },

    #[error("input conflict: {message}")]
    InputConflict { message: String },

    #[error("plugin security violation: {path} is outside allowed_root {allowed_root}")]
    PluginSecurity { path: String, allowed_root: String },

    #[error("plugin load error: {module} exposes no recognized critic type ({detail})")]
    PluginLoad { module: String, detail: String },

    #[error("rights violation: hard right '{right}' was flagged (request {request_id})")]
    RightsViolation { right: String, request_id: String, evidence: String },

    #[error("fallback strategy failed: {message}; fail-safe result returned instead")]
    FallbackValidation { message: String },

    #[error("override validation failed for request {request_id}: {reason}")]
    OverrideValidation { request_id: String, reason: String },

    #[error("audit write failed for event {event_id}: {message}")]
    AuditWrite { event_id: String, message: String },

    #[error("precedent store error: {message}")]
    PrecedentStore { message: String },

    #[error("request {request_id} was cancelled")]
    RequestCancelled { request_id: String },
}

impl EjeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EjeError::Configuration { .. } => ErrorKind::Configuration,
            EjeError::MissingInput { .. } => ErrorKind::MissingInput,
            EjeError::InputConflict { .. } => ErrorKind::InputConflict,
            EjeError::PluginSecurity { .. } => ErrorKind::PluginSecurity,
            EjeError::PluginLoad { .. } => ErrorKind::PluginLoad,
            EjeError::RightsViolation { .. } => ErrorKind::RightsViolation,
            EjeError::FallbackValidation { .. } => ErrorKind::FallbackValidation,
            EjeError::OverrideValidation { .. } => ErrorKind::OverrideValidation,
            EjeError::AuditWrite { .. } => ErrorKind::AuditWrite,
            EjeError::PrecedentStore { .. } => ErrorKind::PrecedentStore,
            EjeError::RequestCancelled { .. } => ErrorKind::RequestCancelled,
        }
    }
}

pub type EjeResult<T> = std::result::Result<T, EjeError>;
