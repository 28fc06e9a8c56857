//! Error taxonomy for the boundary layer
//!
//! Every failure is surfaced synchronously to the immediate caller. Nothing
//! here is retried or degraded; partially built argument buffers and cells
//! still release correctly because release is tied to `Drop`.

use crate::dispatch::Phase;
use crate::host::ObjectKind;
use crate::marshal::Coercion;

/// Boundary-layer result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A null handle was produced where a non-null one is required.
    #[error("invalid handle while {context}{}", reason_suffix(.reason))]
    InvalidHandle {
        context: String,
        reason: Option<String>,
    },

    #[error("couldn't resolve `{name}`{}", reason_suffix(.reason))]
    SymbolNotFound {
        name: String,
        reason: Option<String>,
    },

    #[error("`{operation}`: argument `{argument}` has length {found}, expected {expected}")]
    ArgumentShapeMismatch {
        operation: &'static str,
        argument: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("call to `{name}` failed{}", reason_suffix(.reason))]
    CallFailed {
        name: String,
        reason: Option<String>,
    },

    #[error("a runtime session is already active")]
    SessionAlreadyActive,

    #[error("runtime session is not initialized")]
    SessionNotInitialized,

    /// Dispatcher operation attempted from the wrong phase.
    #[error("cannot {operation} a call in phase {phase:?}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },

    #[error("keyword `{key}` = {value:?} cannot be read as {expected:?}")]
    KeywordCoercion {
        key: String,
        value: String,
        expected: Coercion,
    },

    #[error("integer {value} does not fit the runtime's integer type")]
    IntegerOverflow { value: String },

    /// `reason` carries the runtime error raised by a failed query, if any.
    #[error("expected a runtime {expected}, found {found:?}{}", reason_suffix(.reason))]
    TypeMismatch {
        expected: &'static str,
        found: ObjectKind,
        reason: Option<String>,
    },

    #[error("error loading module `{module}`{}", reason_suffix(.reason))]
    ModuleImport {
        module: String,
        reason: Option<String>,
    },

    #[error("runtime initialization failed: {0}")]
    HostInit(String),
}

impl Error {
    pub fn invalid_handle(context: impl Into<String>, reason: Option<String>) -> Self {
        Self::InvalidHandle {
            context: context.into(),
            reason,
        }
    }

    /// True for the lifecycle misuse errors (`SessionAlreadyActive` / `SessionNotInitialized`)
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::SessionAlreadyActive | Self::SessionNotInitialized)
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_failed_names_callable() {
        let err = Error::CallFailed {
            name: "savefig".to_string(),
            reason: Some("OSError: disk full".to_string()),
        };
        assert_eq!(err.to_string(), "call to `savefig` failed: OSError: disk full");
    }

    #[test]
    fn test_symbol_not_found_without_reason() {
        let err = Error::SymbolNotFound {
            name: "nope".to_string(),
            reason: None,
        };
        assert_eq!(err.to_string(), "couldn't resolve `nope`");
    }

    #[test]
    fn test_lifecycle_classification() {
        assert!(Error::SessionAlreadyActive.is_lifecycle());
        assert!(Error::SessionNotInitialized.is_lifecycle());
        assert!(!Error::HostInit("x".into()).is_lifecycle());
    }
}
