use flicker_core::ProviderError;
use thiserror::Error;

/// Why a dispatch produced no value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The interrupt flag was raised or a newer attempt superseded this one.
    #[error("Cancelled")]
    Cancelled,
    /// Every provider of the capability declined.
    #[error("No plugin found for the provided input")]
    NoProvider,
    /// `open_item` was called without a successful `open` in the session.
    #[error("no active provider: open must succeed before open_item")]
    NoActiveProvider,
    /// A provider committed to the request and failed it.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl DispatchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Why a descriptor did not make it into the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("provider {name} is disabled in configuration")]
    Disabled { name: String },
    #[error("a provider named {name} is already loaded")]
    DuplicateName { name: String },
    #[error("failed to construct provider {name}: {source}")]
    Construct { name: String, source: ProviderError },
}

impl LoadError {
    pub fn provider_name(&self) -> &str {
        match self {
            LoadError::Disabled { name }
            | LoadError::DuplicateName { name }
            | LoadError::Construct { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_surface_verbatim() {
        let err = DispatchError::from(ProviderError::other("bad url"));
        assert_eq!(err.to_string(), "bad url");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn cancellation_keeps_legacy_text() {
        assert_eq!(DispatchError::Cancelled.to_string(), "Cancelled");
        assert!(DispatchError::Cancelled.is_cancelled());
    }
}
