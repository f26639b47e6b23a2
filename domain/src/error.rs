//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. Each layer translates the errors of the layer below it, so
/// `web` and `realtime` never depend on `entity_api` directly.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Config,
    Other(String),
}

/// Entity errors that bubble up from `entity_api`, reduced to the subset the
/// `domain` layer distinguishes.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    Invalid,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The readings store failed to answer a query.
    DataSource,
    /// The notification transport to the store failed.
    Network,
    Other(String),
}

impl Error {
    /// True when the error came from the upstream readings store.
    pub fn is_data_source(&self) -> bool {
        self.error_kind == DomainErrorKind::External(ExternalErrorKind::DataSource)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let error_kind = match err.error_kind {
            EntityApiErrorKind::InvalidQueryTerm => {
                DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid))
            }
            EntityApiErrorKind::RecordNotInserted => DomainErrorKind::Internal(
                InternalErrorKind::Entity(EntityErrorKind::Other("RecordNotInserted".to_string())),
            ),
            EntityApiErrorKind::DecodeError | EntityApiErrorKind::SystemError => {
                DomainErrorKind::External(ExternalErrorKind::DataSource)
            }
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

// Errors from the notification listener, which talks to Postgres through sqlx directly.
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_api_error(error_kind: EntityApiErrorKind) -> EntityApiError {
        EntityApiError {
            source: None,
            error_kind,
        }
    }

    #[test]
    fn system_errors_become_data_source_errors() {
        let error: Error = entity_api_error(EntityApiErrorKind::SystemError).into();

        assert!(error.is_data_source());
        assert!(error.source().is_some());
    }

    #[test]
    fn decode_errors_become_data_source_errors() {
        let error: Error = entity_api_error(EntityApiErrorKind::DecodeError).into();

        assert!(error.is_data_source());
    }

    #[test]
    fn invalid_query_terms_stay_internal() {
        let error: Error = entity_api_error(EntityApiErrorKind::InvalidQueryTerm).into();

        assert_eq!(
            error.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid))
        );
        assert!(!error.is_data_source());
    }

    #[test]
    fn sqlx_errors_become_network_errors() {
        let error: Error = sqlx::Error::PoolClosed.into();

        assert_eq!(
            error.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Network)
        );
    }
}
