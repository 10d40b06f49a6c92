//! Diagnostics: Semantic error reporting.
//!
//! Resolution never fails with a Rust error. Every problem found while
//! binding names becomes an [`EdmError`] attached to the placeholder or
//! composite that stands in for the missing element, and is surfaced through
//! [`SemanticModel::errors`](super::SemanticModel::errors).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::base::Location;

// ============================================================================
// ERROR CODES
// ============================================================================

/// Stable classification of a semantic error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    AlreadyDefined,
    InvalidAssociation,
    DuplicateAlias,
    SameRoleReferredInReferentialConstraint,
    InvalidRoleInRelationshipConstraint,
    MismatchNumberOfPropertiesInRelationshipConstraint,
    BadPrincipalPropertiesInReferentialConstraint,
    InvalidPropertyInRelationshipConstraint,
    InvalidName,
    ImpossibleAnnotationsTarget,
    BadNonComputableAssociationEnd,
    BadUnresolvedType,
    BadUnresolvedEntityType,
    BadUnresolvedComplexType,
    BadUnresolvedPrimitiveType,
    BadUnresolvedTerm,
    BadUnresolvedEntityContainer,
    BadUnresolvedEntitySet,
    BadUnresolvedFunction,
    BadUnresolvedFunctionImport,
    BadUnresolvedParameter,
    BadUnresolvedProperty,
    BadUnresolvedAssociation,
    BadUnresolvedAssociationEnd,
    BadUnresolvedLabeledElement,
    BadCyclicEntityContainer,
    BadCyclicEntity,
    BadCyclicComplex,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// ERROR KINDS (message text)
// ============================================================================

/// The message shapes of semantic errors. Each maps to one [`ErrorCode`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("an element named '{0}' is already defined")]
    AlreadyDefined(Arc<str>),
    #[error("association '{0}' must declare exactly two ends")]
    InvalidAssociation(Arc<str>),
    #[error("alias '{0}' is declared more than once in this schema")]
    DuplicateAlias(Arc<str>),
    #[error("the principal and dependent roles of a referential constraint both refer to '{0}'")]
    SameRoleReferredInReferentialConstraint(Arc<str>),
    #[error("role '{role}' is not an end of association '{association}'")]
    InvalidRoleInRelationshipConstraint {
        role: Arc<str>,
        association: Arc<str>,
    },
    #[error("referential constraint of '{association}' lists {principal} principal and {dependent} dependent properties for a key of {key}")]
    MismatchNumberOfPropertiesInRelationshipConstraint {
        association: Arc<str>,
        principal: usize,
        dependent: usize,
        key: usize,
    },
    #[error("property '{property}' is not a key property of principal type '{entity_type}'")]
    BadPrincipalPropertiesInReferentialConstraint {
        property: Arc<str>,
        entity_type: Arc<str>,
    },
    #[error("property '{property}' is not declared on dependent type '{entity_type}'")]
    InvalidPropertyInRelationshipConstraint {
        property: Arc<str>,
        entity_type: Arc<str>,
    },
    #[error("end name '{end}' is used more than once in association set '{set}'")]
    DuplicateEndName { end: Arc<str>, set: Arc<str> },
    #[error("'{0}' is not a valid annotation target")]
    ImpossibleAnnotationsTarget(Arc<str>),
    #[error("the association end '{0}' cannot be computed")]
    BadNonComputableAssociationEnd(Arc<str>),
    #[error("the type '{0}' could not be found")]
    UnresolvedType(Arc<str>),
    #[error("the entity type '{0}' could not be found")]
    UnresolvedEntityType(Arc<str>),
    #[error("the complex type '{0}' could not be found")]
    UnresolvedComplexType(Arc<str>),
    #[error("'{0}' is not a primitive type")]
    UnresolvedPrimitiveType(Arc<str>),
    #[error("the term '{0}' could not be found")]
    UnresolvedTerm(Arc<str>),
    #[error("the entity container '{0}' could not be found")]
    UnresolvedEntityContainer(Arc<str>),
    #[error("the entity set '{0}' could not be found")]
    UnresolvedEntitySet(Arc<str>),
    #[error("the function '{0}' could not be found")]
    UnresolvedFunction(Arc<str>),
    #[error("the function import '{0}' could not be found")]
    UnresolvedFunctionImport(Arc<str>),
    #[error("the parameter '{0}' could not be found")]
    UnresolvedParameter(Arc<str>),
    #[error("the property '{0}' could not be found")]
    UnresolvedProperty(Arc<str>),
    #[error("the association '{0}' could not be found")]
    UnresolvedAssociation(Arc<str>),
    #[error("the association end '{0}' could not be found")]
    UnresolvedAssociationEnd(Arc<str>),
    #[error("the labeled element '{0}' could not be found")]
    UnresolvedLabeledElement(Arc<str>),
    #[error("entity container '{0}' is part of a cycle of extends")]
    CyclicEntityContainer(Arc<str>),
    #[error("entity type '{0}' is part of a cycle of base types")]
    CyclicEntity(Arc<str>),
    #[error("complex type '{0}' is part of a cycle of base types")]
    CyclicComplex(Arc<str>),
}

impl ErrorKind {
    pub fn code(&self) -> ErrorCode {
        match self {
            ErrorKind::AlreadyDefined(_) => ErrorCode::AlreadyDefined,
            ErrorKind::InvalidAssociation(_) => ErrorCode::InvalidAssociation,
            ErrorKind::DuplicateAlias(_) => ErrorCode::DuplicateAlias,
            ErrorKind::SameRoleReferredInReferentialConstraint(_) => {
                ErrorCode::SameRoleReferredInReferentialConstraint
            }
            ErrorKind::InvalidRoleInRelationshipConstraint { .. } => {
                ErrorCode::InvalidRoleInRelationshipConstraint
            }
            ErrorKind::MismatchNumberOfPropertiesInRelationshipConstraint { .. } => {
                ErrorCode::MismatchNumberOfPropertiesInRelationshipConstraint
            }
            ErrorKind::BadPrincipalPropertiesInReferentialConstraint { .. } => {
                ErrorCode::BadPrincipalPropertiesInReferentialConstraint
            }
            ErrorKind::InvalidPropertyInRelationshipConstraint { .. } => {
                ErrorCode::InvalidPropertyInRelationshipConstraint
            }
            ErrorKind::DuplicateEndName { .. } => ErrorCode::InvalidName,
            ErrorKind::ImpossibleAnnotationsTarget(_) => ErrorCode::ImpossibleAnnotationsTarget,
            ErrorKind::BadNonComputableAssociationEnd(_) => {
                ErrorCode::BadNonComputableAssociationEnd
            }
            ErrorKind::UnresolvedType(_) => ErrorCode::BadUnresolvedType,
            ErrorKind::UnresolvedEntityType(_) => ErrorCode::BadUnresolvedEntityType,
            ErrorKind::UnresolvedComplexType(_) => ErrorCode::BadUnresolvedComplexType,
            ErrorKind::UnresolvedPrimitiveType(_) => ErrorCode::BadUnresolvedPrimitiveType,
            ErrorKind::UnresolvedTerm(_) => ErrorCode::BadUnresolvedTerm,
            ErrorKind::UnresolvedEntityContainer(_) => ErrorCode::BadUnresolvedEntityContainer,
            ErrorKind::UnresolvedEntitySet(_) => ErrorCode::BadUnresolvedEntitySet,
            ErrorKind::UnresolvedFunction(_) => ErrorCode::BadUnresolvedFunction,
            ErrorKind::UnresolvedFunctionImport(_) => ErrorCode::BadUnresolvedFunctionImport,
            ErrorKind::UnresolvedParameter(_) => ErrorCode::BadUnresolvedParameter,
            ErrorKind::UnresolvedProperty(_) => ErrorCode::BadUnresolvedProperty,
            ErrorKind::UnresolvedAssociation(_) => ErrorCode::BadUnresolvedAssociation,
            ErrorKind::UnresolvedAssociationEnd(_) => ErrorCode::BadUnresolvedAssociationEnd,
            ErrorKind::UnresolvedLabeledElement(_) => ErrorCode::BadUnresolvedLabeledElement,
            ErrorKind::CyclicEntityContainer(_) => ErrorCode::BadCyclicEntityContainer,
            ErrorKind::CyclicEntity(_) => ErrorCode::BadCyclicEntity,
            ErrorKind::CyclicComplex(_) => ErrorCode::BadCyclicComplex,
        }
    }
}

// ============================================================================
// EDM ERROR
// ============================================================================

/// One semantic error: where, what kind, and a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdmError {
    pub location: Location,
    pub code: ErrorCode,
    pub message: Arc<str>,
}

impl EdmError {
    pub fn new(location: Location, kind: ErrorKind) -> Self {
        Self {
            location,
            code: kind.code(),
            message: Arc::from(kind.to_string()),
        }
    }
}

impl fmt::Display for EdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.code, self.message)
    }
}

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// A reportable diagnostic derived from an [`EdmError`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub location: Location,
    pub code: ErrorCode,
    pub message: Arc<str>,
}

impl From<EdmError> for Diagnostic {
    fn from(error: EdmError) -> Self {
        Self {
            location: error.location,
            code: error.code,
            message: error.message,
        }
    }
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics for reporting.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add every error from an iterator.
    pub fn extend_errors(&mut self, errors: impl IntoIterator<Item = EdmError>) {
        self.diagnostics
            .extend(errors.into_iter().map(Diagnostic::from));
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get diagnostics for a specific source document.
    pub fn diagnostics_for_source(&self, source: &str) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| &*d.location.source == source)
            .collect()
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
