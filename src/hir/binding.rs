//! Resolution results.
//!
//! Every cross-reference in the semantic model resolves to a [`Binding`]:
//! the element itself, an [`Ambiguous`] composite when several elements share
//! the name, or an [`Unresolved`] placeholder carrying the attempted name and
//! its errors. All three answer [`Element::name`] and
//! [`Element::location`], so traversal code never needs a null check, only
//! a match on the variant.

use std::rc::Rc;
use std::sync::Arc;

use super::diagnostics::{EdmError, ErrorKind};
use crate::base::Location;

/// The capability surface shared by every named semantic element.
pub trait Element {
    fn name(&self) -> &str;
    fn location(&self) -> &Location;
}

impl<T: Element + ?Sized> Element for Rc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn location(&self) -> &Location {
        (**self).location()
    }
}

// ============================================================================
// UNRESOLVED
// ============================================================================

/// What kind of element a placeholder stands in for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnresolvedKind {
    Type,
    EntityType,
    ComplexType,
    PrimitiveType,
    Term,
    EntityContainer,
    EntitySet,
    Function,
    FunctionImport,
    Parameter,
    Property,
    Association,
    AssociationEnd,
    /// A missing end of an association declared with fewer than two ends.
    BadAssociationEnd,
    /// An association-set end whose role could not be inferred.
    NonComputableAssociationEnd,
    LabeledElement,
    CyclicEntityContainer,
    CyclicEntityType,
    CyclicComplexType,
    /// An annotation target path with an unsupported shape.
    ImpossibleTarget,
}

impl UnresolvedKind {
    fn error_kind(self, name: Arc<str>) -> ErrorKind {
        match self {
            UnresolvedKind::Type => ErrorKind::UnresolvedType(name),
            UnresolvedKind::EntityType => ErrorKind::UnresolvedEntityType(name),
            UnresolvedKind::ComplexType => ErrorKind::UnresolvedComplexType(name),
            UnresolvedKind::PrimitiveType => ErrorKind::UnresolvedPrimitiveType(name),
            UnresolvedKind::Term => ErrorKind::UnresolvedTerm(name),
            UnresolvedKind::EntityContainer => ErrorKind::UnresolvedEntityContainer(name),
            UnresolvedKind::EntitySet => ErrorKind::UnresolvedEntitySet(name),
            UnresolvedKind::Function => ErrorKind::UnresolvedFunction(name),
            UnresolvedKind::FunctionImport => ErrorKind::UnresolvedFunctionImport(name),
            UnresolvedKind::Parameter => ErrorKind::UnresolvedParameter(name),
            UnresolvedKind::Property => ErrorKind::UnresolvedProperty(name),
            UnresolvedKind::Association => ErrorKind::UnresolvedAssociation(name),
            UnresolvedKind::AssociationEnd => ErrorKind::UnresolvedAssociationEnd(name),
            UnresolvedKind::BadAssociationEnd => ErrorKind::InvalidAssociation(name),
            UnresolvedKind::NonComputableAssociationEnd => {
                ErrorKind::BadNonComputableAssociationEnd(name)
            }
            UnresolvedKind::LabeledElement => ErrorKind::UnresolvedLabeledElement(name),
            UnresolvedKind::CyclicEntityContainer => ErrorKind::CyclicEntityContainer(name),
            UnresolvedKind::CyclicEntityType => ErrorKind::CyclicEntity(name),
            UnresolvedKind::CyclicComplexType => ErrorKind::CyclicComplex(name),
            UnresolvedKind::ImpossibleTarget => ErrorKind::ImpossibleAnnotationsTarget(name),
        }
    }
}

/// A stand-in for an element whose name failed to resolve.
///
/// Always carries at least one error.
#[derive(Clone, Debug)]
pub struct Unresolved {
    kind: UnresolvedKind,
    name: Arc<str>,
    location: Location,
    errors: Rc<[EdmError]>,
    parent: Option<Rc<Unresolved>>,
}

impl Unresolved {
    /// A placeholder whose single error is derived from `kind`.
    pub fn new(kind: UnresolvedKind, name: impl Into<Arc<str>>, location: Location) -> Self {
        let name = name.into();
        let error = EdmError::new(location.clone(), kind.error_kind(name.clone()));
        tracing::debug!("[RESOLVE] {:?} '{}' unresolved at {}", kind, name, location);
        Self {
            kind,
            name,
            location,
            errors: Rc::from(vec![error]),
            parent: None,
        }
    }

    /// A placeholder with an explicit error, for malformed (rather than
    /// missing) elements.
    pub fn with_error(
        kind: UnresolvedKind,
        name: impl Into<Arc<str>>,
        location: Location,
        error: ErrorKind,
    ) -> Self {
        let error = EdmError::new(location.clone(), error);
        Self {
            kind,
            name: name.into(),
            errors: Rc::from(vec![error]),
            location,
            parent: None,
        }
    }

    /// Record the (also unresolved) element this one was looked up in.
    pub fn within(mut self, parent: Unresolved) -> Self {
        self.parent = Some(Rc::new(parent));
        self
    }

    pub fn kind(&self) -> UnresolvedKind {
        self.kind
    }

    pub fn errors(&self) -> &[EdmError] {
        &self.errors
    }

    pub fn parent(&self) -> Option<&Unresolved> {
        self.parent.as_deref()
    }
}

impl Element for Unresolved {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &Location {
        &self.location
    }
}

// ============================================================================
// AMBIGUOUS
// ============================================================================

/// Two or more elements registered under one name.
///
/// The first-registered candidate is the composite's identity; every later
/// candidate is a duplicate.
#[derive(Clone, Debug)]
pub struct Ambiguous<T> {
    name: Arc<str>,
    candidates: Rc<[T]>,
}

impl<T> Ambiguous<T> {
    pub fn candidates(&self) -> &[T] {
        &self.candidates
    }

    /// The first-registered candidate.
    pub fn first(&self) -> &T {
        &self.candidates[0]
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Element> Ambiguous<T> {
    /// One `AlreadyDefined` error per candidate after the first, at that
    /// candidate's own location.
    pub fn duplicate_errors(&self) -> Vec<EdmError> {
        self.candidates
            .iter()
            .skip(1)
            .map(|candidate| {
                EdmError::new(
                    candidate.location().clone(),
                    ErrorKind::AlreadyDefined(self.name.clone()),
                )
            })
            .collect()
    }
}

// ============================================================================
// BINDING
// ============================================================================

/// The result of resolving a name.
#[derive(Clone, Debug)]
pub enum Binding<T> {
    Resolved(T),
    Ambiguous(Ambiguous<T>),
    Unresolved(Unresolved),
}

impl<T> Binding<T> {
    /// Merge same-named candidates: none is `None`, one is `Resolved`,
    /// more are `Ambiguous`.
    pub fn from_candidates(name: impl Into<Arc<str>>, mut candidates: Vec<T>) -> Option<Self> {
        match candidates.len() {
            0 => None,
            1 => candidates.pop().map(Binding::Resolved),
            _ => {
                let name = name.into();
                tracing::debug!(
                    "[RESOLVE] '{}' is ambiguous between {} candidates",
                    name,
                    candidates.len()
                );
                Some(Binding::Ambiguous(Ambiguous {
                    name,
                    candidates: Rc::from(candidates),
                }))
            }
        }
    }

    pub fn unresolved(kind: UnresolvedKind, name: impl Into<Arc<str>>, location: Location) -> Self {
        Binding::Unresolved(Unresolved::new(kind, name, location))
    }

    /// The element, if the name resolved to exactly one.
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Binding::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_resolved(self) -> Option<T> {
        match self {
            Binding::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// The element standing for this binding: the resolved element or the
    /// first candidate of an ambiguous composite.
    pub fn identity(&self) -> Option<&T> {
        match self {
            Binding::Resolved(value) => Some(value),
            Binding::Ambiguous(ambiguous) => Some(ambiguous.first()),
            Binding::Unresolved(_) => None,
        }
    }

    pub fn as_unresolved(&self) -> Option<&Unresolved> {
        match self {
            Binding::Unresolved(unresolved) => Some(unresolved),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Binding::Resolved(_))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Binding::Ambiguous(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Binding::Unresolved(_))
    }

    /// Errors attributable to the reference site.
    ///
    /// Ambiguous composites report their duplicates where the names are
    /// registered, not at every use.
    pub fn errors(&self) -> Vec<EdmError> {
        match self {
            Binding::Unresolved(unresolved) => unresolved.errors().to_vec(),
            _ => Vec::new(),
        }
    }
}

impl<T: Clone> Binding<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Binding<U> {
        match self {
            Binding::Resolved(value) => Binding::Resolved(f(value)),
            Binding::Ambiguous(ambiguous) => Binding::Ambiguous(Ambiguous {
                name: ambiguous.name.clone(),
                candidates: ambiguous.candidates.iter().cloned().map(f).collect(),
            }),
            Binding::Unresolved(unresolved) => Binding::Unresolved(unresolved),
        }
    }

    /// Keep only candidates accepted by `f`; if none survive, fall back to
    /// the placeholder built by `fallback`.
    pub fn narrow<U>(
        self,
        mut f: impl FnMut(T) -> Option<U>,
        fallback: impl FnOnce() -> Unresolved,
    ) -> Binding<U> {
        match self {
            Binding::Resolved(value) => match f(value) {
                Some(narrowed) => Binding::Resolved(narrowed),
                None => Binding::Unresolved(fallback()),
            },
            Binding::Ambiguous(ambiguous) => {
                let narrowed: Vec<U> = ambiguous.candidates.iter().cloned().filter_map(f).collect();
                Binding::from_candidates(ambiguous.name.clone(), narrowed)
                    .unwrap_or_else(|| Binding::Unresolved(fallback()))
            }
            Binding::Unresolved(unresolved) => Binding::Unresolved(unresolved),
        }
    }
}

impl<T: Element> Binding<T> {
    pub fn name(&self) -> &str {
        match self {
            Binding::Resolved(value) => value.name(),
            Binding::Ambiguous(ambiguous) => ambiguous.name(),
            Binding::Unresolved(unresolved) => unresolved.name(),
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Binding::Resolved(value) => value.location(),
            Binding::Ambiguous(ambiguous) => ambiguous.first().location(),
            Binding::Unresolved(unresolved) => unresolved.location(),
        }
    }
}
