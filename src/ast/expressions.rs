//! Annotation expressions and vocabulary annotations.

use std::sync::Arc;

use super::TypeRef;
use crate::base::{Location, NodeId};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expression {
    pub id: NodeId,
    pub kind: ExpressionKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExpressionKind {
    Constant(Constant),
    Path(Arc<str>),
    EnumMember(Arc<str>),
    EntitySetReference(Arc<str>),
    FunctionReference(Arc<str>),
    Collection(Vec<Arc<Expression>>),
    Record {
        type_name: Option<Arc<str>>,
        properties: Vec<PropertyValue>,
    },
    Apply {
        function: Arc<str>,
        arguments: Vec<Arc<Expression>>,
    },
    If {
        test: Arc<Expression>,
        if_true: Arc<Expression>,
        if_false: Arc<Expression>,
    },
    IsType {
        operand: Arc<Expression>,
        type_ref: Arc<TypeRef>,
    },
    AssertType {
        operand: Arc<Expression>,
        type_ref: Arc<TypeRef>,
    },
    /// `<LabeledElement Name="...">`
    Labeled {
        label: Arc<str>,
        element: Arc<Expression>,
    },
    /// `<LabeledElementReference Name="..."/>`
    LabeledElementRef(Arc<str>),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Arc<str>),
    String(Arc<str>),
    Guid(Arc<str>),
    DateTime(Arc<str>),
    Binary(Vec<u8>),
}

/// One `<PropertyValue>` of a record or type annotation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyValue {
    pub property: Arc<str>,
    pub value: Arc<Expression>,
    pub location: Location,
}

/// `<ValueAnnotation>` or `<TypeAnnotation>`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VocabularyAnnotation {
    pub id: NodeId,
    pub term: Arc<str>,
    pub qualifier: Option<Arc<str>>,
    pub kind: AnnotationKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnnotationKind {
    Value(Arc<Expression>),
    Type { properties: Vec<PropertyValue> },
}
