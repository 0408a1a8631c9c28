use quick_xml::events::attributes::AttrError;

use crate::jenkins::variant::SlotKind;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed xml attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("document has no root element")]
    NoRoot,

    #[error("xml ended inside <{0}>")]
    UnexpectedEof(String),

    /// A second element or non-blank text outside the root element.
    #[error("content outside the root element: {0:?}")]
    TrailingContent(String),

    #[error("character data is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to write xml: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json report: {0}")]
    Json(#[from] serde_json::Error),

    /// The document root is neither `maven2-moduleset` nor `flow-definition`.
    #[error("unknown job document root <{0}>")]
    UnknownRoot(String),

    /// Encode was asked to write a realization nobody registered for the slot.
    #[error("unsupported {slot} variant {type_name}")]
    UnsupportedVariant {
        slot: SlotKind,
        type_name: &'static str,
    },

    #[error("{slot} has no realization to encode (class {class:?})")]
    EmptyVariant {
        slot: SlotKind,
        class: Option<String>,
    },

    #[error("unsupported JobDocument type ({0})")]
    UnsupportedDocument(String),

    #[error("invalid value {value:?} in <{element}>")]
    InvalidValue { element: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
