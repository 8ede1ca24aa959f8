mod document;
mod token;

pub use document::{ByteRange, ElementId, XmlAttribute, XmlDocument, XmlElement, XmlText};
pub use token::{tokenize, Token};
