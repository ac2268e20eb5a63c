mod error;
mod extractor;
mod language;
mod source_location;

pub use error::{ExtractError, Result};
pub use extractor::{extract_from_file, extract_from_source, EmbeddedDocument, ExtractConfig};
pub use language::Language;
pub use source_location::{Position, Range};
