pub mod extractor;
pub mod identity;
pub mod loader;
pub mod pipeline;
pub mod report;

pub use extractor::{parse_completion, EntityExtractor};
pub use identity::{derive_identity, DEFAULT_IDENTITY_KEYS, IDENTITY_HEX_LEN};
pub use loader::{text_representation, EntityLoad, GraphLoader, LoadError, SearchHit};
pub use pipeline::ingest_text;
pub use report::LoadReport;
