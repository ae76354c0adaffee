pub mod enricher;
pub mod incremental;
pub mod message;
pub mod parser;
pub mod pricing;
pub mod schemas;
pub mod session;

pub use enricher::enrich_session;
pub use incremental::{apply_batch, IncrementalContext};
pub use message::{ParsedMessage, ToolResultItem};
pub use parser::parse_line;
pub use session::EnrichedSession;
