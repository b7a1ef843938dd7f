pub mod generator;
pub mod placeholders;
pub mod synth;

pub use generator::DocumentService;
pub use placeholders::{Field, PlaceholderMapper, ALIASES};
pub use synth::{select_provider, DataProvider, FallbackProvider};
