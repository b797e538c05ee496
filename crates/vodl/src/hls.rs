pub mod decrypt;
pub mod parser;
pub mod playlist;
pub mod utils;
pub mod variant;

pub use decrypt::{decrypt_segment, derive_iv, SegmentKey};
pub use parser::parse_playlist;
pub use playlist::*;
pub use variant::{select_variant, BitrateCriterion};
