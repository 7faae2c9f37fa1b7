pub mod event_parser;
pub mod segmenter;
pub mod tokens;

pub use event_parser::{check_positional_alignment, EventParser, ParseResult};
pub use segmenter::{segment, Block};
pub use tokens::{Shape, TimeLayout, Token};
