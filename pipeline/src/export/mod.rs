pub mod writer;

pub use writer::{CsvExporter, ExportOptions};
