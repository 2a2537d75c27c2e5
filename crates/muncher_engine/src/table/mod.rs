//! Table extraction: row parsing, name resolution and record assembly.
mod builder;
mod namer;
mod parse;

pub(crate) use builder::CONTENT_CHUNK_ATTR;
pub use builder::{build_table_record, extract_tables, TableMatchObserver, TableSource};
pub use namer::{guess_name_from_siblings, TableNamer};
pub use parse::{parse_table, ParsedTable};
