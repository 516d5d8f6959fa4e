//! Output rendering (CSV stream, provenance comments)

pub mod comments;
pub mod csv_writer;

pub use comments::Provenance;
pub use csv_writer::{part_path, TweetWriter};
