pub mod decoder;
pub mod extractor;
pub mod oracle;
pub mod resolver;

pub use oracle::{OracleReply, OracleService};
