pub mod query_parser;
pub mod validation;

pub use query_parser::parse_query;
pub use validation::{ip_matches, is_api_key};
