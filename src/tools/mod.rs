pub mod search;

pub use search::{format_results, HttpWebSearch, SearchResult, SearchSettings, WebSearch};
