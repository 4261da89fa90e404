pub mod http;

pub use http::{resource_category, HttpFetchTask, PageRecord};
