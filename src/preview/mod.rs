pub mod client;
pub mod query;
pub mod session;

pub use client::{PostFetcher, RestClient};
pub use query::{background_route, preview_query, preview_window, terms_query};
pub use session::{PreviewSession, PreviewState};
