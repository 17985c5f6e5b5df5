pub mod error;
pub mod excerpt;
pub mod filter;
pub mod listing;
pub mod pagination;
pub mod repository;
pub mod sanitize;
pub mod server;

pub use error::{ListingError, ListingResult};
pub use excerpt::extract_excerpt;
pub use filter::resolve;
pub use listing::{ListingEngine, TermNames};
pub use pagination::{pagination_model, pagination_range};
pub use repository::{InMemoryRepository, PostRepository, SiteData};
pub use sanitize::sanitize_id_list;
pub use server::Server;
