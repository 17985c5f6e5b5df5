pub mod cli;
pub mod core;
pub mod models;
pub mod preview;
pub mod theme;
pub mod utils;

// Re-export commonly used types and traits
pub use crate::core::{InMemoryRepository, ListingEngine, ListingError, ListingResult, PostRepository};
pub use crate::models::{ListingConfig, ListingPage, Post, RequestState, Term};
pub use crate::theme::ListingRenderer;
