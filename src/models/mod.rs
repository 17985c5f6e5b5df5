pub mod attrs;
pub mod config;
pub mod request;
pub mod rest;
pub mod types;

pub use attrs::{DisplayOptions, ImagePosition, ListingConfig, ModuleAttrs, ReadMoreStyle};
pub use config::Config;
pub use request::RequestParams;
pub use rest::{RestPost, RestTerm};
pub use types::{
    EffectiveQuery, FilterMode, FilterModel, FilterType, ListingPage, MetaFilter, PageItem,
    PageResult, PaginationModel, Post, PostType, RequestState, SortOrder, Term, TermKind,
};
