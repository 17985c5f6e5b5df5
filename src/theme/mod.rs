pub mod renderer;

pub use renderer::{ListingRenderer, RenderOptions};
