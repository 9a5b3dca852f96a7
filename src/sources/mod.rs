//! Playlist source loading

pub mod loader;
pub mod traits;

pub use loader::SourceLoader;
pub use traits::ContentLoader;
