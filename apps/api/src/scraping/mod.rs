//! Job page fetching and text cleaning.

pub mod cleaner;
pub mod fetcher;

pub use cleaner::clean_text;
pub use fetcher::PageFetcher;
