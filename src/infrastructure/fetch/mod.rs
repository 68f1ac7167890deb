//! Reference module sources

mod composite;
mod http_fetcher;
mod process_image;

pub use composite::CompositeModuleFetcher;
pub use http_fetcher::HttpModuleFetcher;
pub use process_image::ProcessImage;
