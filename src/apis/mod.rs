pub mod base;
pub mod factory;
pub mod html_listing;
pub mod json_file;

pub use base::SourceAdapter;
pub use factory::create_adapter;
