use crate::apis::base::SourceAdapter;
use crate::apis::html_listing::HtmlListingAdapter;
use crate::apis::json_file::JsonFileAdapter;
use crate::common::error::Result;
use crate::registry::{AdapterSpec, SourceSpec};

/// Build the adapter a registry spec describes
pub fn create_adapter(spec: &SourceSpec) -> Result<Box<dyn SourceAdapter>> {
    match &spec.adapter {
        AdapterSpec::HtmlListing { urls, selectors, venue } => Ok(Box::new(HtmlListingAdapter::new(
            spec.source_id.clone(),
            urls.clone(),
            selectors,
            venue.clone(),
        )?)),
        AdapterSpec::JsonFile { path } => Ok(Box::new(JsonFileAdapter::new(spec.source_id.clone(), path.clone()))),
    }
}
