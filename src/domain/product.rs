//! Product entities produced by listing and detail extraction.
//!
//! `ListingRecord` is what a catalog tile yields; `DetailedProduct` is the
//! enriched record built from a product detail page. Both are immutable
//! once extraction finishes and serialize to the checkpoint JSON format.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Retailer tag stamped on every detailed product.
pub const RETAILER: &str = "1stDibs";

/// Extraction method tag recorded in `raw_data`.
pub const EXTRACTION_METHOD: &str = "automated";

/// Marker pattern for the product id path segment in catalog URLs.
static PRODUCT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/id-([^/]+)/?").expect("product id pattern is valid"));

/// Derive a product id from a product URL.
///
/// The id is the path segment following the `/id-` marker. A URL without
/// the marker has no id, and such a listing never passes validation.
pub fn extract_product_id(url: &str) -> Option<String> {
    PRODUCT_ID_PATTERN
        .captures(url)
        .map(|captures| captures[1].to_string())
}

/// Basic product information extracted from one catalog tile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingRecord {
    pub name: String,
    pub url: String,
    pub image_url: String,
    pub price: String,
    pub creator: String,
    pub product_id: Option<String>,
}

/// Enriched product record built from a detail page visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailedProduct {
    pub retailer: String,
    pub product_id: String,
    pub name: String,
    pub slug: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
    pub url: String,
    pub specifications: BTreeMap<String, String>,
    pub raw_data: RawProductData,
}

/// camelCase mirror of the normalized fields, plus the
/// structured-metadata slot and the extraction method tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawProductData {
    pub product_id: String,
    pub slug: String,
    pub url: String,
    pub name: String,
    pub price: String,
    pub image_url: String,
    pub description: String,
    pub specifications: BTreeMap<String, String>,
    pub json_ld: Option<Value>,
    pub extraction_method: String,
}

impl DetailedProduct {
    /// Seed a detail record from the originating listing so a detail page
    /// that fails to render some region still yields a usable record.
    pub fn seeded(product_id: &str, product_url: &str, base: &ListingRecord) -> Self {
        Self {
            retailer: RETAILER.to_string(),
            product_id: product_id.to_string(),
            name: base.name.clone(),
            slug: product_id.to_string(),
            price: base.price.clone(),
            description: String::new(),
            image_url: base.image_url.clone(),
            url: product_url.to_string(),
            specifications: BTreeMap::new(),
            raw_data: RawProductData {
                product_id: product_id.to_string(),
                slug: product_id.to_string(),
                url: product_url.to_string(),
                name: base.name.clone(),
                price: base.price.clone(),
                image_url: base.image_url.clone(),
                description: String::new(),
                specifications: BTreeMap::new(),
                json_ld: None,
                extraction_method: EXTRACTION_METHOD.to_string(),
            },
        }
    }

    /// Set the description on both the normalized and raw views.
    pub fn set_description(&mut self, description: String) {
        self.raw_data.description = description.clone();
        self.description = description;
    }

    /// Set the specification map on both the normalized and raw views.
    pub fn set_specifications(&mut self, specifications: BTreeMap<String, String>) {
        self.raw_data.specifications = specifications.clone();
        self.specifications = specifications;
    }

    /// Set the image URL on both the normalized and raw views.
    pub fn set_image_url(&mut self, image_url: String) {
        self.raw_data.image_url = image_url.clone();
        self.image_url = image_url;
    }
}
