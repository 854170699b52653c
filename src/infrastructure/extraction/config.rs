//! Selector configuration for DOM extraction.
//!
//! Centralized fallback selector lists for every logical field. The
//! defaults cover the catalog templates observed so far; a config file
//! can override any list without touching code.

use serde::{Deserialize, Serialize};

/// All selector cascades used by extraction and traversal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub listing: ListingSelectors,
    pub detail: DetailSelectors,
    pub navigation: NavigationSelectors,
}

/// Selectors applied per catalog tile on listing pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Tile container candidates - multiple fallbacks, first match adopted
    pub tile_container: Vec<String>,

    /// Product name within a tile
    pub name: Vec<String>,

    /// Anchor carrying the product detail URL
    pub product_link: Vec<String>,

    /// Product image within a tile
    pub image: Vec<String>,

    /// Listed price
    pub price: Vec<String>,

    /// Creator / designer attribution
    pub creator: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            tile_container: vec![
                "div[data-tn='item-tile-wrapper']".to_string(),
                "div.item-tile-wrapper".to_string(),
                "div[data-component='ItemTile']".to_string(),
                "li.product-grid-item".to_string(),
                "div.productTile".to_string(),
                "article.productCard".to_string(),
            ],
            name: vec![
                "h2".to_string(),
                "h3".to_string(),
                "a[data-tn='item-tile-title-anchor']".to_string(),
                ".title".to_string(),
                "[data-tn='product-title']".to_string(),
            ],
            product_link: vec![
                "a[data-tn='item-tile-title-anchor']".to_string(),
                "a[href*='/id-']".to_string(),
                "a.product-link".to_string(),
                "a:first-child".to_string(),
            ],
            image: vec![
                "img[data-tn='product-image']".to_string(),
                "img.product-image".to_string(),
                "img:first-child".to_string(),
                "[data-srcset]".to_string(),
                "[srcset]".to_string(),
            ],
            price: vec![
                "div[data-tn='price']".to_string(),
                ".price".to_string(),
                "[data-tn='product-price']".to_string(),
                "span.money".to_string(),
            ],
            creator: vec![
                "a[data-tn='quick-view-creator-link']".to_string(),
                ".creator".to_string(),
                ".designer".to_string(),
                "[data-tn='product-creator']".to_string(),
            ],
        }
    }
}

/// Selectors applied on product detail pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSelectors {
    /// Description-like regions
    pub description: Vec<String>,

    /// Containers holding specification label/value structures
    pub spec_section: Vec<String>,

    /// Row candidates inside a specification section
    pub spec_row: Vec<String>,

    /// Label cell within a specification row
    pub spec_label: Vec<String>,

    /// Value cell within a specification row
    pub spec_value: Vec<String>,

    /// High-resolution hero image candidates
    pub hero_image: Vec<String>,

    /// Embedded machine-readable metadata blocks
    pub structured_metadata: Vec<String>,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            description: vec![
                "div[data-tn='listing-page-description']".to_string(),
                "div.product-description".to_string(),
                "div.description".to_string(),
                "#description".to_string(),
            ],
            spec_section: vec![
                "div[data-tn='listing-page-details']".to_string(),
                "div.product-details".to_string(),
                "section.specifications".to_string(),
                "table.details".to_string(),
            ],
            spec_row: vec!["tr, .specification-row".to_string()],
            spec_label: vec!["th, .label, .spec-label".to_string()],
            spec_value: vec!["td, .value, .spec-value".to_string()],
            hero_image: vec![
                "img[data-tn='listing-page-hero-image']".to_string(),
                ".product-image-main img".to_string(),
                ".main-image img".to_string(),
                "div.gallery img".to_string(),
            ],
            structured_metadata: vec!["script[type='application/ld+json']".to_string()],
        }
    }
}

/// Selectors for page-level navigation controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationSelectors {
    /// Next-page control candidates
    pub next_button: Vec<String>,

    /// Cookie/consent overlay accept button
    pub consent_button: Vec<String>,
}

impl Default for NavigationSelectors {
    fn default() -> Self {
        Self {
            next_button: vec![
                "button[data-tn='page-forward']".to_string(),
                "a[data-tn='page-forward']".to_string(),
                "button.pagination-next".to_string(),
                "a.pagination-next".to_string(),
                "li.pagination-next > a".to_string(),
                "button[aria-label='Next Page']".to_string(),
            ],
            consent_button: vec!["#onetrust-accept-btn-handler".to_string()],
        }
    }
}
