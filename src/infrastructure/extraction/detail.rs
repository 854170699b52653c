//! Detail page extraction: enrich a listing into a `DetailedProduct`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::product::{DetailedProduct, ListingRecord};
use crate::infrastructure::extraction::config::DetailSelectors;
use crate::infrastructure::extraction::resolver::{FieldResolver, SelectorCascade};
use crate::infrastructure::extraction::validator;
use crate::infrastructure::session::{
    recover_or, DomSession, ElementHandle, Scope, SessionResult,
};

/// Thumbnail width token rewritten to request a larger rendition.
const THUMBNAIL_WIDTH_TOKEN: &str = "width=240";
const LARGE_WIDTH_TOKEN: &str = "width=1200";

/// Rewrite the fixed thumbnail-width token to the large-width token.
/// A URL without the token passes through unchanged.
pub fn upscale_image_url(url: &str) -> String {
    url.replace(THUMBNAIL_WIDTH_TOKEN, LARGE_WIDTH_TOKEN)
}

/// Normalize a specification label into a map key.
pub fn normalize_spec_key(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Builds a `DetailedProduct` from a product detail page, merging listing
/// data with page-specific fields.
pub struct DetailExtractor {
    session: Arc<dyn DomSession>,
    resolver: FieldResolver,
    selectors: DetailSelectors,
    settle: Duration,
}

impl DetailExtractor {
    pub fn new(session: Arc<dyn DomSession>, selectors: DetailSelectors, settle: Duration) -> Self {
        Self {
            resolver: FieldResolver::new(Arc::clone(&session)),
            session,
            selectors,
            settle,
        }
    }

    /// Visit `product_url` and assemble the enriched record.
    ///
    /// The caller is responsible for restoring the session position
    /// afterwards; this navigates away from the listing page.
    pub async fn extract(
        &self,
        product_url: &str,
        product_id: Option<&str>,
        base: &ListingRecord,
    ) -> SessionResult<Option<DetailedProduct>> {
        let Some(product_id) = product_id.filter(|id| !id.is_empty()) else {
            warn!("missing product id for {product_url} - skipping detail visit");
            return Ok(None);
        };
        if product_url.is_empty() {
            warn!("missing product url for {product_id} - skipping detail visit");
            return Ok(None);
        }

        debug!("visiting product page {product_url}");
        self.session.navigate(product_url).await?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let mut product = DetailedProduct::seeded(product_id, product_url, base);

        let description = self
            .resolver
            .resolve(
                Scope::Page,
                &SelectorCascade::text(&self.selectors.description),
            )
            .await?;
        if !description.is_empty() {
            product.set_description(description);
        }

        let mut specifications = self.extract_specifications().await?;
        if !base.creator.is_empty() {
            // Listing data wins; detail-page creator markup is less reliable.
            specifications.insert("creator".to_string(), base.creator.clone());
        }
        product.set_specifications(specifications);

        if let Some(json_ld) = self.extract_structured_metadata().await? {
            product.raw_data.json_ld = Some(json_ld);
        }

        if let Some(image_url) = self.extract_hero_image().await? {
            product.set_image_url(image_url);
        }

        if let Err(err) = validator::validate_detail(&product.name, &product.image_url) {
            warn!("product {product_id} rejected: {err}");
            return Ok(None);
        }
        Ok(Some(product))
    }

    /// Specification pairs from the first section selector that yields
    /// any. Within a section the definition-list strategy runs first,
    /// then the row-based fallback.
    async fn extract_specifications(&self) -> SessionResult<BTreeMap<String, String>> {
        for selector in &self.selectors.spec_section {
            let sections = recover_or(self.session.find(Scope::Page, selector).await, Vec::new())?;
            let Some(&section) = sections.first() else {
                continue;
            };

            let mut pairs = self.pairs_from_definition_list(section).await?;
            if pairs.is_empty() {
                pairs = self.pairs_from_rows(section).await?;
            }
            if !pairs.is_empty() {
                debug!("extracted {} specification pairs via {selector}", pairs.len());
                return Ok(pairs);
            }
        }
        Ok(BTreeMap::new())
    }

    /// dt/dd lists zipped positionally; pairs beyond the shorter list
    /// are dropped.
    async fn pairs_from_definition_list(
        &self,
        section: ElementHandle,
    ) -> SessionResult<BTreeMap<String, String>> {
        let labels = recover_or(self.session.find(section.into(), "dt").await, Vec::new())?;
        let values = recover_or(self.session.find(section.into(), "dd").await, Vec::new())?;

        let mut pairs = BTreeMap::new();
        for (&label, &value) in labels.iter().zip(values.iter()) {
            let key = normalize_spec_key(&self.text_or_empty(label).await?);
            let value = self.text_or_empty(value).await?.trim().to_string();
            if !key.is_empty() && !value.is_empty() {
                pairs.insert(key, value);
            }
        }
        Ok(pairs)
    }

    /// Row-based fallback: each row contributes one label/value pair.
    async fn pairs_from_rows(
        &self,
        section: ElementHandle,
    ) -> SessionResult<BTreeMap<String, String>> {
        let mut pairs = BTreeMap::new();
        let rows = self
            .first_matching(section.into(), &self.selectors.spec_row)
            .await?;
        for row in rows {
            let labels = self
                .first_matching(row.into(), &self.selectors.spec_label)
                .await?;
            let values = self
                .first_matching(row.into(), &self.selectors.spec_value)
                .await?;
            let (Some(&label), Some(&value)) = (labels.first(), values.first()) else {
                continue;
            };

            let key = normalize_spec_key(&self.text_or_empty(label).await?);
            let value = self.text_or_empty(value).await?.trim().to_string();
            if !key.is_empty() && !value.is_empty() {
                pairs.insert(key, value);
            }
        }
        Ok(pairs)
    }

    /// First embedded JSON-LD block that parses; a malformed block is a
    /// silent miss.
    async fn extract_structured_metadata(&self) -> SessionResult<Option<Value>> {
        for selector in &self.selectors.structured_metadata {
            let scripts = recover_or(self.session.find(Scope::Page, selector).await, Vec::new())?;
            for &script in &scripts {
                let body = self.text_or_empty(script).await?;
                if body.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&body) {
                    Ok(value) => return Ok(Some(value)),
                    Err(err) => debug!("unparseable structured metadata block: {err}"),
                }
            }
        }
        Ok(None)
    }

    /// Higher-resolution image candidate. Adopted only when the URL
    /// carries a width parameter, after the thumbnail-token rewrite.
    async fn extract_hero_image(&self) -> SessionResult<Option<String>> {
        for selector in &self.selectors.hero_image {
            let images = recover_or(self.session.find(Scope::Page, selector).await, Vec::new())?;
            let Some(&image) = images.first() else {
                continue;
            };
            let src = recover_or(self.session.attribute(image, "src").await, None)?;
            if let Some(src) = src {
                if src.contains("width=") {
                    return Ok(Some(upscale_image_url(&src)));
                }
            }
        }
        Ok(None)
    }

    async fn first_matching(
        &self,
        scope: Scope,
        selectors: &[String],
    ) -> SessionResult<Vec<ElementHandle>> {
        for selector in selectors {
            let matches = recover_or(self.session.find(scope, selector).await, Vec::new())?;
            if !matches.is_empty() {
                return Ok(matches);
            }
        }
        Ok(Vec::new())
    }

    async fn text_or_empty(&self, element: ElementHandle) -> SessionResult<String> {
        recover_or(self.session.text(element).await, String::new())
    }
}
