//! Listing record extraction from catalog tiles.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::domain::product::{extract_product_id, ListingRecord};
use crate::infrastructure::extraction::config::ListingSelectors;
use crate::infrastructure::extraction::resolver::{FieldResolver, SelectorCascade};
use crate::infrastructure::extraction::validator;
use crate::infrastructure::session::{DomSession, ElementHandle, Scope, SessionResult};

/// Attribute priority for tile images; lazy-loading templates park the
/// real URL in data-src or srcset.
const IMAGE_ATTRIBUTES: [&str; 3] = ["src", "data-src", "srcset"];

/// Builds a validated `ListingRecord` from one catalog-tile scope.
pub struct ListingExtractor {
    resolver: FieldResolver,
    selectors: ListingSelectors,
}

impl ListingExtractor {
    pub fn new(session: Arc<dyn DomSession>, selectors: ListingSelectors) -> Self {
        Self {
            resolver: FieldResolver::new(session),
            selectors,
        }
    }

    /// Extract one tile. Fields resolve independently; the validator
    /// decides materiality. An invalid tile yields `Ok(None)` and the
    /// caller skips it without aborting traversal.
    pub async fn extract(
        &self,
        tile: ElementHandle,
        page_url: &str,
    ) -> SessionResult<Option<ListingRecord>> {
        let scope = Scope::Element(tile);

        let name = self
            .resolver
            .resolve(scope, &SelectorCascade::text(&self.selectors.name))
            .await?;

        let href = self
            .resolver
            .resolve(
                scope,
                &SelectorCascade::attribute(&self.selectors.product_link, "href"),
            )
            .await?;
        let url = resolve_href(&href, page_url);

        let image_url = self
            .resolver
            .resolve(
                scope,
                &SelectorCascade::attribute_priority(&self.selectors.image, &IMAGE_ATTRIBUTES),
            )
            .await?;

        let price = self
            .resolver
            .resolve(scope, &SelectorCascade::text(&self.selectors.price))
            .await?;

        let creator = self
            .resolver
            .resolve(scope, &SelectorCascade::text(&self.selectors.creator))
            .await?;

        let product_id = extract_product_id(&url);
        let record = ListingRecord {
            name,
            url,
            image_url,
            price,
            creator,
            product_id,
        };

        match validator::validate_listing(&record) {
            Ok(()) => Ok(Some(record)),
            Err(err) => {
                debug!("tile rejected: {err}");
                Ok(None)
            }
        }
    }
}

/// Resolve a possibly-relative href against the page it was found on.
/// Unresolvable values pass through unchanged and fail validation later
/// if they matter.
fn resolve_href(href: &str, base: &str) -> String {
    if href.is_empty() || href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(base).and_then(|base| base.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSession;

    const PAGE: &str = "https://www.1stdibs.com/furniture/lighting/";

    fn extractor(session: &FakeSession) -> ListingExtractor {
        ListingExtractor::new(session.arc(), ListingSelectors::default())
    }

    fn build_tile(
        session: &FakeSession,
        name: &str,
        href: &str,
        image: &str,
        price: &str,
        creator: &str,
    ) -> ElementHandle {
        let tile = session.element(PAGE).build();
        if !name.is_empty() {
            let name_el = session.element(PAGE).text(name).build();
            session.on_element(tile, "h2", &[name_el]);
        }
        if !href.is_empty() {
            let link = session.element(PAGE).attr("href", href).build();
            session.on_element(tile, "a[data-tn='item-tile-title-anchor']", &[link]);
        }
        if !image.is_empty() {
            let img = session.element(PAGE).attr("src", image).build();
            session.on_element(tile, "img[data-tn='product-image']", &[img]);
        }
        if !price.is_empty() {
            let price_el = session.element(PAGE).text(price).build();
            session.on_element(tile, "div[data-tn='price']", &[price_el]);
        }
        if !creator.is_empty() {
            let creator_el = session.element(PAGE).text(creator).build();
            session.on_element(tile, ".creator", &[creator_el]);
        }
        tile
    }

    #[tokio::test]
    async fn complete_tile_yields_a_record() {
        let session = FakeSession::new(PAGE);
        let tile = build_tile(
            &session,
            "Brass Sconce",
            "https://www.1stdibs.com/furniture/lighting/id-f_1/",
            "https://img.example.com/f1.jpg",
            "$900",
            "Stilnovo",
        );

        let record = extractor(&session)
            .extract(tile, PAGE)
            .await
            .unwrap()
            .expect("valid tile");
        assert_eq!(record.name, "Brass Sconce");
        assert_eq!(record.product_id.as_deref(), Some("f_1"));
        assert_eq!(record.creator, "Stilnovo");
    }

    #[tokio::test]
    async fn missing_price_rejects_the_tile() {
        let session = FakeSession::new(PAGE);
        let tile = build_tile(
            &session,
            "Brass Sconce",
            "https://www.1stdibs.com/furniture/lighting/id-f_1/",
            "https://img.example.com/f1.jpg",
            "",
            "",
        );

        let record = extractor(&session).extract(tile, PAGE).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn url_without_marker_fails_validation() {
        let session = FakeSession::new(PAGE);
        let tile = build_tile(
            &session,
            "Brass Sconce",
            "https://www.1stdibs.com/furniture/lighting/no-marker/",
            "https://img.example.com/f1.jpg",
            "$900",
            "",
        );

        let record = extractor(&session).extract(tile, PAGE).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn relative_href_resolves_against_page_url() {
        let session = FakeSession::new(PAGE);
        let tile = build_tile(
            &session,
            "Brass Sconce",
            "/furniture/lighting/id-f_2/",
            "https://img.example.com/f2.jpg",
            "$1,100",
            "",
        );

        let record = extractor(&session)
            .extract(tile, PAGE)
            .await
            .unwrap()
            .expect("valid tile");
        assert_eq!(
            record.url,
            "https://www.1stdibs.com/furniture/lighting/id-f_2/"
        );
        assert_eq!(record.product_id.as_deref(), Some("f_2"));
    }

    #[test]
    fn resolve_href_keeps_absolute_urls() {
        assert_eq!(
            resolve_href("https://other.example/x", PAGE),
            "https://other.example/x"
        );
        assert_eq!(resolve_href("", PAGE), "");
    }
}
