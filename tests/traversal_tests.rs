//! End-to-end traversal scenarios driven through the scripted session.

use std::path::PathBuf;
use std::sync::Arc;

use dibscraper::application::{CrawlError, PageTraversal, TraversalOutcome};
use dibscraper::domain::recovery::HaltPolicy;
use dibscraper::infrastructure::checkpoint::Checkpointer;
use dibscraper::infrastructure::config::{ScraperConfig, TimingConfig};
use dibscraper::infrastructure::session::{ElementHandle, SessionError};
use dibscraper::testing::FakeSession;
use tempfile::TempDir;

const CATALOG: &str = "https://www.1stdibs.com/furniture/lighting/";
const PAGE_TWO: &str = "https://www.1stdibs.com/furniture/lighting/?page=2";
const PAGE_THREE: &str = "https://www.1stdibs.com/furniture/lighting/?page=3";
const TILE_SELECTOR: &str = "div[data-tn='item-tile-wrapper']";
const NEXT_SELECTOR: &str = "button[data-tn='page-forward']";

fn product_url(id: &str) -> String {
    format!("https://www.1stdibs.com/furniture/lighting/id-{id}/")
}

fn test_config() -> ScraperConfig {
    ScraperConfig {
        timing: TimingConfig::instant(),
        ..ScraperConfig::default()
    }
}

/// Build one catalog tile on `page`. An empty `price` leaves the price
/// element out entirely, producing an invalid listing. The caller
/// registers the returned handles under the tile selector.
fn build_tile(session: &FakeSession, page: &str, id: &str, price: &str) -> ElementHandle {
    let tile = session.element(page).build();
    let name = session.element(page).text(&format!("Lamp {id}")).build();
    session.on_element(tile, "h2", &[name]);
    let link = session.element(page).attr("href", &product_url(id)).build();
    session.on_element(tile, "a[data-tn='item-tile-title-anchor']", &[link]);
    let image = session
        .element(page)
        .attr("src", &format!("https://img.example.com/{id}.jpg"))
        .build();
    session.on_element(tile, "img[data-tn='product-image']", &[image]);
    if !price.is_empty() {
        let price_el = session.element(page).text(price).build();
        session.on_element(tile, "div[data-tn='price']", &[price_el]);
    }
    // Detail page exists but is sparse; seeded listing fields carry it.
    session.add_page(&product_url(id));
    tile
}

/// Populate a listing page with tiles, one per (id, price) pair.
fn add_tiles(session: &FakeSession, page: &str, specs: &[(&str, &str)]) {
    let tiles: Vec<ElementHandle> = specs
        .iter()
        .map(|(id, price)| build_tile(session, page, id, price))
        .collect();
    session.on_page(page, TILE_SELECTOR, &tiles);
}

fn add_next_button(session: &FakeSession, page: &str, target: &str) {
    let button = session.element(page).click_navigates(target).build();
    session.on_page(page, NEXT_SELECTOR, &[button]);
}

struct CheckpointPaths {
    listings: PathBuf,
    details: PathBuf,
    listings_final: PathBuf,
    details_final: PathBuf,
}

async fn run_traversal(
    session: &FakeSession,
    page_limit: Option<u32>,
) -> (Result<TraversalOutcome, CrawlError>, TempDir, CheckpointPaths) {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer = Checkpointer::create(dir.path(), "lighting", "20260806_120000")
        .await
        .unwrap();
    let paths = CheckpointPaths {
        listings: checkpointer.listings_path().to_path_buf(),
        details: checkpointer.details_path().to_path_buf(),
        listings_final: checkpointer.listings_final_path().to_path_buf(),
        details_final: checkpointer.details_final_path().to_path_buf(),
    };
    let traversal = PageTraversal::new(
        session.arc(),
        Arc::new(test_config()),
        checkpointer,
        Arc::new(HaltPolicy),
        page_limit,
    );
    let outcome = traversal.run(CATALOG).await;
    (outcome, dir, paths)
}

#[tokio::test]
async fn one_page_catalog_with_an_invalid_tile() {
    let session = FakeSession::new(CATALOG);
    add_tiles(
        &session,
        CATALOG,
        &[("a1", "$500"), ("a2", ""), ("a3", "$700")],
    );

    let (outcome, dir, paths) = run_traversal(&session, None).await;
    let outcome = outcome.unwrap();

    // Tile 2 lacked a price and was skipped; its detail page was never visited.
    assert_eq!(outcome.listings.len(), 2);
    assert_eq!(outcome.details.len(), 2);
    assert_eq!(outcome.pages_checkpointed, 1);
    assert!(!outcome.pagination.has_next);
    assert_eq!(outcome.pagination.current_page, 1);

    let ids: Vec<_> = outcome
        .listings
        .iter()
        .map(|listing| listing.product_id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["a1".to_string(), "a3".to_string()]);

    // Detail visits round-tripped through the listing page.
    let log = session.navigation_log();
    assert_eq!(
        log,
        vec![
            CATALOG.to_string(),
            product_url("a1"),
            CATALOG.to_string(),
            product_url("a3"),
            CATALOG.to_string(),
        ]
    );

    // The page checkpoint equals the final complete snapshot.
    let page_listings = std::fs::read(&paths.listings).unwrap();
    let final_listings = std::fs::read(&paths.listings_final).unwrap();
    assert_eq!(page_listings, final_listings);
    let page_details = std::fs::read(&paths.details).unwrap();
    let final_details = std::fs::read(&paths.details_final).unwrap();
    assert_eq!(page_details, final_details);

    // One file per successfully extracted product.
    let products: Vec<_> = std::fs::read_dir(dir.path().join("products"))
        .unwrap()
        .collect();
    assert_eq!(products.len(), 2);
}

#[tokio::test]
async fn page_limit_terminates_before_exhaustion() {
    let session = FakeSession::new(CATALOG);
    add_tiles(&session, CATALOG, &[("p1", "$100")]);
    add_next_button(&session, CATALOG, PAGE_TWO);
    add_tiles(&session, PAGE_TWO, &[("p2", "$200")]);
    add_next_button(&session, PAGE_TWO, PAGE_THREE);

    let (outcome, _dir, _paths) = run_traversal(&session, Some(2)).await;
    let outcome = outcome.unwrap();

    // Exactly two page checkpoints, and the run is limit-terminated:
    // a next button still existed when it stopped.
    assert_eq!(outcome.pages_checkpointed, 2);
    assert!(outcome.pagination.has_next);
    assert_eq!(outcome.pagination.current_page, 2);
    assert_eq!(outcome.listings.len(), 2);
}

#[tokio::test]
async fn missing_next_button_exhausts_pagination() {
    let session = FakeSession::new(CATALOG);
    add_tiles(&session, CATALOG, &[("q1", "$100")]);

    let (outcome, _dir, _paths) = run_traversal(&session, Some(10)).await;
    let outcome = outcome.unwrap();
    assert_eq!(outcome.pages_checkpointed, 1);
    assert!(!outcome.pagination.has_next);
}

#[tokio::test]
async fn disabled_next_button_is_treated_as_absent() {
    let session = FakeSession::new(CATALOG);
    add_tiles(&session, CATALOG, &[("d1", "$100")]);
    let button = session
        .element(CATALOG)
        .attr("class", "pagination-next disabled")
        .click_navigates(PAGE_TWO)
        .build();
    session.on_page(CATALOG, NEXT_SELECTOR, &[button]);

    let (outcome, _dir, _paths) = run_traversal(&session, None).await;
    let outcome = outcome.unwrap();
    assert_eq!(outcome.pages_checkpointed, 1);
    assert!(!outcome.pagination.has_next);
    // The disabled control was never activated.
    assert!(!session.navigation_log().contains(&PAGE_TWO.to_string()));
}

#[tokio::test]
async fn hidden_candidates_are_skipped_for_a_usable_one() {
    let session = FakeSession::new(CATALOG);
    add_tiles(&session, CATALOG, &[("h1", "$100")]);
    let hidden = session.element(CATALOG).hidden().build();
    let usable = session.element(CATALOG).click_navigates(PAGE_TWO).build();
    session.on_page(CATALOG, NEXT_SELECTOR, &[hidden, usable]);
    add_tiles(&session, PAGE_TWO, &[("h2", "$200")]);

    let (outcome, _dir, _paths) = run_traversal(&session, Some(2)).await;
    let outcome = outcome.unwrap();
    assert_eq!(outcome.pages_checkpointed, 2);
    assert_eq!(outcome.listings.len(), 2);
}

#[tokio::test]
async fn intercepted_activation_falls_back_to_forced_click() {
    let session = FakeSession::new(CATALOG);
    add_tiles(&session, CATALOG, &[("i1", "$100")]);
    let button = session
        .element(CATALOG)
        .click_intercepted_then_navigates(PAGE_TWO)
        .build();
    session.on_page(CATALOG, NEXT_SELECTOR, &[button]);
    add_tiles(&session, PAGE_TWO, &[("i2", "$200")]);

    let (outcome, _dir, _paths) = run_traversal(&session, Some(2)).await;
    let outcome = outcome.unwrap();
    assert_eq!(outcome.pages_checkpointed, 2);
    assert_eq!(outcome.pagination.current_page, 2);
}

#[tokio::test]
async fn tile_discovery_stall_halts_cleanly_with_a_diagnostic() {
    let session = FakeSession::new(CATALOG);
    session.set_page_source(CATALOG, "<html><body>new template</body></html>");

    let (outcome, dir, _paths) = run_traversal(&session, None).await;
    let outcome = outcome.unwrap();

    assert!(outcome.listings.is_empty());
    assert_eq!(outcome.pages_checkpointed, 0);

    let dump = dir.path().join("page_source_page1.html");
    let markup = std::fs::read_to_string(dump).unwrap();
    assert_eq!(markup, "<html><body>new template</body></html>");
}

#[tokio::test]
async fn invalidated_session_aborts_the_run() {
    let session = FakeSession::new(CATALOG);
    session.invalidate();

    let (outcome, _dir, _paths) = run_traversal(&session, None).await;
    match outcome {
        Err(CrawlError::Session(err)) => assert!(matches!(err, SessionError::Invalidated(_))),
        other => panic!("expected a fatal session error, got {other:?}"),
    }
}
