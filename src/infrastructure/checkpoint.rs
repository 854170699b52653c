//! Page-level checkpointing of accumulated crawl output.
//!
//! Every completed page rewrites the same two category-scoped files with
//! the full accumulated collections, so the latest successful save always
//! reflects all progress. Detail records are additionally persisted one
//! file per product the moment they are extracted, which bounds data loss
//! to the in-flight record.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::domain::product::{DetailedProduct, ListingRecord};

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint io failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persists run output under one output directory.
pub struct Checkpointer {
    output_dir: PathBuf,
    products_dir: PathBuf,
    listings_path: PathBuf,
    details_path: PathBuf,
    listings_final_path: PathBuf,
    details_final_path: PathBuf,
}

impl Checkpointer {
    /// Create the output directories and fix the run's file names from
    /// the category and run timestamp.
    pub async fn create(
        output_dir: impl Into<PathBuf>,
        category: &str,
        run_stamp: &str,
    ) -> Result<Self, CheckpointError> {
        let output_dir = output_dir.into();
        let products_dir = output_dir.join("products");
        create_dir(&output_dir).await?;
        create_dir(&products_dir).await?;

        let stem = |kind: &str, suffix: &str| {
            output_dir.join(format!("1stdibs_{category}_{kind}_{run_stamp}{suffix}.json"))
        };

        Ok(Self {
            listings_path: stem("listings", ""),
            details_path: stem("detailed", ""),
            listings_final_path: stem("listings", "_complete"),
            details_final_path: stem("detailed", "_complete"),
            output_dir,
            products_dir,
        })
    }

    /// Overwrite the page-scoped snapshot with the full accumulated
    /// collections. Idempotent: identical input produces identical bytes.
    pub async fn save_page(
        &self,
        listings: &[ListingRecord],
        details: &[DetailedProduct],
    ) -> Result<(), CheckpointError> {
        write_json(&self.listings_path, &listings).await?;
        write_json(&self.details_path, &details).await?;
        debug!(
            "checkpoint saved: {} listings, {} details",
            listings.len(),
            details.len()
        );
        Ok(())
    }

    /// Write the separately-named consolidated snapshot after traversal
    /// ends.
    pub async fn save_final(
        &self,
        listings: &[ListingRecord],
        details: &[DetailedProduct],
    ) -> Result<(), CheckpointError> {
        write_json(&self.listings_final_path, &listings).await?;
        write_json(&self.details_final_path, &details).await?;
        info!(
            "final snapshot saved: {} listings, {} details",
            listings.len(),
            details.len()
        );
        Ok(())
    }

    /// Persist one detail record immediately, keyed by product id and a
    /// fine-grained timestamp.
    pub async fn save_product(
        &self,
        product: &DetailedProduct,
    ) -> Result<PathBuf, CheckpointError> {
        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3f");
        let path = self
            .products_dir
            .join(format!("product_{}_{}Z.json", product.product_id, stamp));
        write_json(&path, product).await?;
        debug!("saved detailed product data to {}", path.display());
        Ok(path)
    }

    /// Write a raw page-markup dump for offline selector maintenance.
    pub async fn save_diagnostic(
        &self,
        file_name: &str,
        markup: &str,
    ) -> Result<PathBuf, CheckpointError> {
        let path = self.output_dir.join(file_name);
        fs::write(&path, markup).await.map_err(|source| {
            CheckpointError::Io {
                path: path.clone(),
                source,
            }
        })?;
        info!("diagnostic page dump written to {}", path.display());
        Ok(path)
    }

    pub fn listings_path(&self) -> &Path {
        &self.listings_path
    }

    pub fn details_path(&self) -> &Path {
        &self.details_path
    }

    pub fn listings_final_path(&self) -> &Path {
        &self.listings_final_path
    }

    pub fn details_final_path(&self) -> &Path {
        &self.details_final_path
    }
}

async fn create_dir(path: &Path) -> Result<(), CheckpointError> {
    fs::create_dir_all(path).await.map_err(|source| {
        CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CheckpointError> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).await.map_err(|source| {
        CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::ListingRecord;

    fn listing(id: &str) -> ListingRecord {
        ListingRecord {
            name: format!("Item {id}"),
            url: format!("https://example.com/id-{id}/"),
            image_url: format!("https://img.example.com/{id}.jpg"),
            price: "$100".to_string(),
            creator: String::new(),
            product_id: Some(id.to_string()),
        }
    }

    #[tokio::test]
    async fn page_saves_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::create(dir.path(), "lighting", "20260806_120000")
            .await
            .unwrap();

        let listings = vec![listing("a"), listing("b")];
        checkpointer.save_page(&listings, &[]).await.unwrap();
        let first = fs::read(checkpointer.listings_path()).await.unwrap();
        checkpointer.save_page(&listings, &[]).await.unwrap();
        let second = fs::read(checkpointer.listings_path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn final_snapshot_matches_last_page_save() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::create(dir.path(), "lighting", "20260806_120000")
            .await
            .unwrap();

        let listings = vec![listing("a")];
        checkpointer.save_page(&listings, &[]).await.unwrap();
        checkpointer.save_final(&listings, &[]).await.unwrap();

        let page = fs::read(checkpointer.listings_path()).await.unwrap();
        let fin = fs::read(checkpointer.listings_final_path()).await.unwrap();
        assert_eq!(page, fin);
    }

    #[tokio::test]
    async fn file_names_carry_category_and_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::create(dir.path(), "seating", "20260806_090000")
            .await
            .unwrap();
        let name = checkpointer
            .listings_path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert_eq!(name, "1stdibs_seating_listings_20260806_090000.json");
        let final_name = checkpointer
            .details_final_path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert_eq!(
            final_name,
            "1stdibs_seating_detailed_20260806_090000_complete.json"
        );
    }

    #[tokio::test]
    async fn product_files_land_in_the_products_directory() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::create(dir.path(), "tables", "20260806_100000")
            .await
            .unwrap();
        let base = listing("t_1");
        let product = DetailedProduct::seeded("t_1", &base.url, &base);
        let path = checkpointer.save_product(&product).await.unwrap();
        assert!(path.starts_with(dir.path().join("products")));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("product_t_1_"));
        let body = fs::read_to_string(&path).await.unwrap();
        let parsed: DetailedProduct = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, product);
    }

    #[tokio::test]
    async fn diagnostics_are_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::create(dir.path(), "storage", "20260806_110000")
            .await
            .unwrap();
        let path = checkpointer
            .save_diagnostic("page_source_page3.html", "<html></html>")
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(&path).await.unwrap(),
            "<html></html>"
        );
    }
}
