//! Required-field gate applied before a record is accepted.

use thiserror::Error;

use crate::domain::product::ListingRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required fields missing or empty: {}", missing.join(", "))]
    MissingFields { missing: Vec<String> },
}

/// Gate for listing records: name, url, image_url, price, and a derived
/// product_id must all be present.
pub fn validate_listing(record: &ListingRecord) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if record.name.is_empty() {
        missing.push("name".to_string());
    }
    if record.url.is_empty() {
        missing.push("url".to_string());
    }
    if record.image_url.is_empty() {
        missing.push("image_url".to_string());
    }
    if record.price.is_empty() {
        missing.push("price".to_string());
    }
    if record.product_id.as_deref().unwrap_or("").is_empty() {
        missing.push("product_id".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields { missing })
    }
}

/// Gate for detail records, applied post-enrichment: the final name and
/// image must both be non-empty even if the base listing carried them.
pub fn validate_detail(name: &str, image_url: &str) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if name.is_empty() {
        missing.push("name".to_string());
    }
    if image_url.is_empty() {
        missing.push("image_url".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_listing() -> ListingRecord {
        ListingRecord {
            name: "Murano Chandelier".to_string(),
            url: "https://example.com/id-m1/".to_string(),
            image_url: "https://img.example.com/m1.jpg".to_string(),
            price: "$4,500".to_string(),
            creator: String::new(),
            product_id: Some("m1".to_string()),
        }
    }

    #[test]
    fn complete_listing_passes() {
        assert!(validate_listing(&complete_listing()).is_ok());
    }

    #[test]
    fn each_required_listing_field_is_enforced() {
        for field in ["name", "url", "image_url", "price", "product_id"] {
            let mut record = complete_listing();
            match field {
                "name" => record.name.clear(),
                "url" => record.url.clear(),
                "image_url" => record.image_url.clear(),
                "price" => record.price.clear(),
                "product_id" => record.product_id = None,
                _ => unreachable!(),
            }
            let err = validate_listing(&record).unwrap_err();
            let ValidationError::MissingFields { missing } = err;
            assert_eq!(missing, vec![field.to_string()]);
        }
    }

    #[test]
    fn creator_is_optional() {
        let record = complete_listing();
        assert!(record.creator.is_empty());
        assert!(validate_listing(&record).is_ok());
    }

    #[test]
    fn empty_product_id_is_rejected() {
        let mut record = complete_listing();
        record.product_id = Some(String::new());
        assert!(validate_listing(&record).is_err());
    }

    #[test]
    fn detail_gate_requires_name_and_image() {
        assert!(validate_detail("Lamp", "img.jpg").is_ok());
        assert!(validate_detail("", "img.jpg").is_err());
        assert!(validate_detail("Lamp", "").is_err());
    }
}
