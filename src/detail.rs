use std::fmt::Display;

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::domain::CatalogError;
use crate::record::value_text;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Dimensions {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub reviewer_name: Option<String>,
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub date: Option<String>,
}

/// Full product record as returned by the single record endpoint.
/// Fields the browser has no dedicated place for are kept in `extra`.
/// A known field holding a value of an unexpected type reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub discount_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub rating: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub stock: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub availability_status: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub brand: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub sku: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub weight: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub dimensions: Option<Dimensions>,
    #[serde(deserialize_with = "lenient")]
    pub warranty_information: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub shipping_information: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub return_policy: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub minimum_order_quantity: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub tags: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient")]
    pub thumbnail: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub images: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient")]
    pub reviews: Option<Vec<Review>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value)
        .inspect_err(|err| trace!("Ignoring malformed product field: {err}"))
        .ok())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub lines: Vec<String>,
}

fn text<T: Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn present<T>(items: &Option<Vec<T>>) -> Option<&[T]> {
    items.as_deref().filter(|items| !items.is_empty())
}

fn review_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Lay out a product as titled sections. Collections that are absent or
/// empty produce no section at all.
pub fn sections(product: &Product) -> Vec<Section> {
    let mut sections = vec![Section {
        title: "",
        lines: vec![
            text(&product.title),
            format!("Category: {}", text(&product.category)),
            format!(
                "${} ({}% OFF)",
                text(&product.price),
                text(&product.discount_percentage)
            ),
            format!(
                "★ {} | Stock: {} ({})",
                text(&product.rating),
                text(&product.stock),
                text(&product.availability_status)
            ),
            format!("ID: {}", value_text(product.id.as_ref())),
        ],
    }];

    let gallery: Vec<String> = product
        .thumbnail
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| format!("Thumbnail: {t}"))
        .chain(present(&product.images).unwrap_or_default().iter().cloned())
        .collect();
    if !gallery.is_empty() {
        sections.push(Section {
            title: "Gallery",
            lines: gallery,
        });
    }

    sections.push(Section {
        title: "Description",
        lines: vec![text(&product.description)],
    });

    let dimensions = product.dimensions.clone().unwrap_or_default();
    sections.push(Section {
        title: "Details",
        lines: vec![
            format!("Brand: {}", text(&product.brand)),
            format!("SKU: {}", text(&product.sku)),
            format!("Weight: {} kg", text(&product.weight)),
            format!(
                "Dimensions: {} × {} × {} cm",
                text(&dimensions.width),
                text(&dimensions.height),
                text(&dimensions.depth)
            ),
            format!("Warranty: {}", text(&product.warranty_information)),
            format!("Shipping: {}", text(&product.shipping_information)),
            format!("Return Policy: {}", text(&product.return_policy)),
            format!("Minimum Order: {}", text(&product.minimum_order_quantity)),
        ],
    });

    if let Some(tags) = present(&product.tags) {
        sections.push(Section {
            title: "Tags",
            lines: vec![tags.join(", ")],
        });
    }

    if let Some(reviews) = present(&product.reviews) {
        let mut lines = Vec::new();
        for review in reviews {
            lines.push(format!(
                "{} – ★ {}",
                text(&review.reviewer_name),
                text(&review.rating)
            ));
            lines.push(review.date.as_deref().map(review_date).unwrap_or_default());
            lines.push(text(&review.comment));
            lines.push(String::new());
        }
        lines.pop();
        sections.push(Section {
            title: "Customer Reviews",
            lines,
        });
    }

    let extra: Vec<String> = product
        .extra
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| format!("{k}: {}", value_text(Some(v))))
        .collect();
    if !extra.is_empty() {
        sections.push(Section {
            title: "More",
            lines: extra,
        });
    }

    sections
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Loaded(Box<Product>),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub seq: u64,
    pub id: String,
}

/// State of the product detail screen.
#[derive(Debug)]
pub struct DetailView {
    issued: u64,
    id: Option<String>,
    state: DetailState,
    pub scroll: u16,
}

impl Default for DetailView {
    fn default() -> Self {
        Self {
            issued: 0,
            id: None,
            state: DetailState::Loading,
            scroll: 0,
        }
    }
}

impl DetailView {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn open(&mut self, id: &str) -> DetailRequest {
        self.issued += 1;
        self.id = Some(id.to_string());
        self.state = DetailState::Loading;
        self.scroll = 0;
        debug!("Open detail {id} as request {}", self.issued);
        DetailRequest {
            seq: self.issued,
            id: id.to_string(),
        }
    }

    pub fn close(&mut self) {
        self.id = None;
        self.state = DetailState::Loading;
    }

    /// Apply the outcome of request `seq`. Results for a closed view or an
    /// older request are dropped.
    pub fn complete(&mut self, seq: u64, result: Result<Product, CatalogError>) -> bool {
        if seq != self.issued || self.id.is_none() {
            trace!("Dropping stale detail response {seq}");
            return false;
        }
        self.state = match result {
            Ok(product) => DetailState::Loaded(Box::new(product)),
            Err(CatalogError::NotFound(id)) => {
                debug!("Product {id} not found");
                DetailState::NotFound
            }
            Err(err) => {
                warn!("Detail request {seq} failed: {err}");
                DetailState::NotFound
            }
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn phone() -> Product {
        serde_json::from_value(json!({
            "id": 1,
            "title": "iPhone 9",
            "category": "smartphones",
            "price": 549,
            "discountPercentage": 12.96,
            "rating": 4.69,
            "stock": 94,
            "availabilityStatus": "In Stock",
            "brand": "Apple",
            "dimensions": {"width": 5.1, "height": 14.7, "depth": 0.8},
            "images": ["https://cdn/1.jpg", "https://cdn/2.jpg"],
            "reviews": [
                {
                    "reviewerName": "Ann",
                    "rating": 5,
                    "comment": "Great",
                    "date": "2024-05-23T08:56:21.618Z"
                }
            ],
            "meta": {"barcode": "123"}
        }))
        .unwrap()
    }

    fn titles(sections: &[Section]) -> Vec<&'static str> {
        sections.iter().map(|s| s.title).collect()
    }

    #[test]
    fn all_sections_for_full_product() {
        let s = sections(&phone());
        assert_eq!(
            titles(&s),
            vec!["", "Gallery", "Description", "Details", "Customer Reviews", "More"]
        );
        assert_eq!(s[0].lines[0], "iPhone 9");
        assert_eq!(s[0].lines[2], "$549 (12.96% OFF)");
        assert_eq!(s[1].lines.len(), 2);
        assert_eq!(s[3].lines[3], "Dimensions: 5.1 × 14.7 × 0.8 cm");
        assert_eq!(s[4].lines, vec!["Ann – ★ 5", "2024-05-23", "Great"]);
        assert_eq!(s[5].lines, vec!["meta: {\"barcode\":\"123\"}"]);
    }

    #[test]
    fn zero_reviews_render_no_reviews_section() {
        let mut product = phone();
        product.reviews = Some(Vec::new());
        product.images = None;
        let s = sections(&product);
        assert!(!titles(&s).contains(&"Customer Reviews"));
        assert!(!titles(&s).contains(&"Gallery"));
    }

    #[test]
    fn missing_fields_render_empty() {
        let product: Product = serde_json::from_value(json!({"id": 3})).unwrap();
        let s = sections(&product);
        assert_eq!(titles(&s), vec!["", "Description", "Details"]);
        assert_eq!(s[2].lines[0], "Brand: ");
        assert_eq!(s[2].lines[3], "Dimensions:  ×  ×  cm");
    }

    #[test]
    fn thumbnail_and_id_are_shown() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "title": "x",
            "thumbnail": "https://cdn/t.jpg"
        }))
        .unwrap();
        let s = sections(&product);
        assert_eq!(titles(&s), vec!["", "Gallery", "Description", "Details"]);
        assert_eq!(s[0].lines.last().map(String::as_str), Some("ID: 1"));
        assert_eq!(s[1].lines, vec!["Thumbnail: https://cdn/t.jpg"]);

        let mut with_images = phone();
        with_images.thumbnail = Some("https://cdn/t.jpg".into());
        let s = sections(&with_images);
        assert_eq!(s[1].lines.len(), 3);
        assert!(s[1].lines[0].ends_with("t.jpg"));
    }

    #[test]
    fn odd_field_types_do_not_hide_the_product() {
        let product: Product = serde_json::from_value(json!({
            "id": 2,
            "title": "Kiwi",
            "stock": 4.5,
            "minimumOrderQuantity": "ten",
            "price": "cheap",
            "tags": "fruit"
        }))
        .unwrap();
        assert_eq!(product.title.as_deref(), Some("Kiwi"));
        assert_eq!(product.stock, Some(4.5));
        assert_eq!(product.minimum_order_quantity, None);
        assert_eq!(product.price, None);
        assert_eq!(product.tags, None);
        let s = sections(&product);
        assert!(s[0].lines[3].contains("Stock: 4.5"));
    }

    #[test]
    fn unparseable_review_date_is_shown_raw() {
        assert_eq!(review_date("yesterday"), "yesterday");
    }

    #[test]
    fn not_found_is_terminal_state() {
        let mut view = DetailView::default();
        let request = view.open("404");
        assert_eq!(view.state(), &DetailState::Loading);
        assert!(view.complete(request.seq, Err(CatalogError::NotFound("404".into()))));
        assert_eq!(view.state(), &DetailState::NotFound);
    }

    #[test]
    fn other_failures_degrade_to_not_found() {
        let mut view = DetailView::default();
        let request = view.open("1");
        let err = CatalogError::MalformedResponse("bad".into());
        view.complete(request.seq, Err(err));
        assert_eq!(view.state(), &DetailState::NotFound);
    }

    #[test]
    fn stale_and_closed_responses_are_dropped() {
        let mut view = DetailView::default();
        let first = view.open("1");
        let second = view.open("2");
        assert!(!view.complete(first.seq, Ok(phone())));
        assert_eq!(view.state(), &DetailState::Loading);
        view.close();
        assert!(!view.complete(second.seq, Ok(phone())));
        assert_eq!(view.id(), None);
    }
}
