use std::future::Future;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::detail::{DetailRequest, Product};
use crate::domain::{CatalogError, Message, TvConfig};
use crate::list_state::{PageRequest, Query, RemoteFilter};
use crate::model::Fetch;
use crate::record::Record;

/// One page of records together with the size of the whole result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub total: usize,
}

/// Remote service supplying catalog records.
pub trait CatalogSource: Clone + Send + Sync + 'static {
    fn fetch_page(&self, query: Query) -> impl Future<Output = Result<Page, CatalogError>> + Send;

    fn fetch_product(&self, id: String)
    -> impl Future<Output = Result<Product, CatalogError>> + Send;
}

/// Catalog source speaking the DummyJSON style REST layout.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: Url,
    resource: String,
}

impl HttpCatalog {
    pub fn new(config: &TvConfig) -> Result<Self, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason,
        };
        let base_url = Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical url".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            resource: config.resource.clone(),
        })
    }

    fn resource_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.resource).extend(segments);
        }
        url
    }

    pub fn page_url(&self, query: &Query) -> Url {
        let mut url = match &query.filter {
            Some(RemoteFilter::Search(_)) => self.resource_url(&["search"]),
            Some(RemoteFilter::Category(path)) => self.resource_url(&["category", path.as_str()]),
            None => self.resource_url(&[]),
        };
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(RemoteFilter::Search(text)) = &query.filter {
                pairs.append_pair("q", text);
            }
            pairs
                .append_pair("limit", &query.limit.to_string())
                .append_pair("skip", &query.skip.to_string());
            if let Some(sort) = &query.sort {
                pairs
                    .append_pair("sortBy", &sort.key)
                    .append_pair("order", sort.order.as_str());
            }
        }
        url
    }

    pub fn product_url(&self, id: &str) -> Url {
        self.resource_url(&[id])
    }
}

impl CatalogSource for HttpCatalog {
    async fn fetch_page(&self, query: Query) -> Result<Page, CatalogError> {
        let url = self.page_url(&query);
        debug!("GET {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: Value = response.json().await?;
        parse_page(body, &self.resource)
    }

    async fn fetch_product(&self, id: String) -> Result<Product, CatalogError> {
        let url = self.product_url(&id);
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id));
        }
        let body: Value = response.error_for_status()?.json().await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Decode a list response. Records are read from the `resource` key,
/// falling back to `items`; a missing total counts as zero.
pub fn parse_page(body: Value, resource: &str) -> Result<Page, CatalogError> {
    let Value::Object(mut body) = body else {
        return Err(CatalogError::MalformedResponse(
            "expected a json object".to_string(),
        ));
    };
    let items = body
        .remove(resource)
        .or_else(|| body.remove("items"))
        .ok_or_else(|| CatalogError::MalformedResponse(format!("no '{resource}' array")))?;
    let Value::Array(items) = items else {
        return Err(CatalogError::MalformedResponse(format!(
            "'{resource}' is not an array"
        )));
    };
    let total = body.get("total").and_then(Value::as_u64).unwrap_or(0) as usize;
    Ok(Page {
        records: items.into_iter().map(Record::from).collect(),
        total,
    })
}

/// Runs fetches on the tokio runtime and posts their results back as
/// messages. Starting a fetch aborts the in-flight fetch of the same kind.
pub struct Dispatcher<S> {
    source: S,
    sender: mpsc::Sender<Message>,
    page_task: Option<JoinHandle<()>>,
    detail_task: Option<JoinHandle<()>>,
}

impl<S: CatalogSource> Dispatcher<S> {
    pub fn new(source: S, sender: mpsc::Sender<Message>) -> Self {
        Self {
            source,
            sender,
            page_task: None,
            detail_task: None,
        }
    }

    pub fn dispatch(&mut self, fetch: Fetch) {
        let source = self.source.clone();
        let sender = self.sender.clone();
        match fetch {
            Fetch::Page(PageRequest { seq, query }) => {
                if let Some(task) = self.page_task.take() {
                    trace!("Aborting in-flight page request");
                    task.abort();
                }
                self.page_task = Some(tokio::spawn(async move {
                    let result = source.fetch_page(query).await;
                    let _ = sender.send(Message::PageLoaded { seq, result }).await;
                }));
            }
            Fetch::Detail(DetailRequest { seq, id }) => {
                if let Some(task) = self.detail_task.take() {
                    trace!("Aborting in-flight detail request");
                    task.abort();
                }
                self.detail_task = Some(tokio::spawn(async move {
                    let result = source.fetch_product(id).await;
                    let _ = sender.send(Message::DetailLoaded { seq, result }).await;
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list_state::Sort;
    use crate::table::SortOrder;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn catalog() -> HttpCatalog {
        HttpCatalog::new(&TvConfig::default()).unwrap()
    }

    fn query(limit: usize, skip: usize) -> Query {
        Query {
            limit,
            skip,
            sort: None,
            filter: None,
        }
    }

    #[test]
    fn plain_page_url() {
        let url = catalog().page_url(&query(10, 10));
        assert_eq!(url.as_str(), "https://dummyjson.com/products?limit=10&skip=10");
    }

    #[test]
    fn category_filter_uses_category_path() {
        let mut q = query(10, 0);
        q.filter = Some(RemoteFilter::Category("smartphones".into()));
        let url = catalog().page_url(&q);
        assert_eq!(
            url.as_str(),
            "https://dummyjson.com/products/category/smartphones?limit=10&skip=0"
        );
        assert!(!url.as_str().contains("q="));
    }

    #[test]
    fn search_filter_and_sort() {
        let mut q = query(5, 15);
        q.filter = Some(RemoteFilter::Search("red phone".into()));
        q.sort = Some(Sort {
            key: "price".into(),
            order: SortOrder::Desc,
        });
        let url = catalog().page_url(&q);
        assert_eq!(
            url.as_str(),
            "https://dummyjson.com/products/search?q=red+phone&limit=5&skip=15&sortBy=price&order=desc"
        );
    }

    #[test]
    fn base_url_with_path_and_trailing_slash() {
        let config = TvConfig::default()
            .base_url("http://localhost:8080/api/")
            .resource("records");
        let catalog = HttpCatalog::new(&config).unwrap();
        assert_eq!(
            catalog.product_url("42").as_str(),
            "http://localhost:8080/api/records/42"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = TvConfig::default().base_url("not a url");
        assert!(matches!(
            HttpCatalog::new(&config),
            Err(CatalogError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn parses_resource_array_and_total() {
        let body = json!({"products": [{"id": 1}, {"id": 2}], "total": 194, "skip": 0, "limit": 2});
        let page = parse_page(body, "products").unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, 194);
    }

    #[test]
    fn parses_items_fallback_without_total() {
        let page = parse_page(json!({"items": [{"id": 1}]}), "products").unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn malformed_bodies_are_errors() {
        assert!(parse_page(json!([1, 2]), "products").is_err());
        assert!(parse_page(json!({"total": 3}), "products").is_err());
        assert!(parse_page(json!({"products": "nope"}), "products").is_err());
    }

    #[derive(Clone, Default)]
    struct FakeCatalog {
        queries: Arc<Mutex<Vec<Query>>>,
    }

    impl CatalogSource for FakeCatalog {
        async fn fetch_page(&self, query: Query) -> Result<Page, CatalogError> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(Page {
                records: vec![Record::from(json!({"id": query.skip}))],
                total: 1,
            })
        }

        async fn fetch_product(&self, id: String) -> Result<Product, CatalogError> {
            Err(CatalogError::NotFound(id))
        }
    }

    #[tokio::test]
    async fn dispatcher_posts_results_with_sequence() {
        let (tx, mut rx) = mpsc::channel(8);
        let source = FakeCatalog::default();
        let mut dispatcher = Dispatcher::new(source.clone(), tx);

        dispatcher.dispatch(Fetch::Page(PageRequest {
            seq: 7,
            query: query(10, 20),
        }));
        match rx.recv().await {
            Some(Message::PageLoaded { seq, result }) => {
                assert_eq!(seq, 7);
                assert_eq!(result.unwrap().records[0].id().as_deref(), Some("20"));
            }
            other => panic!("unexpected message {other:?}"),
        }

        dispatcher.dispatch(Fetch::Detail(DetailRequest {
            seq: 1,
            id: "99".into(),
        }));
        match rx.recv().await {
            Some(Message::DetailLoaded { seq, result }) => {
                assert_eq!(seq, 1);
                assert!(matches!(result, Err(CatalogError::NotFound(id)) if id == "99"));
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(source.queries.lock().unwrap().len(), 1);
    }
}
