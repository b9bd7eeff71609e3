//! HTTP implementation of the WS-Management transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::document::{Document, Element};
use super::envelope;
use super::{Properties, SelectorSet, Transport};
use crate::config::EndpointConfig;
use crate::error::{DracError, Result};
use crate::uris::{Resource, NS_SOAP_ENV, NS_WSMAN, NS_WS_ENUMERATION};

/// Items requested per `Enumerate`/`Pull` round trip.
const MAX_ELEMENTS: u32 = 100;

/// Upper bound on `Enumerate` plus `Pull` responses merged into one result.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Content type for SOAP 1.2 requests.
const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

/// WS-Management client for a single DRAC.
#[derive(Clone)]
pub struct WsmanClient {
    /// HTTP client.
    client: Client,
    /// Full endpoint URL, also sent as `wsa:To`.
    endpoint: String,
    username: String,
    password: String,
    max_pages: usize,
}

impl WsmanClient {
    /// Create a client for the given endpoint.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.url(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    /// Fail an enumeration that has not reached its end after `max_pages`
    /// responses.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Endpoint URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST an envelope and parse the response.
    async fn post(&self, payload: String) -> Result<Document> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = fault_reason(&text).unwrap_or(text);
            return Err(DracError::Request {
                status: status.as_u16(),
                message,
            });
        }

        let doc = Document::parse(&text)?;
        if let Some(fault) = doc.find(NS_SOAP_ENV, "Fault") {
            return Err(DracError::Request {
                status: status.as_u16(),
                message: fault_text(fault),
            });
        }

        Ok(doc)
    }
}

#[async_trait]
impl Transport for WsmanClient {
    async fn enumerate(&self, resource: Resource, filter_query: Option<&str>) -> Result<Document> {
        let uri = resource.uri();
        debug!(resource = %resource, filter = ?filter_query, "Enumerate request");

        let payload = envelope::enumerate(&self.endpoint, &uri, filter_query, MAX_ELEMENTS);
        let mut doc = self.post(payload).await?;
        let mut context = continuation(&doc);

        let mut pages = 1;
        while let Some(ctx) = context {
            if pages >= self.max_pages {
                return Err(DracError::InvalidResponse(format!(
                    "enumeration of {resource} did not end after {pages} pages"
                )));
            }
            debug!(resource = %resource, page = pages + 1, "Pull request");
            let payload = envelope::pull(&self.endpoint, &uri, &ctx, MAX_ELEMENTS);
            let mut page = self.post(payload).await?;
            context = continuation(&page);

            let items = page
                .root_mut()
                .find_mut(NS_WS_ENUMERATION, "Items")
                .map(Element::take_children)
                .unwrap_or_default();
            append_items(&mut doc, items);
            pages += 1;
        }

        strip_context(&mut doc);
        Ok(doc)
    }

    async fn invoke(
        &self,
        resource: Resource,
        method: &str,
        selectors: &SelectorSet,
        properties: &Properties,
    ) -> Result<Document> {
        debug!(resource = %resource, method = %method, "Invoke request");

        let payload = envelope::invoke(&self.endpoint, &resource.uri(), method, selectors, properties);
        self.post(payload).await
    }
}

/// Enumeration context to pull next, `None` once the sequence is complete.
fn continuation(doc: &Document) -> Option<String> {
    let ended = doc.find(NS_WSMAN, "EndOfSequence").is_some()
        || doc.find(NS_WS_ENUMERATION, "EndOfSequence").is_some();
    if ended {
        return None;
    }

    doc.find(NS_WS_ENUMERATION, "EnumerationContext")
        .and_then(Element::text)
        .map(str::trim)
        .filter(|ctx| !ctx.is_empty())
        .map(str::to_string)
}

/// Append pulled items to the `Items` element of the first response.
fn append_items(doc: &mut Document, items: Vec<Element>) {
    if items.is_empty() {
        return;
    }

    if doc.find(NS_WSMAN, "Items").is_none() {
        let container = Element::new(Some(NS_WSMAN), "Items");
        match doc.root_mut().find_mut(NS_WS_ENUMERATION, "EnumerateResponse") {
            Some(response) => response.push_child(container),
            None => {
                warn!("Enumerate response has no EnumerateResponse element");
                doc.root_mut().push_child(container);
            }
        }
    }

    if let Some(container) = doc.root_mut().find_mut(NS_WSMAN, "Items") {
        for item in items {
            container.push_child(item);
        }
    }
}

/// Drop the enumeration context once all pages were merged.
fn strip_context(doc: &mut Document) {
    if let Some(response) = doc.root_mut().find_mut(NS_WS_ENUMERATION, "EnumerateResponse") {
        let children = response.take_children();
        for child in children {
            if !child.is(NS_WS_ENUMERATION, "EnumerationContext") {
                response.push_child(child);
            }
        }
    }
}

fn fault_reason(body: &str) -> Option<String> {
    let doc = Document::parse(body).ok()?;
    doc.find(NS_SOAP_ENV, "Fault").map(fault_text)
}

fn fault_text(fault: &Element) -> String {
    let reason = fault
        .find(NS_SOAP_ENV, "Reason")
        .and_then(|r| r.find(NS_SOAP_ENV, "Text"))
        .and_then(Element::text);
    let detail = fault
        .find(NS_WSMAN, "FaultDetail")
        .and_then(Element::text);

    match (reason, detail) {
        (Some(reason), Some(detail)) => format!("{reason} ({detail})"),
        (Some(reason), None) => reason.to_string(),
        (None, Some(detail)) => detail.to_string(),
        (None, None) => "SOAP fault without reason".to_string(),
    }
}
