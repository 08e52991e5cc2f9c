use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use tracing::warn;

/// HTTP access to one embed host, with host-specific default headers.
///
/// Each extractor owns one `HostClient`; the underlying `reqwest::Client` (and
/// its connection pool) is shared.
///
/// ```rust,ignore
/// let mut client = HostClient::new("MixDrop", reqwest::Client::new());
/// client.add_header(reqwest::header::REFERER, "https://mixdrop.co/");
///
/// let body = client.get("https://mixdrop.co/e/abc").send().await?.text().await?;
/// ```
#[derive(Debug, Clone)]
pub struct HostClient {
    // name of the host, e.g., "UpCloud", "MixDrop"...
    pub name: String,
    pub client: Client,
    headers: HeaderMap,
}

impl HostClient {
    pub fn new(name: impl Into<String>, client: Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );

        Self {
            name: name.into(),
            client,
            headers,
        }
    }

    /// Adds or replaces a header sent with every request. Values that are not
    /// valid header values are skipped with a warning.
    pub fn add_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(e) => warn!(host = %self.name, header = %name, error = %e, "invalid header value"),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Request with the host headers pre-configured.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .headers(self.headers.clone())
    }

    /// Like [`get`](Self::get), with caller headers layered on top of the
    /// host headers.
    pub fn get_with(&self, url: &str, extra: &HeaderMap) -> RequestBuilder {
        self.get(url).headers(extra.clone())
    }
}
