use url::Url;

fn build_endpoint_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(query);
    url
}

/// Pre-built URLs for the three internal endpoints.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoints {
    stream: Url,
    no_stream: Url,
    models: Url,
}

impl UpstreamEndpoints {
    pub fn new(base: &Url) -> Self {
        Self {
            stream: build_endpoint_url(base, "/v1internal:streamGenerateContent", Some("alt=sse")),
            no_stream: build_endpoint_url(base, "/v1internal:generateContent", None),
            models: build_endpoint_url(base, "/v1internal:fetchAvailableModels", None),
        }
    }

    pub fn select(&self, stream: bool) -> &Url {
        if stream { &self.stream } else { &self.no_stream }
    }

    pub fn models(&self) -> &Url {
        &self.models
    }
}
