//! HTTP client construction shared by every endpoint call.

use reqwest::{Client, RequestBuilder};

use crate::options::TransportOptions;

/// Build a configured HTTP client from transport options.
///
/// This applies timeouts and proxies. An unparseable proxy URL is
/// ignored.
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.proxy {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => tracing::warn!(%proxy_url, error = %e, "ignoring invalid proxy"),
        }
    }

    builder.build()
}

/// Attach the bearer token and any configured headers to a VibeTune request.
///
/// Configured headers are applied last, so they can override the
/// `Authorization` header when a deployment fronts the API with its own auth.
pub fn apply_transport_headers(
    request: RequestBuilder,
    transport_options: &TransportOptions,
) -> RequestBuilder {
    let request = match &transport_options.api_key {
        Some(token) => request.bearer_auth(token.expose_secret()),
        None => request,
    };

    transport_options
        .extra_headers
        .iter()
        .flatten()
        .fold(request, |request, (name, value)| request.header(name, value))
}
