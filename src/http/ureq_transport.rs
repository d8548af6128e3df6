//! Production transport backed by `ureq`.

use std::time::Duration;

use super::{HttpTransport, RawResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Blocking HTTPS transport. Redirects are surfaced to the fetch layer, which
/// follows them itself so every hop is checked against the allowlist.
pub struct UreqTransport {
    http_client: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .redirects(0)
            .build();
        Self { http_client }
    }

    fn into_raw(response: ureq::Response) -> Result<RawResponse, String> {
        let status = response.status();
        let retry_after = response.header("Retry-After").map(str::to_string);
        let location = response.header("Location").map(str::to_string);
        let body = response
            .into_string()
            .map_err(|error| format!("Failed to read response: {error}"))?;
        Ok(RawResponse {
            status,
            retry_after,
            location,
            body,
        })
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<RawResponse, String> {
        let mut request = self.http_client.get(url);
        for (name, value) in headers {
            request = request.set(name, value);
        }
        match request.call() {
            Ok(response) => Self::into_raw(response),
            Err(ureq::Error::Status(_, response)) => Self::into_raw(response),
            Err(ureq::Error::Transport(transport)) => Err(format!("Request failed: {transport}")),
        }
    }
}
