//! HTTP seam for webhook delivery

use std::time::Duration;

use ureq::Agent;

use super::DispatchError;

/// Sends one POST and reports the response status
///
/// Any HTTP response, 2xx or not, is `Ok(status)`. `Err` is reserved for
/// requests that never got an answer.
pub trait WebhookTransport: Send + Sync {
    fn post(&self, url: &str, headers: &[(String, String)], body: &[u8])
    -> Result<u16, DispatchError>;
}

/// Blocking HTTP client with a global per-request timeout
pub struct HttpTransport {
    agent: Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl WebhookTransport for HttpTransport {
    fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<u16, DispatchError> {
        let mut request = self.agent.post(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send(body)?;
        Ok(response.status().as_u16())
    }
}
