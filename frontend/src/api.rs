use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use shared::{
    ErrorKind, ErrorResponse, GENERATE_PATH, GenerateRequest, GenerateResponse,
    InferenceTransport, Sleeper, classify_failure,
};

/// Sends edit requests to the backend relay.
#[derive(Clone)]
pub struct RelayTransport {
    endpoint: Rc<str>,
}

impl Default for RelayTransport {
    fn default() -> Self {
        Self {
            endpoint: Rc::from(GENERATE_PATH),
        }
    }
}

impl InferenceTransport for RelayTransport {
    type Call = Pin<Box<dyn Future<Output = Result<GenerateResponse, ErrorKind>>>>;

    fn send(&self, request: GenerateRequest) -> Self::Call {
        Box::pin(post_generate(self.endpoint.clone(), request))
    }
}

async fn post_generate(
    endpoint: Rc<str>,
    request: GenerateRequest,
) -> Result<GenerateResponse, ErrorKind> {
    let request = Request::post(&endpoint).json(&request).map_err(|e| {
        log::error!("Failed to build relay request: {}", e);
        ErrorKind::UnknownFailure
    })?;

    let response = request.send().await.map_err(|e| {
        log::error!("Network error: {}", e);
        ErrorKind::UnknownFailure
    })?;

    if response.ok() {
        return response.json::<GenerateResponse>().await.map_err(|e| {
            log::error!("Failed to parse relay response: {}", e);
            ErrorKind::UnknownFailure
        });
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let kind = failure_kind(status, &body);
    log::warn!("Relay answered {} ({})", status, kind);
    Err(kind)
}

/// The relay reports its own classification; anything else in front of it
/// (a proxy, a dev server) is classified from the raw status and body.
fn failure_kind(status: u16, body: &str) -> ErrorKind {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => error.kind,
        Err(_) => classify_failure(status, body),
    }
}

#[derive(Clone, Copy, Default)]
pub struct TimerSleeper;

impl Sleeper for TimerSleeper {
    type Sleep = TimeoutFuture;

    fn sleep(&self, duration: Duration) -> Self::Sleep {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        TimeoutFuture::new(millis)
    }
}
