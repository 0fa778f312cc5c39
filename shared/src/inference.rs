//! Request/response shapes for the image-editing service and the retrying
//! client that drives it.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::model::{EncodedImage, GenerationAttempt, GenerationResult};
use crate::retry::{RetryPolicy, Sleeper};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    /// The photo followed by the edit instruction, in one user turn.
    pub fn edit(image: &EncodedImage, instruction: &str) -> Self {
        Self {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: image.mime_type().to_string(),
                            data: image.to_base64(),
                        }),
                    },
                    Part {
                        text: Some(instruction.to_string()),
                        inline_data: None,
                    },
                ],
            }],
        }
    }

    pub fn image(&self) -> Option<&InlineData> {
        self.contents
            .iter()
            .flat_map(|content| content.parts.iter())
            .find_map(|part| part.inline_data.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    pub fn with_image(image: &EncodedImage) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: image.mime_type().to_string(),
                            data: image.to_base64(),
                        }),
                    }],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
        }
    }

    /// The first embedded image of the first candidate.
    pub fn first_image(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }
}

/// Body of a failed relay call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamError,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a failed HTTP exchange with the service onto the error taxonomy.
pub fn classify_failure(status: u16, body: &str) -> ErrorKind {
    let upstream = serde_json::from_str::<UpstreamErrorBody>(body)
        .ok()
        .map(|parsed| parsed.error);
    let upstream_status = upstream
        .as_ref()
        .and_then(|error| error.status.clone())
        .unwrap_or_default();
    let message = upstream
        .map(|error| error.message)
        .unwrap_or_else(|| body.to_string())
        .to_lowercase();

    if status == 503 || upstream_status == "UNAVAILABLE" || message.contains("overloaded") {
        ErrorKind::ServiceUnavailable
    } else if status == 429
        || upstream_status == "RESOURCE_EXHAUSTED"
        || message.contains("quota")
        || message.contains("rate limit")
    {
        ErrorKind::RateLimited
    } else {
        ErrorKind::UnknownFailure
    }
}

/// One network round trip to the service. Failures come back already
/// classified.
pub trait InferenceTransport {
    type Call: Future<Output = Result<GenerateResponse, ErrorKind>> + 'static;

    fn send(&self, request: GenerateRequest) -> Self::Call;
}

#[derive(Debug, Clone)]
pub struct InferenceClient<T, S> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl<T, S> InferenceClient<T, S>
where
    T: InferenceTransport + Clone + 'static,
    S: Sleeper + Clone + 'static,
{
    pub fn new(transport: T, sleeper: S) -> Self {
        Self {
            transport,
            sleeper,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Asks the service to apply `prompt` to `image`, retrying overloaded
    /// responses per the retry policy. The returned future owns everything it
    /// needs, so it can outlive the caller.
    pub fn generate(
        &self,
        image: EncodedImage,
        prompt: &str,
    ) -> impl Future<Output = GenerationResult> + use<T, S> {
        let transport = self.transport.clone();
        let sleeper = self.sleeper.clone();
        let policy = self.policy;
        let prompt = prompt.to_string();
        let mut attempt = GenerationAttempt::first(image, policy.max_retries);

        async move {
            loop {
                log::info!(
                    "Inference attempt {} of {}",
                    attempt.attempt_number + 1,
                    attempt.max_retries + 1
                );
                let request = GenerateRequest::edit(&attempt.payload, &prompt);
                let kind = match transport.send(request).await {
                    Ok(response) => return interpret(&response),
                    Err(kind) => kind,
                };

                if !policy.should_retry(kind, attempt.attempt_number) {
                    log::warn!(
                        "Inference failed with {} after {} attempt(s)",
                        kind,
                        attempt.attempt_number + 1
                    );
                    return GenerationResult::Failure { kind };
                }

                attempt = attempt.next();
                let delay = policy.delay_before(attempt.attempt_number);
                log::warn!("Service overloaded, retrying in {:?}", delay);
                sleeper.sleep(delay).await;
            }
        }
    }
}

fn interpret(response: &GenerateResponse) -> GenerationResult {
    let Some(inline) = response.first_image() else {
        log::warn!("Service answered without an image");
        return GenerationResult::Failure {
            kind: ErrorKind::EmptyResult,
        };
    };

    match EncodedImage::from_base64(&inline.mime_type, &inline.data) {
        Ok(after_image) => GenerationResult::Success { after_image },
        Err(err) => {
            log::error!("Service returned an unreadable image: {}", err);
            GenerationResult::Failure {
                kind: ErrorKind::UnknownFailure,
            }
        }
    }
}
