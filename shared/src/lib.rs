//! Capture, preprocessing, inference and comparison logic for the smile
//! simulator, shared by the browser frontend and the relay backend.

pub mod capture;
pub mod comparison;
pub mod error;
pub mod inference;
pub mod media;
pub mod model;
pub mod preprocess;
pub mod retry;

pub use capture::{
    CaptureEvent, CaptureSession, CaptureState, CaptureStateMachine, GenerationTicket, Transition,
    generation_for,
};
pub use comparison::{ContainerBounds, PointerInput, SliderState};
pub use error::{CaptureError, ErrorKind, NextStep};
pub use inference::{
    ErrorResponse, GenerateRequest, GenerateResponse, InferenceClient, InferenceTransport,
    classify_failure,
};
pub use media::{
    CameraDevice, CameraError, CameraOutcome, CameraRequest, MediaAcquisition, MediaError,
    StreamHandle,
};
pub use model::{CameraPermissionState, EncodedImage, GenerationAttempt, GenerationResult, RawImage};
pub use preprocess::ImagePreprocessor;
pub use retry::{RetryPolicy, Sleeper};

/// Longest side, in pixels, of any image sent to the inference service.
pub const MAX_DIMENSION: u32 = 1024;

/// JPEG quality used for every payload the preprocessor produces.
pub const JPEG_QUALITY: u8 = 90;

/// Instruction sent alongside every photo.
pub const EDIT_INSTRUCTION: &str = "Enhance the photo quality. Analyze the image, find the person's face, and fix their teeth naturally, making them straight, white, and perfect like high-end dental veneers. Keep the rest of the image exactly the same.";

/// Path of the relay endpoint served by the backend.
pub const GENERATE_PATH: &str = "/api/generate";

/// File name offered when the user downloads the edited photo.
pub const DOWNLOAD_FILE_NAME: &str = "meu-novo-sorriso-lentes.jpg";
