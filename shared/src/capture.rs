//! The capture-to-result cycle.
//!
//! ```text
//! AwaitingDeviceChoice --camera granted--> Streaming --capture--> Captured
//! AwaitingDeviceChoice / Streaming / Error --file--> Captured
//! Captured / Error(with photo) --generate--> Generating --ok--> Complete
//!                                                     \--fail--> Error(kind)
//! any --retake--> AwaitingDeviceChoice (camera requested again)
//! ```
//!
//! Suspending steps (the permission prompt and the inference call) are split
//! into a `begin`/`finish` pair so that the host can await them without
//! holding the machine. Every reset bumps the session epoch; a `finish` that
//! carries an older epoch is discarded.

use std::future::Future;

use crate::EDIT_INSTRUCTION;
use crate::error::{CaptureError, ErrorKind, NextStep};
use crate::inference::{InferenceClient, InferenceTransport};
use crate::media::{CameraDevice, CameraOutcome, CameraRequest, MediaAcquisition, MediaError};
use crate::model::{CameraPermissionState, EncodedImage, GenerationAttempt, GenerationResult, RawImage};
use crate::preprocess::ImagePreprocessor;
use crate::retry::{RetryPolicy, Sleeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    AwaitingDeviceChoice,
    Streaming,
    Captured,
    Generating,
    Complete,
    Error(ErrorKind),
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::AwaitingDeviceChoice => "awaiting device choice",
            CaptureState::Streaming => "streaming",
            CaptureState::Captured => "captured",
            CaptureState::Generating => "generating",
            CaptureState::Complete => "complete",
            CaptureState::Error(_) => "showing an error",
        }
    }
}

/// Aggregate state of one capture-to-result cycle.
#[derive(Debug, Clone, Default)]
pub struct CaptureSession {
    epoch: u64,
    state: CaptureState,
    permission: CameraPermissionState,
    captured: Option<EncodedImage>,
    in_flight: Option<GenerationAttempt>,
    result: Option<GenerationResult>,
}

impl CaptureSession {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn permission(&self) -> CameraPermissionState {
        self.permission
    }

    pub fn captured(&self) -> Option<&EncodedImage> {
        self.captured.as_ref()
    }

    pub fn in_flight(&self) -> Option<&GenerationAttempt> {
        self.in_flight.as_ref()
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        self.result.as_ref()
    }

    fn reset(&mut self) {
        *self = CaptureSession {
            epoch: self.epoch + 1,
            permission: self.permission,
            ..CaptureSession::default()
        };
    }
}

/// Emitted to the host exactly once per successful session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Completed {
        before: EncodedImage,
        after: EncodedImage,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The outcome belonged to a session that has since been reset.
    Discarded,
    Completed(CaptureEvent),
}

/// Proof that a generation was started, tied to the session epoch.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    epoch: u64,
    payload: EncodedImage,
}

impl GenerationTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn payload(&self) -> &EncodedImage {
        &self.payload
    }
}

pub struct CaptureStateMachine<D: CameraDevice> {
    media: MediaAcquisition<D>,
    preprocessor: ImagePreprocessor,
    session: CaptureSession,
}

impl<D: CameraDevice> CaptureStateMachine<D> {
    pub fn new(device: D) -> Self {
        Self::with_preprocessor(device, ImagePreprocessor::default())
    }

    pub fn with_preprocessor(device: D, preprocessor: ImagePreprocessor) -> Self {
        Self {
            media: MediaAcquisition::new(device),
            preprocessor,
            session: CaptureSession::default(),
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn state(&self) -> CaptureState {
        self.session.state
    }

    pub fn media(&self) -> &MediaAcquisition<D> {
        &self.media
    }

    pub fn is_streaming(&self) -> bool {
        self.media.is_streaming()
    }

    pub fn is_requesting_camera(&self) -> bool {
        self.media.is_requesting()
    }

    /// The (before, after) pair once the session is complete.
    pub fn completed_pair(&self) -> Option<(&EncodedImage, &EncodedImage)> {
        match (&self.session.captured, &self.session.result) {
            (Some(before), Some(GenerationResult::Success { after_image })) => {
                Some((before, after_image))
            }
            _ => None,
        }
    }

    pub fn status_message(&self) -> &'static str {
        match self.session.state {
            CaptureState::AwaitingDeviceChoice if self.media.is_requesting() => {
                "Aguardando permissão da câmera..."
            }
            CaptureState::AwaitingDeviceChoice => "Use a câmera ou envie uma foto do seu sorriso.",
            CaptureState::Streaming => "Posicione seu rosto aqui e sorria",
            CaptureState::Captured => "Foto pronta. Veja como fica o seu novo sorriso.",
            CaptureState::Generating => "Criando Lentes...",
            CaptureState::Complete => "Resultado da Simulação",
            CaptureState::Error(kind) => kind.message(),
        }
    }

    pub fn next_steps(&self) -> &'static [NextStep] {
        match self.session.state {
            CaptureState::AwaitingDeviceChoice | CaptureState::Streaming => &[NextStep::Upload],
            CaptureState::Captured | CaptureState::Complete => &[NextStep::Retake],
            CaptureState::Generating => &[],
            CaptureState::Error(kind) if self.session.captured.is_none() => {
                if kind.is_device_failure() {
                    kind.next_steps()
                } else {
                    &[NextStep::Upload, NextStep::Retake]
                }
            }
            CaptureState::Error(kind) => kind.next_steps(),
        }
    }

    /// Asks for the camera. Allowed before anything was captured.
    pub fn request_camera(&mut self) -> Result<CameraRequest<D::Open>, CaptureError> {
        match self.session.state {
            CaptureState::AwaitingDeviceChoice => {}
            CaptureState::Error(_) if self.session.captured.is_none() => {
                self.session.state = CaptureState::AwaitingDeviceChoice;
            }
            _ => return Err(self.invalid("request the camera")),
        }

        let request = self.media.request_camera();
        self.sync();
        Ok(request)
    }

    pub fn finish_camera_request(&mut self, outcome: CameraOutcome<D::Stream>) -> Transition {
        let result = self.media.finish_camera_request(outcome);
        self.sync();

        match result {
            Ok(()) => {
                self.session.state = CaptureState::Streaming;
                log::debug!("Capture session {} streaming", self.session.epoch);
                Transition::Applied
            }
            Err(MediaError::Superseded) => Transition::Discarded,
            Err(err) => {
                self.session.state = CaptureState::Error(err.kind());
                Transition::Applied
            }
        }
    }

    /// Takes the still from the live preview.
    pub fn capture(&mut self) -> Result<(), CaptureError> {
        if self.session.state != CaptureState::Streaming {
            return Err(self.invalid("capture"));
        }

        let frame = self.media.capture_frame();
        self.sync();
        match frame {
            Ok(raw) => self.accept(raw),
            Err(err) => {
                self.session.state = CaptureState::Error(err.kind());
                Err(err.into())
            }
        }
    }

    /// Uses a user-chosen file instead of the camera.
    pub fn load_from_file(&mut self, bytes: &[u8]) -> Result<(), CaptureError> {
        match self.session.state {
            CaptureState::AwaitingDeviceChoice | CaptureState::Streaming | CaptureState::Error(_) => {}
            _ => return Err(self.invalid("load a file")),
        }

        let loaded = self.media.load_from_file(bytes);
        self.sync();
        self.session.captured = None;
        self.session.result = None;
        match loaded {
            Ok(raw) => self.accept(raw),
            Err(err) => {
                self.session.state = CaptureState::Error(err.kind());
                Err(err.into())
            }
        }
    }

    /// Loads a file whose read started in session `epoch`. A read that
    /// outlived a retake is discarded and leaves the current session alone.
    pub fn finish_file_load(
        &mut self,
        epoch: u64,
        bytes: &[u8],
    ) -> Result<Transition, CaptureError> {
        if epoch != self.session.epoch {
            log::info!(
                "Discarding file read for stale session {} (current {})",
                epoch,
                self.session.epoch
            );
            return Ok(Transition::Discarded);
        }

        self.load_from_file(bytes).map(|()| Transition::Applied)
    }

    /// Moves to `Generating` and hands out the payload to send. `policy` is
    /// the inference client's. The session copy of the attempt only marks
    /// the request as outstanding, the client counts its own retries.
    pub fn begin_generate(
        &mut self,
        policy: RetryPolicy,
    ) -> Result<GenerationTicket, CaptureError> {
        match self.session.state {
            CaptureState::Generating => return Err(CaptureError::AlreadyGenerating),
            CaptureState::Captured | CaptureState::Error(_) => {}
            _ => return Err(self.invalid("generate")),
        }
        let Some(payload) = self.session.captured.clone() else {
            return Err(self.invalid("generate"));
        };

        self.session.in_flight =
            Some(GenerationAttempt::first(payload.clone(), policy.max_retries));
        self.session.result = None;
        self.session.state = CaptureState::Generating;
        log::debug!("Capture session {} generating", self.session.epoch);

        Ok(GenerationTicket {
            epoch: self.session.epoch,
            payload,
        })
    }

    pub fn finish_generate(
        &mut self,
        ticket: GenerationTicket,
        result: GenerationResult,
    ) -> Transition {
        if ticket.epoch != self.session.epoch || self.session.state != CaptureState::Generating {
            log::info!(
                "Discarding generation result for stale session {} (current {})",
                ticket.epoch,
                self.session.epoch
            );
            return Transition::Discarded;
        }

        self.session.in_flight = None;
        let transition = match &result {
            GenerationResult::Success { after_image } => {
                self.session.state = CaptureState::Complete;
                log::info!("Capture session {} complete", self.session.epoch);
                Transition::Completed(CaptureEvent::Completed {
                    before: ticket.payload,
                    after: after_image.clone(),
                })
            }
            GenerationResult::Failure { kind } => {
                self.session.state = CaptureState::Error(*kind);
                Transition::Applied
            }
        };
        self.session.result = Some(result);
        transition
    }

    /// Throws away the photo and any result and asks for the camera again.
    /// A generation still in flight finishes in the background and is
    /// discarded.
    pub fn retake(&mut self) -> CameraRequest<D::Open> {
        self.session.reset();
        let request = self.media.retake();
        self.sync();
        log::debug!("Capture session {} started by retake", self.session.epoch);
        request
    }

    /// Releases the camera and starts over without asking for it.
    pub fn reset(&mut self) {
        self.media.teardown();
        self.session.reset();
        self.sync();
    }

    /// Runs both halves of a camera request.
    pub async fn run_camera_request(&mut self) -> Result<Transition, CaptureError> {
        let outcome = self.request_camera()?.resolve().await;
        Ok(self.finish_camera_request(outcome))
    }

    /// Runs both halves of a retake.
    pub async fn run_retake(&mut self) -> Transition {
        let outcome = self.retake().resolve().await;
        self.finish_camera_request(outcome)
    }

    /// Runs both halves of a generation.
    pub async fn run_generate<T, S>(
        &mut self,
        client: &InferenceClient<T, S>,
    ) -> Result<Transition, CaptureError>
    where
        T: InferenceTransport + Clone + 'static,
        S: Sleeper + Clone + 'static,
    {
        let ticket = self.begin_generate(client.policy())?;
        let result = generation_for(&ticket, client).await;
        Ok(self.finish_generate(ticket, result))
    }

    fn accept(&mut self, raw: RawImage) -> Result<(), CaptureError> {
        match self.preprocessor.resize(raw) {
            Ok(encoded) => {
                log::debug!(
                    "Captured {}x{} {}",
                    encoded.width(),
                    encoded.height(),
                    encoded.mime_type()
                );
                self.session.captured = Some(encoded);
                self.session.state = CaptureState::Captured;
                debug_assert!(!self.media.is_streaming());
                Ok(())
            }
            Err(err) => {
                self.session.state = CaptureState::Error(ErrorKind::UnknownFailure);
                Err(err.into())
            }
        }
    }

    fn sync(&mut self) {
        self.session.permission = self.media.permission();
    }

    fn invalid(&self, action: &'static str) -> CaptureError {
        CaptureError::InvalidTransition {
            state: self.session.state.name(),
            action,
        }
    }
}

/// The inference call for a ticket, detached from the machine so it can be
/// spawned.
pub fn generation_for<T, S>(
    ticket: &GenerationTicket,
    client: &InferenceClient<T, S>,
) -> impl Future<Output = GenerationResult> + use<T, S>
where
    T: InferenceTransport + Clone + 'static,
    S: Sleeper + Clone + 'static,
{
    client.generate(ticket.payload.clone(), EDIT_INSTRUCTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::cell::Cell;
    use std::future::{Ready, ready};
    use std::io::Cursor;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Camera {
        deny: bool,
        blind: bool,
        live: Rc<Cell<i32>>,
    }

    impl CameraDevice for Camera {
        type Stream = ();
        type Open = Ready<Result<(), crate::media::CameraError>>;

        fn open(&self) -> Self::Open {
            if self.deny {
                return ready(Err(crate::media::CameraError::PermissionDenied));
            }
            self.live.set(self.live.get() + 1);
            ready(Ok(()))
        }

        fn grab_frame(&self, _stream: &()) -> Result<RawImage, crate::media::CameraError> {
            if self.blind {
                return Err(crate::media::CameraError::Unavailable("no frame".into()));
            }
            Ok(RawImage::from(RgbaImage::from_pixel(8, 6, Rgba([1, 2, 3, 255]))))
        }

        fn stop(&self, _stream: ()) {
            self.live.set(self.live.get() - 1);
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(width, height, Rgba([9, 9, 9, 255]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn after() -> EncodedImage {
        EncodedImage::new(vec![0xff, 0xd8], "image/jpeg", 8, 6)
    }

    fn streaming(camera: Camera) -> CaptureStateMachine<Camera> {
        let mut machine = CaptureStateMachine::new(camera);
        block_on(machine.run_camera_request()).unwrap();
        machine
    }

    #[test]
    fn camera_then_capture() {
        let camera = Camera::default();
        let mut machine = streaming(camera.clone());
        assert_eq!(machine.state(), CaptureState::Streaming);
        assert_eq!(machine.session().permission(), CameraPermissionState::Granted);
        assert_eq!(camera.live.get(), 1);

        machine.capture().unwrap();
        assert_eq!(machine.state(), CaptureState::Captured);
        assert_eq!(camera.live.get(), 0);
        let captured = machine.session().captured().unwrap();
        assert_eq!((captured.width(), captured.height()), (8, 6));
    }

    #[test]
    fn denied_camera_falls_back_to_upload() {
        let camera = Camera {
            deny: true,
            ..Camera::default()
        };
        let mut machine = CaptureStateMachine::new(camera);
        block_on(machine.run_camera_request()).unwrap();

        assert_eq!(machine.state(), CaptureState::Error(ErrorKind::PermissionDenied));
        assert!(machine.next_steps().contains(&NextStep::Upload));

        machine.load_from_file(&png(20, 10)).unwrap();
        assert_eq!(machine.state(), CaptureState::Captured);
    }

    #[test]
    fn file_while_streaming_stops_camera() {
        let camera = Camera::default();
        let mut machine = streaming(camera.clone());

        machine.load_from_file(&png(4, 4)).unwrap();
        assert_eq!(camera.live.get(), 0);
        assert!(!machine.is_streaming());
        assert!(machine.session().captured().is_some());
    }

    #[test]
    fn unreadable_file_shows_error_without_photo() {
        let mut machine = CaptureStateMachine::new(Camera::default());
        assert!(machine.load_from_file(b"nope").is_err());
        assert_eq!(machine.state(), CaptureState::Error(ErrorKind::UnknownFailure));
        assert!(machine.session().captured().is_none());
        assert!(machine.next_steps().contains(&NextStep::Upload));
    }

    #[test]
    fn second_generate_is_rejected_while_in_flight() {
        let mut machine = CaptureStateMachine::new(Camera::default());
        machine.load_from_file(&png(4, 4)).unwrap();

        let _ticket = machine.begin_generate(RetryPolicy::default()).unwrap();
        assert!(machine.session().in_flight().is_some());
        assert!(matches!(
            machine.begin_generate(RetryPolicy::default()),
            Err(CaptureError::AlreadyGenerating)
        ));
    }

    #[test]
    fn success_completes_once() {
        let mut machine = CaptureStateMachine::new(Camera::default());
        machine.load_from_file(&png(4, 4)).unwrap();

        let ticket = machine.begin_generate(RetryPolicy::default()).unwrap();
        let before = ticket.payload().clone();
        let transition = machine.finish_generate(
            ticket.clone(),
            GenerationResult::Success {
                after_image: after(),
            },
        );
        assert_eq!(
            transition,
            Transition::Completed(CaptureEvent::Completed {
                before: before.clone(),
                after: after(),
            })
        );
        assert_eq!(machine.completed_pair(), Some((&before, &after())));

        // A replayed completion does not emit again.
        let replay = machine.finish_generate(
            ticket,
            GenerationResult::Success {
                after_image: after(),
            },
        );
        assert_eq!(replay, Transition::Discarded);
        assert!(machine.begin_generate(RetryPolicy::default()).is_err());
    }

    #[test]
    fn failure_keeps_photo_for_retry() {
        let mut machine = CaptureStateMachine::new(Camera::default());
        machine.load_from_file(&png(4, 4)).unwrap();

        let ticket = machine.begin_generate(RetryPolicy::default()).unwrap();
        machine.finish_generate(
            ticket,
            GenerationResult::Failure {
                kind: ErrorKind::RateLimited,
            },
        );
        assert_eq!(machine.state(), CaptureState::Error(ErrorKind::RateLimited));
        assert!(machine.next_steps().contains(&NextStep::Retry));

        let retry = machine.begin_generate(RetryPolicy::default()).unwrap();
        assert_eq!(machine.state(), CaptureState::Generating);
        assert_eq!(Some(retry.payload()), machine.session().captured());
    }

    #[test]
    fn retake_discards_stale_result() {
        let camera = Camera::default();
        let mut machine = CaptureStateMachine::new(camera.clone());
        machine.load_from_file(&png(4, 4)).unwrap();
        let ticket = machine.begin_generate(RetryPolicy::default()).unwrap();

        block_on(machine.run_retake());
        assert_eq!(machine.state(), CaptureState::Streaming);
        assert!(machine.session().captured().is_none());

        let transition = machine.finish_generate(
            ticket,
            GenerationResult::Success {
                after_image: after(),
            },
        );
        assert_eq!(transition, Transition::Discarded);
        assert_eq!(machine.state(), CaptureState::Streaming);
        assert_eq!(camera.live.get(), 1);
    }

    #[test]
    fn complete_is_not_reachable_without_generating() {
        let mut machine = CaptureStateMachine::new(Camera::default());
        let forged = GenerationTicket {
            epoch: machine.session().epoch(),
            payload: after(),
        };
        let transition = machine.finish_generate(
            forged,
            GenerationResult::Success {
                after_image: after(),
            },
        );
        assert_eq!(transition, Transition::Discarded);
        assert_eq!(machine.state(), CaptureState::AwaitingDeviceChoice);
    }

    #[test]
    fn failed_frame_grab_releases_camera() {
        let camera = Camera {
            blind: true,
            ..Camera::default()
        };
        let mut machine = streaming(camera.clone());
        assert_eq!(camera.live.get(), 1);

        assert!(machine.capture().is_err());
        assert_eq!(camera.live.get(), 0);
        assert!(!machine.is_streaming());
        assert_eq!(machine.state(), CaptureState::Error(ErrorKind::DeviceUnavailable));
        assert!(machine.session().captured().is_none());

        let transition = block_on(machine.run_retake());
        assert_eq!(transition, Transition::Applied);
        assert_eq!(machine.state(), CaptureState::Streaming);
        assert_eq!(camera.live.get(), 1);
    }

    #[test]
    fn file_read_from_before_retake_is_discarded() {
        let camera = Camera::default();
        let mut machine = CaptureStateMachine::new(camera.clone());
        let started_in = machine.session().epoch();

        block_on(machine.run_retake());
        assert_eq!(machine.state(), CaptureState::Streaming);

        let transition = machine.finish_file_load(started_in, &png(4, 4)).unwrap();
        assert_eq!(transition, Transition::Discarded);
        assert_eq!(machine.state(), CaptureState::Streaming);
        assert!(machine.session().captured().is_none());
        assert_eq!(camera.live.get(), 1);

        let current = machine.session().epoch();
        let transition = machine.finish_file_load(current, &png(4, 4)).unwrap();
        assert_eq!(transition, Transition::Applied);
        assert_eq!(machine.state(), CaptureState::Captured);
        assert_eq!(camera.live.get(), 0);
    }

    #[test]
    fn outstanding_attempt_follows_client_policy() {
        let mut machine = CaptureStateMachine::new(Camera::default());
        machine.load_from_file(&png(4, 4)).unwrap();

        let policy = RetryPolicy {
            max_retries: 5,
            ..RetryPolicy::default()
        };
        machine.begin_generate(policy).unwrap();
        let attempt = machine.session().in_flight().unwrap();
        assert_eq!(attempt.max_retries, 5);
        assert_eq!(attempt.attempt_number, 0);
    }

    #[test]
    fn capture_requires_stream() {
        let mut machine = CaptureStateMachine::new(Camera::default());
        assert!(matches!(
            machine.capture(),
            Err(CaptureError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn reset_releases_camera() {
        let camera = Camera::default();
        let mut machine = streaming(camera.clone());
        machine.reset();
        assert_eq!(camera.live.get(), 0);
        assert_eq!(machine.state(), CaptureState::AwaitingDeviceChoice);
    }
}
