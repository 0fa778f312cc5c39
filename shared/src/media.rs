//! Camera and file acquisition.
//!
//! [`MediaAcquisition`] is the only owner of the live camera stream. Opening
//! the camera suspends on the permission prompt, so a request is split in
//! two: [`MediaAcquisition::request_camera`] hands back a [`CameraRequest`]
//! the host awaits, and [`MediaAcquisition::finish_camera_request`] applies
//! its outcome. Outcomes from superseded requests are stopped on arrival.

use std::future::Future;

use crate::error::ErrorKind;
use crate::model::{CameraPermissionState, RawImage};
use crate::preprocess::ImagePreprocessor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

impl CameraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::PermissionDenied => ErrorKind::PermissionDenied,
            CameraError::Unavailable(_) => ErrorKind::DeviceUnavailable,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("no live camera stream")]
    NoStream,
    #[error("camera request was superseded")]
    Superseded,
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::Camera(err) => err.kind(),
            MediaError::NoStream => ErrorKind::DeviceUnavailable,
            MediaError::Superseded | MediaError::Decode(_) => ErrorKind::UnknownFailure,
        }
    }
}

/// Platform camera access.
pub trait CameraDevice {
    type Stream;
    /// Resolves once the user has answered the permission prompt.
    type Open: Future<Output = Result<Self::Stream, CameraError>> + 'static;

    fn open(&self) -> Self::Open;

    /// Copies the current frame as it comes off the sensor.
    fn grab_frame(&self, stream: &Self::Stream) -> Result<RawImage, CameraError>;

    fn stop(&self, stream: Self::Stream);
}

/// Exclusive ownership of a live camera stream.
#[derive(Debug)]
pub struct StreamHandle<S> {
    id: u64,
    stream: S,
}

impl<S> StreamHandle<S> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }
}

/// A pending permission prompt.
pub struct CameraRequest<F> {
    ticket: u64,
    open: F,
}

impl<F, S> CameraRequest<F>
where
    F: Future<Output = Result<S, CameraError>>,
{
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub async fn resolve(self) -> CameraOutcome<S> {
        CameraOutcome {
            ticket: self.ticket,
            result: self.open.await,
        }
    }
}

pub struct CameraOutcome<S> {
    ticket: u64,
    result: Result<S, CameraError>,
}

impl<S> CameraOutcome<S> {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn is_granted(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct MediaAcquisition<D: CameraDevice> {
    device: D,
    permission: CameraPermissionState,
    stream: Option<StreamHandle<D::Stream>>,
    latest_request: u64,
    streams_opened: u64,
}

impl<D: CameraDevice> MediaAcquisition<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            permission: CameraPermissionState::NotRequested,
            stream: None,
            latest_request: 0,
            streams_opened: 0,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn permission(&self) -> CameraPermissionState {
        self.permission
    }

    pub fn stream(&self) -> Option<&StreamHandle<D::Stream>> {
        self.stream.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_requesting(&self) -> bool {
        self.permission == CameraPermissionState::Requesting
    }

    /// Starts a permission prompt. Any live stream is stopped first and any
    /// earlier pending request becomes stale.
    pub fn request_camera(&mut self) -> CameraRequest<D::Open> {
        self.release();
        self.latest_request += 1;
        self.permission = CameraPermissionState::Requesting;
        log::debug!("Camera request #{} started", self.latest_request);

        CameraRequest {
            ticket: self.latest_request,
            open: self.device.open(),
        }
    }

    pub fn finish_camera_request(
        &mut self,
        outcome: CameraOutcome<D::Stream>,
    ) -> Result<(), MediaError> {
        if outcome.ticket != self.latest_request || !self.is_requesting() {
            log::debug!("Dropping outcome of stale camera request #{}", outcome.ticket);
            if let Ok(stream) = outcome.result {
                self.device.stop(stream);
            }
            return Err(MediaError::Superseded);
        }

        match outcome.result {
            Ok(stream) => {
                self.streams_opened += 1;
                self.stream = Some(StreamHandle {
                    id: self.streams_opened,
                    stream,
                });
                self.permission = CameraPermissionState::Granted;
                log::info!("Camera stream #{} live", self.streams_opened);
                Ok(())
            }
            Err(err) => {
                self.permission = match err {
                    CameraError::PermissionDenied => CameraPermissionState::Denied,
                    CameraError::Unavailable(_) => CameraPermissionState::Unavailable,
                };
                log::warn!("Camera request failed: {}", err);
                Err(err.into())
            }
        }
    }

    /// Takes a still from the live stream and releases the camera. The frame
    /// is mirrored left to right before it is returned.
    pub fn capture_frame(&mut self) -> Result<RawImage, MediaError> {
        let handle = self.stream.take().ok_or(MediaError::NoStream)?;
        let frame = self.device.grab_frame(&handle.stream);
        self.device.stop(handle.stream);
        log::debug!("Camera stream #{} released after capture", handle.id);

        Ok(ImagePreprocessor::flip_horizontal(frame?))
    }

    /// Decodes a user-chosen file. Live and pending camera access is dropped
    /// first.
    pub fn load_from_file(&mut self, bytes: &[u8]) -> Result<RawImage, MediaError> {
        self.cancel_pending();
        self.release();
        Ok(ImagePreprocessor::decode(bytes)?)
    }

    pub fn retake(&mut self) -> CameraRequest<D::Open> {
        self.request_camera()
    }

    /// Stops the live stream, if any.
    pub fn release(&mut self) {
        if let Some(handle) = self.stream.take() {
            log::debug!("Releasing camera stream #{}", handle.id);
            self.device.stop(handle.stream);
        }
    }

    /// Releases the stream and invalidates any pending request.
    pub fn teardown(&mut self) {
        self.cancel_pending();
        self.release();
    }

    fn cancel_pending(&mut self) {
        if self.is_requesting() {
            self.latest_request += 1;
            self.permission = CameraPermissionState::NotRequested;
        }
    }
}

impl<D: CameraDevice> Drop for MediaAcquisition<D> {
    fn drop(&mut self) {
        self.release();
    }
}
