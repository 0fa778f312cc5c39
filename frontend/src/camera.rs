use std::future::Future;
use std::pin::Pin;

use js_sys::{Object, Reflect};
use shared::{CameraDevice, CameraError, RawImage};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, DomException, HtmlCanvasElement, HtmlVideoElement, MediaStream,
    MediaStreamConstraints, MediaStreamTrack,
};
use yew::NodeRef;

/// Front-facing browser camera. Frames are read from the `<video>` element
/// the preview is attached to.
#[derive(Clone, Default)]
pub struct WebCamera {
    video: NodeRef,
}

impl WebCamera {
    pub fn video_ref(&self) -> &NodeRef {
        &self.video
    }

    /// Points the preview element at `stream` unless it already shows it.
    pub fn attach_preview(&self, stream: &MediaStream) {
        let Some(video) = self.video.cast::<HtmlVideoElement>() else {
            return;
        };
        if video.src_object().as_ref() == Some(stream) {
            return;
        }

        video.set_src_object(Some(stream));
        if let Err(e) = video.play() {
            log::warn!("Camera preview did not start: {:?}", e);
        }
    }
}

impl CameraDevice for WebCamera {
    type Stream = MediaStream;
    type Open = Pin<Box<dyn Future<Output = Result<MediaStream, CameraError>>>>;

    fn open(&self) -> Self::Open {
        Box::pin(request_user_media())
    }

    fn grab_frame(&self, _stream: &MediaStream) -> Result<RawImage, CameraError> {
        let video = self
            .video
            .cast::<HtmlVideoElement>()
            .ok_or_else(|| unavailable("preview element is not mounted"))?;
        let (width, height) = (video.video_width(), video.video_height());
        if width == 0 || height == 0 {
            return Err(unavailable("camera has not produced a frame yet"));
        }

        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| unavailable("no document"))?;
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(js_unavailable)?
            .dyn_into()
            .map_err(|_| unavailable("canvas element has the wrong type"))?;
        canvas.set_width(width);
        canvas.set_height(height);

        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(js_unavailable)?
            .ok_or_else(|| unavailable("2d canvas context is not supported"))?
            .dyn_into()
            .map_err(|_| unavailable("2d context has the wrong type"))?;

        let (w, h) = (f64::from(width), f64::from(height));
        context
            .draw_image_with_html_video_element_and_dw_and_dh(&video, 0.0, 0.0, w, h)
            .map_err(js_unavailable)?;
        let pixels = context
            .get_image_data(0.0, 0.0, w, h)
            .map_err(js_unavailable)?
            .data();

        RawImage::from_rgba(width, height, pixels.0)
            .ok_or_else(|| unavailable("frame size does not match its pixel buffer"))
    }

    fn stop(&self, stream: MediaStream) {
        for track in stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }

        if let Some(video) = self.video.cast::<HtmlVideoElement>() {
            if video.src_object().as_ref() == Some(&stream) {
                video.set_src_object(None);
            }
        }
    }
}

async fn request_user_media() -> Result<MediaStream, CameraError> {
    let window = web_sys::window().ok_or_else(|| unavailable("no window"))?;
    let devices = window
        .navigator()
        .media_devices()
        .map_err(|_| unavailable("media devices are not available in this context"))?;

    let video = Object::new();
    Reflect::set(&video, &JsValue::from_str("facingMode"), &JsValue::from_str("user"))
        .map_err(js_unavailable)?;
    let constraints = MediaStreamConstraints::new();
    constraints.set_video(&video);

    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(camera_error)?;
    let stream = JsFuture::from(promise).await.map_err(camera_error)?;

    stream
        .dyn_into::<MediaStream>()
        .map_err(|_| unavailable("getUserMedia resolved to something other than a stream"))
}

fn camera_error(value: JsValue) -> CameraError {
    match value.dyn_ref::<DomException>() {
        Some(e) if matches!(e.name().as_str(), "NotAllowedError" | "SecurityError") => {
            CameraError::PermissionDenied
        }
        Some(e) => CameraError::Unavailable(format!("{}: {}", e.name(), e.message())),
        None => js_unavailable(value),
    }
}

fn js_unavailable(value: JsValue) -> CameraError {
    CameraError::Unavailable(format!("{:?}", value))
}

fn unavailable(reason: &str) -> CameraError {
    CameraError::Unavailable(reason.to_string())
}
