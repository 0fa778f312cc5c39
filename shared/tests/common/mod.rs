#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::{Ready, ready};
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use shared::{
    CameraDevice, CameraError, EncodedImage, ErrorKind, GenerateRequest, GenerateResponse,
    ImagePreprocessor, InferenceClient, InferenceTransport, RawImage, Sleeper,
};

/// In-memory camera. `live` counts streams that were opened and not stopped.
#[derive(Clone)]
pub struct FakeCamera {
    pub refusal: Option<CameraError>,
    pub frame: (u32, u32),
    pub live: Rc<Cell<i32>>,
    pub opened: Rc<Cell<u32>>,
}

impl FakeCamera {
    pub fn granting(width: u32, height: u32) -> Self {
        Self {
            refusal: None,
            frame: (width, height),
            live: Rc::new(Cell::new(0)),
            opened: Rc::new(Cell::new(0)),
        }
    }

    pub fn refusing(err: CameraError) -> Self {
        Self {
            refusal: Some(err),
            ..Self::granting(640, 480)
        }
    }
}

impl CameraDevice for FakeCamera {
    type Stream = u32;
    type Open = Ready<Result<u32, CameraError>>;

    fn open(&self) -> Self::Open {
        if let Some(err) = &self.refusal {
            return ready(Err(err.clone()));
        }
        self.opened.set(self.opened.get() + 1);
        self.live.set(self.live.get() + 1);
        ready(Ok(self.opened.get()))
    }

    fn grab_frame(&self, _stream: &u32) -> Result<RawImage, CameraError> {
        let (width, height) = self.frame;
        Ok(RawImage::from(RgbaImage::from_pixel(
            width,
            height,
            Rgba([180, 140, 120, 255]),
        )))
    }

    fn stop(&self, _stream: u32) {
        self.live.set(self.live.get() - 1);
    }
}

/// Replays canned service replies in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Rc<RefCell<VecDeque<Result<GenerateResponse, ErrorKind>>>>,
    pub requests: Rc<RefCell<Vec<GenerateRequest>>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<GenerateResponse, ErrorKind>>) -> Self {
        Self {
            replies: Rc::new(RefCell::new(replies.into())),
            requests: Rc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl InferenceTransport for ScriptedTransport {
    type Call = Ready<Result<GenerateResponse, ErrorKind>>;

    fn send(&self, request: GenerateRequest) -> Self::Call {
        self.requests.borrow_mut().push(request);
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(ErrorKind::UnknownFailure));
        ready(reply)
    }
}

/// Records requested delays instead of waiting.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    pub slept: Rc<RefCell<Vec<Duration>>>,
}

impl Sleeper for RecordingSleeper {
    type Sleep = Ready<()>;

    fn sleep(&self, duration: Duration) -> Self::Sleep {
        self.slept.borrow_mut().push(duration);
        ready(())
    }
}

pub fn client(
    transport: &ScriptedTransport,
    sleeper: &RecordingSleeper,
) -> InferenceClient<ScriptedTransport, RecordingSleeper> {
    InferenceClient::new(transport.clone(), sleeper.clone())
}

pub fn png_file(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::from_pixel(width, height, Rgba([90, 60, 50, 255]))
        .write_to(&mut out, ImageFormat::Png)
        .expect("png encode");
    out.into_inner()
}

/// A real JPEG, as the service would send back.
pub fn edited_image() -> EncodedImage {
    let raw = RawImage::from(RgbaImage::from_pixel(32, 24, Rgba([250, 250, 250, 255])));
    ImagePreprocessor::default().resize(raw).expect("jpeg encode")
}

pub fn reply_with_image() -> Result<GenerateResponse, ErrorKind> {
    Ok(GenerateResponse::with_image(&edited_image()))
}
