mod api;
mod camera;
mod components;

use api::{RelayTransport, TimerSleeper};
use camera::WebCamera;
use components::capture_panel::render_capture_panel;
use components::handlers;
use components::header::render_header;
use components::result_panel::render_result_panel;
use gloo_file::File as GlooFile;
use shared::{
    CameraOutcome, CaptureStateMachine, GenerationResult, GenerationTicket, InferenceClient,
};
use web_sys::{DragEvent, MediaStream};
use yew::prelude::*;

/// The pair handed out when a session completes.
pub struct Comparison {
    before: AttrValue,
    after: AttrValue,
}

// Yew msg components
pub enum Msg {
    // Camera
    RequestCamera,
    CameraResolved(CameraOutcome<MediaStream>),
    Capture,
    Retake,

    // Upload
    FileChosen(GlooFile),
    FileLoaded(u64, Vec<u8>),
    HandleDrop(DragEvent),
    SetDragging(bool),

    // Inference
    Generate,
    Generated(GenerationTicket, GenerationResult),

    // Result
    Download,
    SetError(Option<String>),
}

// Main component
pub struct Model {
    machine: CaptureStateMachine<WebCamera>,
    client: InferenceClient<RelayTransport, TimerSleeper>,
    captured_url: Option<AttrValue>,
    comparison: Option<Comparison>,
    is_dragging: bool,
    reading_file: bool,
    error: Option<String>,
}

impl Model {
    /// Re-encodes the preview of the held photo after it changed.
    fn refresh_captured_url(&mut self) {
        self.captured_url = self
            .machine
            .session()
            .captured()
            .map(|image| AttrValue::from(image.to_data_url()));
    }
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let model = Self {
            machine: CaptureStateMachine::new(WebCamera::default()),
            client: InferenceClient::new(RelayTransport::default(), TimerSleeper),
            captured_url: None,
            comparison: None,
            is_dragging: false,
            reading_file: false,
            error: None,
        };

        ctx.link().send_message(Msg::RequestCamera);
        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            // Camera
            Msg::RequestCamera => handlers::handle_request_camera(self, ctx),
            Msg::CameraResolved(outcome) => handlers::handle_camera_resolved(self, outcome),
            Msg::Capture => handlers::handle_capture(self),
            Msg::Retake => handlers::handle_retake(self, ctx),

            // Upload
            Msg::FileChosen(file) => handlers::handle_file_chosen(self, ctx, file),
            Msg::FileLoaded(epoch, bytes) => handlers::handle_file_loaded(self, epoch, bytes),
            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            // Inference
            Msg::Generate => handlers::handle_generate(self, ctx),
            Msg::Generated(ticket, result) => handlers::handle_generated(self, ticket, result),

            // Result
            Msg::Download => handlers::handle_download(self),
            Msg::SetError(error) => {
                self.error = error;
                self.reading_file = false;
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();

        html! {
            <div class="container">
                <section class="simulator">
                    <div class="intro-column">
                        { render_header() }
                        {
                            if self.comparison.is_some() {
                                html! {
                                    <div class="result-actions">
                                        <button class="link-btn" onclick={link.callback(|_| Msg::Retake)}>
                                            {"← Fazer nova simulação"}
                                        </button>
                                        <button class="cta-btn">{"Quero Agendar Minha Avaliação"}</button>
                                    </div>
                                }
                            } else {
                                html! {
                                    <p class="social-proof">
                                        {"Mais de "}<strong>{"5.000"}</strong>{" sorrisos transformados"}
                                    </p>
                                }
                            }
                        }
                    </div>

                    <div class="interactive-column">
                        {
                            match &self.comparison {
                                Some(comparison) => render_result_panel(comparison, ctx),
                                None => render_capture_panel(self, ctx),
                            }
                        }
                    </div>
                </section>
            </div>
        }
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        let media = self.machine.media();
        if let Some(handle) = media.stream() {
            media.device().attach_preview(handle.stream());
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.machine.reset();
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
