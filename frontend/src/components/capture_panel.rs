use super::super::{Model, Msg};
use super::utils::{debounce, first_image_file, next_step_label, render_error_message};
use shared::{CaptureState, NextStep};
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::html::Scope;
use yew::prelude::*;

const FILE_INPUT_ID: &str = "file-input";

pub fn render_capture_panel(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <div class="simulator-card">
            { render_stage(model, ctx) }
            <div class="controls">
                { render_file_input(ctx) }
                { render_controls(model, ctx) }
                {
                    match &model.error {
                        Some(message) => render_error_message(message),
                        None => html! {},
                    }
                }
                <p class="disclaimer">
                    {"Sua foto será processada de forma segura por Inteligência Artificial para simular o resultado das lentes de porcelana."}
                </p>
            </div>
        </div>
    }
}

fn accepts_upload(model: &Model) -> bool {
    model.machine.next_steps().contains(&NextStep::Upload)
}

fn render_stage(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let state = model.machine.state();

    let (ondragover, ondragleave, ondrop) = if accepts_upload(model) {
        (
            Some(link.callback(|e: DragEvent| {
                e.prevent_default();
                Msg::SetDragging(true)
            })),
            Some(link.callback(|e: DragEvent| {
                e.prevent_default();
                Msg::SetDragging(false)
            })),
            Some(link.callback(Msg::HandleDrop)),
        )
    } else {
        (None, None, None)
    };

    let content = match &model.captured_url {
        Some(url) => html! { <img class="stage-media" src={url.clone()} alt="Foto capturada" /> },
        None => {
            let video_ref = model.machine.media().device().video_ref().clone();
            let overlay = match state {
                CaptureState::Error(kind) => html! {
                    <div class="stage-overlay stage-error"><p>{ kind.message() }</p></div>
                },
                _ if model.reading_file => html! {
                    <div class="stage-overlay"><p>{"Carregando foto..."}</p></div>
                },
                CaptureState::Streaming => html! {
                    <div class="face-guide">
                        <div class="face-outline"></div>
                        <p>{ model.machine.status_message() }</p>
                    </div>
                },
                _ => html! {
                    <div class="stage-overlay"><p>{ model.machine.status_message() }</p></div>
                },
            };

            html! {
                <>
                    <video
                        ref={video_ref}
                        class="stage-media mirrored"
                        autoplay=true
                        playsinline=true
                        muted=true
                    />
                    { overlay }
                </>
            }
        }
    };

    html! {
        <div
            class={classes!("stage", model.is_dragging.then_some("drag-over"))}
            {ondragover}
            {ondragleave}
            {ondrop}
        >
            { content }
        </div>
    }
}

fn render_file_input(ctx: &Context<Model>) -> Html {
    let handle_change = ctx.link().callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let file = input.files().as_ref().and_then(first_image_file);
        input.set_value("");

        match file {
            Some(file) => Msg::FileChosen(file),
            None => Msg::SetError(Some("Selecione um arquivo de imagem.".into())),
        }
    });

    html! {
        <input
            type="file"
            id={FILE_INPUT_ID}
            accept="image/*"
            style="display: none;"
            onchange={handle_change}
        />
    }
}

fn open_file_picker() {
    if let Some(input) = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(FILE_INPUT_ID))
    {
        if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
            html_input.click();
        }
    }
}

fn step_button(step: NextStep, link: &Scope<Model>, primary: bool) -> Html {
    let onclick = match step {
        NextStep::Retry => link.callback(|_: MouseEvent| Msg::Generate),
        NextStep::Retake => link.callback(|_: MouseEvent| Msg::Retake),
        NextStep::Upload => debounce(300, open_file_picker),
    };

    html! {
        <button
            class={classes!(if primary { "primary-btn" } else { "secondary-btn" })}
            {onclick}
        >
            { next_step_label(step) }
        </button>
    }
}

fn render_controls(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();

    match model.machine.state() {
        CaptureState::AwaitingDeviceChoice => html! {
            <div class="button-column">
                <button
                    class="primary-btn"
                    disabled={model.machine.is_requesting_camera()}
                    onclick={link.callback(|_| Msg::RequestCamera)}
                >
                    {
                        if model.machine.is_requesting_camera() {
                            "Aguardando permissão da câmera..."
                        } else {
                            "Ativar Câmera"
                        }
                    }
                </button>
                { step_button(NextStep::Upload, link, false) }
            </div>
        },
        CaptureState::Streaming => html! {
            <div class="button-column">
                <button class="primary-btn" onclick={link.callback(|_| Msg::Capture)}>
                    {"Tirar Foto do Sorriso"}
                </button>
                { step_button(NextStep::Upload, link, false) }
            </div>
        },
        state @ (CaptureState::Captured | CaptureState::Generating) => {
            let generating = state == CaptureState::Generating;
            html! {
                <div class="button-column">
                    <button
                        class="primary-btn"
                        disabled={generating}
                        onclick={debounce(300, {
                            let link = link.clone();
                            move || link.send_message(Msg::Generate)
                        })}
                    >
                        {
                            if generating {
                                html! { <><span class="spinner"></span>{" Criando Lentes..."}</> }
                            } else {
                                html! { {"Ver Meu Novo Sorriso"} }
                            }
                        }
                    </button>
                    <button
                        class="secondary-btn"
                        disabled={generating}
                        onclick={link.callback(|_| Msg::Retake)}
                    >
                        {"Tirar Outra Foto"}
                    </button>
                </div>
            }
        }
        CaptureState::Error(kind) => html! {
            <div class="button-column">
                {
                    if model.captured_url.is_some() {
                        render_error_message(kind.message())
                    } else {
                        html! {}
                    }
                }
                {
                    model.machine.next_steps()
                        .iter()
                        .enumerate()
                        .map(|(i, step)| step_button(*step, link, i == 0))
                        .collect::<Html>()
                }
            </div>
        },
        CaptureState::Complete => html! {},
    }
}
