use super::super::{Comparison, Model, Msg};
use super::utils::{download, first_image_file};
use gloo_file::File as GlooFile;
use shared::{
    CameraOutcome, CaptureError, CaptureEvent, DOWNLOAD_FILE_NAME, GenerationResult,
    GenerationTicket, Transition, generation_for,
};
use wasm_bindgen_futures::spawn_local;
use web_sys::{DragEvent, MediaStream};
use yew::prelude::*;

pub fn handle_request_camera(model: &mut Model, ctx: &Context<Model>) -> bool {
    match model.machine.request_camera() {
        Ok(request) => {
            let link = ctx.link().clone();
            spawn_local(async move {
                link.send_message(Msg::CameraResolved(request.resolve().await));
            });
            true
        }
        Err(e) => {
            log::warn!("Camera request ignored: {}", e);
            false
        }
    }
}

pub fn handle_camera_resolved(model: &mut Model, outcome: CameraOutcome<MediaStream>) -> bool {
    let granted = outcome.is_granted();
    match model.machine.finish_camera_request(outcome) {
        Transition::Discarded => false,
        _ => {
            if granted {
                model.error = None;
            }
            true
        }
    }
}

pub fn handle_capture(model: &mut Model) -> bool {
    if let Err(e) = model.machine.capture() {
        log::error!("Capture failed: {}", e);
    }
    model.refresh_captured_url();
    true
}

pub fn handle_retake(model: &mut Model, ctx: &Context<Model>) -> bool {
    model.comparison = None;
    model.error = None;
    model.reading_file = false;

    let request = model.machine.retake();
    model.refresh_captured_url();

    let link = ctx.link().clone();
    spawn_local(async move {
        link.send_message(Msg::CameraResolved(request.resolve().await));
    });
    true
}

pub fn handle_file_chosen(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    model.reading_file = true;
    model.error = None;
    log::info!("Reading {} ({} bytes)", file.name(), file.size());

    let epoch = model.machine.session().epoch();
    let link = ctx.link().clone();
    spawn_local(async move {
        match gloo_file::futures::read_as_bytes(&file).await {
            Ok(bytes) => link.send_message(Msg::FileLoaded(epoch, bytes)),
            Err(e) => {
                log::error!("Failed to read {}: {}", file.name(), e);
                link.send_message(Msg::SetError(Some(
                    "Não foi possível ler o arquivo selecionado.".to_string(),
                )));
            }
        }
    });
    true
}

pub fn handle_file_loaded(model: &mut Model, epoch: u64, bytes: Vec<u8>) -> bool {
    match model.machine.finish_file_load(epoch, &bytes) {
        Ok(Transition::Discarded) => return false,
        Ok(_) => {}
        Err(CaptureError::InvalidTransition { state, .. }) => {
            log::warn!("Ignoring file while {}", state);
            model.error = Some("Tire outra foto antes de enviar um novo arquivo.".to_string());
        }
        Err(e) => log::warn!("Rejected file: {}", e),
    }
    model.reading_file = false;
    model.refresh_captured_url();
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    let file = event
        .data_transfer()
        .and_then(|data_transfer| data_transfer.files())
        .and_then(|file_list| first_image_file(&file_list));

    match file {
        Some(file) => ctx.link().send_message(Msg::FileChosen(file)),
        None => ctx.link().send_message(Msg::SetError(Some(
            "Selecione um arquivo de imagem.".to_string(),
        ))),
    }
    true
}

pub fn handle_generate(model: &mut Model, ctx: &Context<Model>) -> bool {
    let ticket = match model.machine.begin_generate(model.client.policy()) {
        Ok(ticket) => ticket,
        Err(e) => {
            log::info!("Generate ignored: {}", e);
            return false;
        }
    };
    model.error = None;

    let generation = generation_for(&ticket, &model.client);
    let link = ctx.link().clone();
    spawn_local(async move {
        let result = generation.await;
        link.send_message(Msg::Generated(ticket, result));
    });
    true
}

pub fn handle_generated(
    model: &mut Model,
    ticket: GenerationTicket,
    result: GenerationResult,
) -> bool {
    match model.machine.finish_generate(ticket, result) {
        Transition::Completed(CaptureEvent::Completed { before, after }) => {
            model.comparison = Some(Comparison {
                before: before.to_data_url().into(),
                after: after.to_data_url().into(),
            });
            true
        }
        Transition::Applied => true,
        Transition::Discarded => false,
    }
}

pub fn handle_download(model: &mut Model) -> bool {
    if let Some(comparison) = &model.comparison {
        download(&comparison.after, DOWNLOAD_FILE_NAME);
    }
    false
}
