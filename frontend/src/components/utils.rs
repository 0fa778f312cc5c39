use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use shared::NextStep;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{FileList, HtmlAnchorElement};
use yew::prelude::*;

// Debounce function to limit button events
pub fn debounce<F>(duration: u32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));

    Callback::from(move |_| {
        let mut timeout_ref = timeout.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        *timeout_ref = Some(Timeout::new(duration, move || inner_callback()));
    })
}

pub fn first_image_file(file_list: &FileList) -> Option<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .find(|file| file.type_().starts_with("image/"))
        .map(GlooFile::from)
}

/// Saves `href` under `file_name` through a temporary anchor.
pub fn download(href: &str, file_name: &str) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    let Some(body) = document.body() else {
        return;
    };

    let anchor = match document
        .create_element("a")
        .ok()
        .and_then(|element| element.dyn_into::<HtmlAnchorElement>().ok())
    {
        Some(anchor) => anchor,
        None => {
            log::error!("Could not create download link");
            return;
        }
    };

    anchor.set_href(href);
    anchor.set_download(file_name);
    if body.append_child(&anchor).is_ok() {
        anchor.click();
        let _ = body.remove_child(&anchor);
    }
}

pub fn next_step_label(step: NextStep) -> &'static str {
    match step {
        NextStep::Retry => "Tentar Novamente",
        NextStep::Retake => "Tirar Outra Foto",
        NextStep::Upload => "Enviar uma Foto",
    }
}

pub fn render_error_message(message: &str) -> Html {
    html! {
        <div class="error-message">
            <p>{ message }</p>
        </div>
    }
}
