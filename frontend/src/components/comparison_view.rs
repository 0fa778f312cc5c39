use gloo_events::{EventListener, EventListenerOptions};
use shared::{ContainerBounds, PointerInput, SliderState};
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, MouseEvent, TouchEvent};
use yew::html::Scope;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct ComparisonProps {
    pub before: AttrValue,
    pub after: AttrValue,
}

pub enum ComparisonMsg {
    Pointer(PointerInput),
}

/// Before/after reveal. Dragging is tracked on the window so the handle
/// follows the pointer outside the image.
pub struct ComparisonView {
    slider: SliderState,
    container: NodeRef,
    drag_listeners: Vec<EventListener>,
}

fn first_touch_x(event: &TouchEvent) -> Option<f64> {
    event.touches().get(0).map(|touch| f64::from(touch.client_x()))
}

impl Component for ComparisonView {
    type Message = ComparisonMsg;
    type Properties = ComparisonProps;

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            slider: SliderState::default(),
            container: NodeRef::default(),
            drag_listeners: Vec::new(),
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            ComparisonMsg::Pointer(input) => {
                let changed = self.slider.handle(input, self.bounds());

                if self.slider.is_dragging() && self.drag_listeners.is_empty() {
                    self.drag_listeners = window_drag_listeners(ctx.link());
                } else if !self.slider.is_dragging() {
                    self.drag_listeners.clear();
                }
                changed
            }
        }
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        if ctx.props() != old_props {
            self.slider = SliderState::default();
            self.drag_listeners.clear();
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();
        let props = ctx.props();

        let on_mouse_down = link.callback(|e: MouseEvent| {
            ComparisonMsg::Pointer(PointerInput::Down {
                x: f64::from(e.client_x()),
            })
        });
        let on_touch_start = link.batch_callback(|e: TouchEvent| {
            first_touch_x(&e).map(|x| ComparisonMsg::Pointer(PointerInput::Down { x }))
        });

        html! {
            <div
                ref={self.container.clone()}
                class={classes!("comparison", self.slider.is_dragging().then_some("dragging"))}
                onmousedown={on_mouse_down}
                ontouchstart={on_touch_start}
            >
                <img class="comparison-image" src={props.after.clone()} alt="Depois" draggable="false" />
                <img
                    class="comparison-image"
                    src={props.before.clone()}
                    alt="Antes"
                    draggable="false"
                    style={format!("clip-path: {};", self.slider.clip_path())}
                />
                <div class="comparison-handle" style={format!("left: {};", self.slider.handle_offset())}>
                    <div class="comparison-knob">
                        <svg width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor"
                            stroke-width="2" stroke-linecap="round" stroke-linejoin="round">
                            <path d="M18 8L22 12L18 16" />
                            <path d="M6 8L2 12L6 16" />
                            <path d="M2 12H22" />
                        </svg>
                    </div>
                </div>
                <span class="badge badge-before">{"Antes"}</span>
                <span class="badge badge-after">{"Depois"}</span>
            </div>
        }
    }
}

impl ComparisonView {
    fn bounds(&self) -> ContainerBounds {
        match self.container.cast::<HtmlElement>() {
            Some(element) => {
                let rect = element.get_bounding_client_rect();
                ContainerBounds {
                    left: rect.left(),
                    width: rect.width(),
                }
            }
            None => ContainerBounds {
                left: 0.0,
                width: 0.0,
            },
        }
    }
}

fn window_drag_listeners(link: &Scope<ComparisonView>) -> Vec<EventListener> {
    let Some(window) = web_sys::window() else {
        log::warn!("No window to track the drag on");
        return Vec::new();
    };

    let on_mouse_move = {
        let link = link.clone();
        EventListener::new(&window, "mousemove", move |event| {
            if let Some(event) = event.dyn_ref::<MouseEvent>() {
                link.send_message(ComparisonMsg::Pointer(PointerInput::Move {
                    x: f64::from(event.client_x()),
                }));
            }
        })
    };

    let on_touch_move = {
        let link = link.clone();
        EventListener::new_with_options(
            &window,
            "touchmove",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                if let Some(x) = event.dyn_ref::<TouchEvent>().and_then(first_touch_x) {
                    event.prevent_default();
                    link.send_message(ComparisonMsg::Pointer(PointerInput::Move { x }));
                }
            },
        )
    };

    let release = |name: &'static str| {
        let link = link.clone();
        EventListener::new(&window, name, move |_| {
            link.send_message(ComparisonMsg::Pointer(PointerInput::Up));
        })
    };

    vec![
        on_mouse_move,
        on_touch_move,
        release("mouseup"),
        release("touchend"),
    ]
}
