// JS-facing entry points and the DOM/event wiring for the landing page.
// Everything decorative here is a silent no-op when its DOM pieces are
// missing; the page must work exactly the same without us.

pub mod color;
pub mod debounce;
pub mod effects;
pub mod field;
pub mod particle;
pub mod renderer;
pub mod scheduler;
mod utils;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlCanvasElement, HtmlElement, MouseEvent, Window};

use crate::debounce::Debouncer;
use crate::effects::Counter;
use crate::field::{FieldConfig, ParticleField};
use crate::renderer::{CanvasRenderer, Renderer};
use crate::scheduler::RafScheduler;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";
const RESIZE_DEBOUNCE_MS: i32 = 150;

#[wasm_bindgen]
pub fn initialize() {
    utils::set_panic_hook();
}

// Everything the frame/resize/preference callbacks touch, behind one
// RefCell so a single closure borrow covers a whole transition.
struct App {
    field: ParticleField,
    renderer: CanvasRenderer,
    scheduler: RafScheduler,
    canvas: HtmlCanvasElement,
    reduced_motion: bool,
}

impl App {
    fn frame(&mut self) {
        self.field.animate(&mut self.renderer, &mut self.scheduler);
    }

    // Layout size of the canvas element right now; the drawing surface gets
    // resynchronized to it on every restart.
    fn layout_size(&self) -> (u32, u32) {
        let width = self.canvas.client_width().max(0) as u32;
        let height = self.canvas.client_height().max(0) as u32;
        (width, height)
    }

    fn restart(&mut self) {
        let (width, height) = self.layout_size();
        self.renderer.resize_surface(width, height);
        self.field.restart(
            width,
            height,
            self.reduced_motion,
            &mut rand::thread_rng(),
            &mut self.renderer,
            &mut self.scheduler,
        );
    }

    fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
        self.field
            .apply_motion_preference(reduced, &mut self.renderer, &mut self.scheduler);
    }
}

/// Builds the particle field on the canvas with the given id and starts it
/// (or renders the single reduced-motion frame). Wires resize and
/// preference-change listeners. Missing canvas, context or window: no-op.
#[wasm_bindgen]
pub fn mount_particle_field(canvas_id: &str) {
    let window = match web_sys::window() {
        Some(window) => window,
        None => return,
    };
    let document = match window.document() {
        Some(document) => document,
        None => return,
    };
    let canvas = match document
        .get_element_by_id(canvas_id)
        .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok())
    {
        Some(canvas) => canvas,
        None => return,
    };
    let renderer = match CanvasRenderer::new(canvas.clone()) {
        Some(renderer) => renderer,
        None => return,
    };

    let app = Rc::new(RefCell::new(App {
        field: ParticleField::new(FieldConfig::default()),
        renderer,
        scheduler: RafScheduler::new(window.clone()),
        canvas,
        reduced_motion: media_matches(&window, REDUCED_MOTION_QUERY),
    }));

    // The frame callback is handed to the scheduler after the app exists;
    // the resulting reference cycle is intentional, the wiring lives as
    // long as the page.
    let frame_closure = {
        let app = app.clone();
        Closure::wrap(Box::new(move || {
            app.borrow_mut().frame();
        }) as Box<dyn FnMut()>)
    };
    app.borrow_mut()
        .scheduler
        .set_callback(frame_closure.as_ref().unchecked_ref::<js_sys::Function>().clone());
    frame_closure.forget();

    // Resize storms collapse into one rebuild once they go quiet.
    let restart_closure = {
        let app = app.clone();
        Closure::wrap(Box::new(move || {
            app.borrow_mut().restart();
        }) as Box<dyn FnMut()>)
    };
    let mut debouncer = Debouncer::new(
        window.clone(),
        RESIZE_DEBOUNCE_MS,
        restart_closure.as_ref().unchecked_ref::<js_sys::Function>().clone(),
    );
    restart_closure.forget();
    let resize_closure = Closure::wrap(Box::new(move || {
        debouncer.poke();
    }) as Box<dyn FnMut()>);
    let _ = window
        .add_event_listener_with_callback("resize", resize_closure.as_ref().unchecked_ref());
    resize_closure.forget();

    if let Ok(Some(query)) = window.match_media(REDUCED_MOTION_QUERY) {
        let app = app.clone();
        let preference_closure =
            Closure::wrap(Box::new(move |event: web_sys::MediaQueryListEvent| {
                app.borrow_mut().set_reduced_motion(event.matches());
            }) as Box<dyn FnMut(web_sys::MediaQueryListEvent)>);
        let _ = query
            .add_event_listener_with_callback("change", preference_closure.as_ref().unchecked_ref());
        preference_closure.forget();
    }

    app.borrow_mut().restart();
}

/// Counts every element matching `selector` up from 0 to its `data-target`
/// attribute over `duration_ms`. Under reduced motion the final value is
/// written immediately.
#[wasm_bindgen]
pub fn animate_counters(selector: &str, duration_ms: f64) {
    let window = match web_sys::window() {
        Some(window) => window,
        None => return,
    };
    let document = match window.document() {
        Some(document) => document,
        None => return,
    };
    let elements = match document.query_selector_all(selector) {
        Ok(elements) => elements,
        Err(_) => return,
    };
    let reduced = media_matches(&window, REDUCED_MOTION_QUERY);
    for index in 0..elements.length() {
        let element = match elements
            .get(index)
            .and_then(|node| node.dyn_into::<Element>().ok())
        {
            Some(element) => element,
            None => continue,
        };
        let target = match element
            .get_attribute("data-target")
            .and_then(|raw| raw.parse::<f64>().ok())
        {
            Some(target) if target >= 0.0 => target,
            _ => continue,
        };
        if reduced {
            element.set_text_content(Some(&(target.floor() as u64).to_string()));
        } else {
            start_counter(&window, element, target, duration_ms);
        }
    }
}

// One self-rescheduling rAF chain per counter element; the chain dies on
// its own once the counter finishes.
fn start_counter(window: &Window, element: Element, target: f64, duration_ms: f64) {
    let mut counter = Counter::new(target, duration_ms);
    let closure_cell: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let window_for_frames = window.clone();
    let cell_for_frames = closure_cell.clone();
    let closure = Closure::wrap(Box::new(move || {
        let running = counter.step();
        element.set_text_content(Some(&counter.display().to_string()));
        if running {
            if let Some(closure) = cell_for_frames.borrow().as_ref() {
                let _ = window_for_frames.request_animation_frame(closure.as_ref().unchecked_ref());
            }
        }
    }) as Box<dyn FnMut()>);
    *closure_cell.borrow_mut() = Some(closure);
    if let Some(closure) = closure_cell.borrow().as_ref() {
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    };
}

/// Mousemove parallax for every element matching `selector`: deeper
/// elements drift further from the pointer. Skipped wholesale on
/// coarse-pointer devices, where there is no pointer to follow.
#[wasm_bindgen]
pub fn enable_parallax(selector: &str) {
    let window = match web_sys::window() {
        Some(window) => window,
        None => return,
    };
    let document = match window.document() {
        Some(document) => document,
        None => return,
    };
    if media_matches(&window, "(pointer: coarse)") {
        return;
    }
    let elements = match document.query_selector_all(selector) {
        Ok(elements) => elements,
        Err(_) => return,
    };
    if elements.length() == 0 {
        return;
    }

    let listener_target: Document = document;
    let closure = Closure::wrap(Box::new(move |event: MouseEvent| {
        let viewport_width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let viewport_height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        if viewport_width <= 0.0 || viewport_height <= 0.0 {
            return;
        }
        let mouse_x = event.client_x() as f64 / viewport_width;
        let mouse_y = event.client_y() as f64 / viewport_height;
        for index in 0..elements.length() {
            let element = match elements
                .get(index)
                .and_then(|node| node.dyn_into::<HtmlElement>().ok())
            {
                Some(element) => element,
                None => continue,
            };
            let (dx, dy) = effects::orb_offset(mouse_x, mouse_y, index as usize);
            let _ = element
                .style()
                .set_property("transform", &format!("translate({}px, {}px)", dx, dy));
        }
    }) as Box<dyn FnMut(MouseEvent)>);
    let _ = listener_target
        .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
    closure.forget();
}

fn media_matches(window: &Window, query: &str) -> bool {
    window
        .match_media(query)
        .ok()
        .and_then(|list| list)
        .map(|list| list.matches())
        .unwrap_or(false)
}
