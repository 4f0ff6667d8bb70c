// Trailing-edge debounce over host timeouts, for bursty DOM events like
// resize. Each poke restarts the delay; the callback runs once the burst
// goes quiet.

use web_sys::Window;

pub struct Debouncer {
    window: Window,
    delay_ms: i32,
    pending: Option<i32>,
    callback: js_sys::Function,
}

impl Debouncer {
    pub fn new(window: Window, delay_ms: i32, callback: js_sys::Function) -> Debouncer {
        Debouncer {
            window,
            delay_ms,
            pending: None,
            callback,
        }
    }

    pub fn poke(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        self.pending = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(&self.callback, self.delay_ms)
            .ok();
    }
}
