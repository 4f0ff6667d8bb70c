// Frame scheduling seam between the field and the host. The field only ever
// asks for "one more frame" and gets back a handle it can cancel.

use web_sys::Window;

pub trait FrameScheduler {
    /// Requests one callback at the next display refresh. Returns the
    /// cancellation handle, or None when the host refused the request.
    fn schedule(&mut self) -> Option<i32>;

    fn cancel(&mut self, handle: i32);
}

// requestAnimationFrame-backed scheduler. The callback is installed after
// construction because the closure it wraps needs the app that owns this
// scheduler to exist first.
pub struct RafScheduler {
    window: Window,
    callback: Option<js_sys::Function>,
}

impl RafScheduler {
    pub fn new(window: Window) -> RafScheduler {
        RafScheduler {
            window,
            callback: None,
        }
    }

    pub fn set_callback(&mut self, callback: js_sys::Function) {
        self.callback = Some(callback);
    }
}

impl FrameScheduler for RafScheduler {
    fn schedule(&mut self) -> Option<i32> {
        let callback = self.callback.as_ref()?;
        self.window.request_animation_frame(callback).ok()
    }

    fn cancel(&mut self, handle: i32) {
        let _ = self.window.cancel_animation_frame(handle);
    }
}
