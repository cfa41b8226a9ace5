//! Single-slot mailbox between the control thread and the render thread.
//!
//! Posting overwrites the slot instead of queueing: the render thread only
//! acts on the latest request. An exit request is the exception, it stays
//! in the slot until the render thread consumes it.
//!
//! Clearing the window is the one post that waits: it returns only once the
//! render thread has dropped every device built on the old window.

use oxisurf_gfx::WindowHandle;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Request waiting for the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum PendingMessage {
    /// Nothing to do
    #[default]
    None,
    /// A window was attached; (re)build the context for it
    WindowSet,
    /// The window is about to go away; drop the context
    WindowCleared,
    /// Tear down and leave the render loop
    Exit,
}

/// Slot contents. Guarded by the lock in [`Shared`].
#[derive(Debug, Default)]
pub(crate) struct Mailbox {
    pending: PendingMessage,
    window: Option<WindowHandle>,
    /// Window clears requested so far
    clears_requested: u64,
    /// Clears the render thread has carried out
    clears_released: u64,
    /// A device built on a posted window is alive
    bound: bool,
}

impl Mailbox {
    /// Store `window` and request initialization. Returns false if an exit
    /// is already pending and the request was dropped.
    pub fn post_window_set(&mut self, window: WindowHandle) -> bool {
        if self.pending == PendingMessage::Exit {
            return false;
        }
        self.pending = PendingMessage::WindowSet;
        self.window = Some(window);
        true
    }

    /// Forget the window and request teardown. Returns false if an exit is
    /// already pending.
    pub fn post_window_cleared(&mut self) -> bool {
        if self.pending == PendingMessage::Exit {
            return false;
        }
        self.pending = PendingMessage::WindowCleared;
        self.window = None;
        true
    }

    pub fn post_exit(&mut self) {
        self.pending = PendingMessage::Exit;
    }

    /// Snapshot and clear the pending message.
    pub fn take(&mut self) -> PendingMessage {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending != PendingMessage::None
    }

    pub fn window(&self) -> Option<WindowHandle> {
        self.window
    }

    /// Ticket covering every clear requested up to now.
    pub fn release_ticket(&self) -> u64 {
        self.clears_requested
    }

    fn request_release(&mut self) -> u64 {
        self.clears_requested += 1;
        self.clears_requested
    }

    /// Record what the render thread holds after handling a message taken
    /// under `ticket`.
    pub fn acknowledge(&mut self, ticket: u64, bound: bool) {
        self.clears_released = self.clears_released.max(ticket);
        self.bound = bound;
    }

    /// Whether a clear holding `ticket` may return.
    fn is_released(&self, ticket: u64) -> bool {
        !self.bound || self.clears_released >= ticket
    }
}

/// Lock-guarded mailbox, the condition the idle render thread waits on and
/// the one window clears wait on.
#[derive(Default)]
pub(crate) struct Shared {
    mailbox: Mutex<Mailbox>,
    posted: Condvar,
    released: Condvar,
}

impl Shared {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_window_set(&self, window: WindowHandle) {
        let accepted = self.mailbox.lock().post_window_set(window);
        if accepted {
            debug!("Posted window set ({})", window);
            self.posted.notify_one();
        } else {
            warn!("Dropping window set for {}: exit already requested", window);
        }
    }

    /// Post a clear and block until the render thread no longer uses the
    /// old window. Returns at once when no device is bound.
    pub fn post_window_cleared(&self) {
        let mut mailbox = self.mailbox.lock();
        let ticket = mailbox.request_release();
        if mailbox.post_window_cleared() {
            debug!("Posted window cleared");
            self.posted.notify_one();
        } else {
            // The pending exit releases the window instead
            warn!("Dropping window clear: exit already requested");
        }

        while !mailbox.is_released(ticket) {
            self.released.wait(&mut mailbox);
        }
        debug!("Window released");
    }

    pub fn post_exit(&self) {
        self.mailbox.lock().post_exit();
        debug!("Posted exit");
        self.posted.notify_one();
    }

    pub fn lock(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock()
    }

    /// Publish the render thread's state after handling a message and wake
    /// any clear waiting on it.
    pub fn acknowledge(&self, mailbox: &mut MutexGuard<'_, Mailbox>, ticket: u64, bound: bool) {
        mailbox.acknowledge(ticket, bound);
        self.released.notify_all();
    }

    /// Mark that nothing is bound any more, e.g. when the render thread
    /// leaves its loop without an exit message.
    pub fn unbind(&self) {
        let mut mailbox = self.mailbox.lock();
        let ticket = mailbox.release_ticket();
        self.acknowledge(&mut mailbox, ticket, false);
    }

    /// Block the render thread until something is posted.
    pub fn wait_for_message(&self, mailbox: &mut MutexGuard<'_, Mailbox>) {
        while !mailbox.is_pending() {
            self.posted.wait(mailbox);
        }
    }
}
