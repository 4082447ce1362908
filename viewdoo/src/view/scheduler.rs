//! Render scheduling.
//!
//! Views render either synchronously, on every dirty write, or in batches on
//! the next frame. Frames are driven by the host: it calls [`flush`] when it's
//! ready to paint, e.g. from a `requestAnimationFrame` callback installed with
//! [`set_frame_requester`], or at the end of every event loop turn.
//!
//! Errors raised by batched renders can't reach whoever wrote to the state,
//! so they go to the handler installed with [`set_error_handler`]. By default,
//! they are logged.
use super::template::Error;
use serde::{Deserialize, Serialize};
use tracing::error;

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

/// How dirty writes are turned into renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// Render before the write returns.
    #[default]
    #[serde(alias = "synchronous")]
    Sync,
    /// Render once on the next frame, no matter how many writes happened.
    Batched,
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discipline::Sync => write!(f, "sync"),
            Discipline::Batched => write!(f, "batched"),
        }
    }
}

impl FromStr for Discipline {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "synchronous" => Ok(Discipline::Sync),
            "batched" | "batch" => Ok(Discipline::Batched),
            _ => Err(()),
        }
    }
}

type Task = Box<dyn FnOnce() -> Result<(), Error>>;
type Requester = Rc<dyn Fn()>;
type ErrorHandler = Rc<dyn Fn(Error)>;

#[derive(Default)]
struct Frame {
    tasks: Vec<Task>,
    requested: bool,
    requester: Option<Requester>,
    error_handler: Option<ErrorHandler>,
}

thread_local! {
    static FRAME: RefCell<Frame> = RefCell::new(Frame::default());
}

/// Run `task` on the next frame.
///
/// The first task of a frame asks the host for a frame
/// through the requester, if there is one.
pub fn request_frame(task: impl FnOnce() -> Result<(), Error> + 'static) {
    let requester = FRAME.with(|frame| {
        let mut frame = frame.borrow_mut();
        frame.tasks.push(Box::new(task));

        if frame.requested {
            None
        } else {
            frame.requested = true;
            frame.requester.clone()
        }
    });

    if let Some(requester) = requester {
        requester();
    }
}

/// Install the hook called when the first task of a frame is queued.
pub fn set_frame_requester(requester: impl Fn() + 'static) {
    FRAME.with(|frame| frame.borrow_mut().requester = Some(Rc::new(requester)));
}

/// Install the handler for errors raised by tasks.
pub fn set_error_handler(handler: impl Fn(Error) + 'static) {
    FRAME.with(|frame| frame.borrow_mut().error_handler = Some(Rc::new(handler)));
}

/// Remove the error handler, errors are logged again.
pub fn reset_error_handler() {
    FRAME.with(|frame| frame.borrow_mut().error_handler = None);
}

/// Send an error to the handler.
pub fn report(err: Error) {
    let handler = FRAME.with(|frame| frame.borrow().error_handler.clone());

    match handler {
        Some(handler) => handler(err),
        None => error!("unhandled render error: {}", err),
    }
}

/// Run all queued tasks. Tasks queued while flushing run on the next frame.
///
/// Returns the number of tasks that ran.
pub fn flush() -> usize {
    let tasks = FRAME.with(|frame| {
        let mut frame = frame.borrow_mut();
        frame.requested = false;
        std::mem::take(&mut frame.tasks)
    });

    let count = tasks.len();

    for task in tasks {
        if let Err(err) = task() {
            report(err);
        }
    }

    count
}

/// Number of tasks waiting for the next frame.
pub fn pending() -> usize {
    FRAME.with(|frame| frame.borrow().tasks.len())
}
