//! Error types shared by every control entry point.
//!
//! Platform seams (device factories, render surfaces, host windows, user callbacks)
//! report failures as [`anyhow::Error`]. The core converts them into
//! [`ControlError`] at the boundary of each public operation, so callers only ever
//! see one error convention.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

/// Result alias used by all public control operations.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Coarse classification of a [`ControlError`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A required argument was missing or the requested value does not exist yet.
    InvalidArgument,
    /// The operation was attempted from the wrong thread or in the wrong state.
    InvalidState,
    /// An underlying device, drawing-session or host call failed.
    Platform,
    /// A registered user callback failed.
    Callback,
}

/// Which user callback produced a [`ControlError::Callback`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CallbackKind {
    Draw,
    CreateResources,
    /// User code panicked inside an entry point.
    Panic,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackKind::Draw => "draw",
            CallbackKind::CreateResources => "create-resources",
            CallbackKind::Panic => "panicking",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("platform call failed: {context}")]
    Platform {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{kind} callback failed")]
    Callback {
        kind: CallbackKind,
        #[source]
        source: anyhow::Error,
    },
}

impl ControlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControlError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ControlError::InvalidState(_) => ErrorKind::InvalidState,
            ControlError::Platform { .. } => ErrorKind::Platform,
            ControlError::Callback { .. } => ErrorKind::Callback,
        }
    }

    pub fn platform(context: impl Into<String>, source: anyhow::Error) -> Self {
        ControlError::Platform {
            context: context.into(),
            source,
        }
    }

    pub fn callback(kind: CallbackKind, source: anyhow::Error) -> Self {
        ControlError::Callback { kind, source }
    }
}

/// Runs the body of a public entry point.
///
/// Errors from `body` are logged and returned unchanged. A panic raised by user code
/// inside `body` is caught and reported as a [`CallbackKind::Panic`] callback error.
pub fn boundary<T>(entry: &'static str, body: impl FnOnce() -> Result<T>) -> Result<T> {
    let outcome = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(ControlError::callback(
            CallbackKind::Panic,
            anyhow::anyhow!("{entry}: {}", panic_message(payload.as_ref())),
        )),
    };

    if let Err(err) = &outcome {
        log::warn!("{entry} failed: {err:#}");
    }

    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
