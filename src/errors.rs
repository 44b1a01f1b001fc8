//! Unified error taxonomy for the workflow engine.
//!
//! Every subsystem maps its failures onto these categories so the watchers
//! can make a single retry/skip/abort decision regardless of where the error
//! originated. Each error carries a free-form context map.

use std::fmt;

use thiserror::Error;

/// Free-form key/value context attached to an error at the point it is
/// raised (issue number, label, subprocess args, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext(Vec<(String, String)>);

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SobaError {
    #[error("not found: {message}{}", fmt_ctx(.context))]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    #[error("validation failed: {message}{}", fmt_ctx(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// Invalid phase transition or an operation against a protected resource.
    #[error("conflict: {message}{}", fmt_ctx(.context))]
    Conflict {
        message: String,
        context: ErrorContext,
    },

    #[error("permission denied: {message}{}", fmt_ctx(.context))]
    Permission {
        message: String,
        context: ErrorContext,
    },

    /// Network failure, 5xx, or timeout. Safe to retry on the next tick.
    #[error("transient failure: {message}{}", fmt_ctx(.context))]
    Transient {
        message: String,
        context: ErrorContext,
    },

    /// Subprocess exited non-zero.
    #[error("external command failed: {message}{}", fmt_ctx(.context))]
    External {
        message: String,
        context: ErrorContext,
    },

    #[error("internal error: {message}{}", fmt_ctx(.context))]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

fn fmt_ctx(ctx: &ErrorContext) -> String {
    if ctx.is_empty() {
        String::new()
    } else {
        format!(" ({ctx})")
    }
}

macro_rules! constructor {
    ($name:ident, $variant:ident) => {
        pub fn $name(message: impl Into<String>) -> Self {
            SobaError::$variant {
                message: message.into(),
                context: ErrorContext::new(),
            }
        }
    };
}

impl SobaError {
    constructor!(not_found, NotFound);
    constructor!(validation, Validation);
    constructor!(conflict, Conflict);
    constructor!(permission, Permission);
    constructor!(transient, Transient);
    constructor!(external, External);
    constructor!(internal, Internal);

    /// Attach a context entry, preserving the category.
    pub fn with_context(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let ctx = match &mut self {
            SobaError::NotFound { context, .. }
            | SobaError::Validation { context, .. }
            | SobaError::Conflict { context, .. }
            | SobaError::Permission { context, .. }
            | SobaError::Transient { context, .. }
            | SobaError::External { context, .. }
            | SobaError::Internal { context, .. } => context,
        };
        *ctx = std::mem::take(ctx).with(key, value);
        self
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, SobaError::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SobaError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SobaError>;
