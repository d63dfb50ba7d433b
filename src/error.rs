//! Error types for task orchestration.
//!
//! - [`TaskError`] is one captured failure: the operation's own error, a panic, or an abort.
//! - [`AggregateError`] packages every failure of a concurrent batch into one value.
//! - [`BuildError`] reports invalid configuration.
use std::fmt;
use thiserror::Error;

/// One captured task failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError<E> {
    /// The operation returned an error.
    #[error("{0}")]
    Inner(E),
    /// The operation panicked; the payload is rendered to a message.
    #[error("task panicked: {message}")]
    Panicked { message: String },
    /// The worker owning the task was torn down before it recorded a result.
    #[error("task was aborted before it settled")]
    Aborted,
}

impl<E> TaskError<E> {
    /// Short label for the failure: the type name of `E`, `Panic`, or `Aborted`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inner(_) => short_type_name::<E>(),
            Self::Panicked { .. } => "Panic",
            Self::Aborted => "Aborted",
        }
    }

    /// Check if this failure was a panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }

    /// Check if this failure was an abort.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Check if this error wraps an inner error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Get the inner error if this is an Inner variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Panic message, if this failure was a panic.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            Self::Panicked { message } => Some(message),
            _ => None,
        }
    }

    /// Transform the inner error, keeping panics and aborts as they are.
    pub fn map_inner<F, U>(self, f: F) -> TaskError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            Self::Inner(e) => TaskError::Inner(f(e)),
            Self::Panicked { message } => TaskError::Panicked { message },
            Self::Aborted => TaskError::Aborted,
        }
    }
}

fn short_type_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

/// Every failure from a concurrent batch, ordered by the position of the failed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError<E> {
    errors: Vec<TaskError<E>>,
}

impl<E> AggregateError<E> {
    pub fn new(errors: Vec<TaskError<E>>) -> Self {
        Self { errors }
    }

    /// `AggregateError(<name>...)` where `<name>` comes from the first named error.
    pub fn name(&self) -> String {
        match self.errors.iter().map(TaskError::name).find(|name| !name.is_empty()) {
            Some(name) => format!("AggregateError({}...)", name),
            None => "AggregateError".to_string(),
        }
    }

    pub fn errors(&self) -> &[TaskError<E>] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<TaskError<E>> {
        self.errors
    }

    pub fn first(&self) -> Option<&TaskError<E>> {
        self.errors.first()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaskError<E>> {
        self.errors.iter()
    }
}

impl<E> fmt::Display for AggregateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregateError with {} errors", self.errors.len())
    }
}

impl<E> std::error::Error for AggregateError<E>
where
    E: fmt::Debug + fmt::Display + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors.first().map(|e| e as &dyn std::error::Error)
    }
}

impl<E> IntoIterator for AggregateError<E> {
    type Item = TaskError<E>;
    type IntoIter = std::vec::IntoIter<TaskError<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a AggregateError<E> {
    type Item = &'a TaskError<E>;
    type IntoIter = std::slice::Iter<'a, TaskError<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Errors produced while building a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Retry `times` must be > 0.
    #[error("times must be > 0 (got {0})")]
    InvalidAttempts(usize),
    /// Concurrency `limit` must be > 0.
    #[error("limit must be > 0 (got {0})")]
    InvalidLimit(usize),
}
