//! What a single attempt reports back to the retry loop.

/// Result of one invocation of the operation passed to `Backoff::run`.
///
/// | Outcome            | Effect                                              |
/// |--------------------|-----------------------------------------------------|
/// | `Success(v)`       | stop, return `Ok(v)`                                 |
/// | `Retry(e)`         | wait and try again, or return `Err(e)` if exhausted  |
/// | `Bail(Err(e))`     | stop now, return `Err(e)` without waiting            |
/// | `Bail(Ok(v))`      | stop now, return `Ok(v)` without waiting             |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The operation succeeded.
    Success(T),
    /// The operation failed and may be attempted again.
    Retry(E),
    /// Retrying is pointless; the carried result is returned as-is.
    Bail(Result<T, E>),
}

impl<T, E> Outcome<T, E> {
    /// Bail out with an error.
    pub fn bail(err: E) -> Self {
        Outcome::Bail(Err(err))
    }

    /// True for both `Bail` forms.
    pub fn is_bail(&self) -> bool {
        matches!(self, Outcome::Bail(_))
    }
}

impl<E> Outcome<(), E> {
    /// Bail out without an error.
    pub fn stop() -> Self {
        Outcome::Bail(Ok(()))
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    /// `Ok` succeeds, `Err` is retryable.
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Retry(err),
        }
    }
}
