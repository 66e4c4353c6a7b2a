//! Combinators for per-reactor results.
//!
//! Pull and query dispatch return one [`ReactorResult`] per reactor. `std`
//! already covers most of what callers need (`map`, `and_then`,
//! `unwrap_or_else`, `or_else`); [`OutcomeExt`] adds the remaining ones.

use crate::error::ReactorError;

/// Extra combinators on `Result<T, ReactorError>`.
pub trait OutcomeExt<T> {
    /// Replaces a failure with a value computed from it.
    fn recover(self, f: impl FnOnce(ReactorError) -> T) -> Result<T, ReactorError>;

    /// Collapses both branches into one value.
    fn fold<B>(self, on_failure: impl FnOnce(ReactorError) -> B, on_success: impl FnOnce(T) -> B) -> B;

    /// Continues with `on_success` or `on_failure`, both of which may fail.
    fn transform(
        self,
        on_success: impl FnOnce(T) -> Result<T, ReactorError>,
        on_failure: impl FnOnce(ReactorError) -> Result<T, ReactorError>,
    ) -> Result<T, ReactorError>;
}

impl<T> OutcomeExt<T> for Result<T, ReactorError> {
    fn recover(self, f: impl FnOnce(ReactorError) -> T) -> Result<T, ReactorError> {
        Ok(self.unwrap_or_else(f))
    }

    fn fold<B>(self, on_failure: impl FnOnce(ReactorError) -> B, on_success: impl FnOnce(T) -> B) -> B {
        match self {
            Ok(value) => on_success(value),
            Err(error) => on_failure(error),
        }
    }

    fn transform(
        self,
        on_success: impl FnOnce(T) -> Result<T, ReactorError>,
        on_failure: impl FnOnce(ReactorError) -> Result<T, ReactorError>,
    ) -> Result<T, ReactorError> {
        match self {
            Ok(value) => on_success(value),
            Err(error) => on_failure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success() -> Result<String, ReactorError> {
        Ok("success".to_string())
    }

    fn failure() -> Result<String, ReactorError> {
        Err(ReactorError::failed("boom"))
    }

    #[test]
    fn test_success_combinators() {
        assert_eq!(success().map(|s| format!("other {s}")).unwrap(), "other success");
        assert_eq!(success().and_then(|_| Ok::<_, ReactorError>(123)).unwrap(), 123);
        assert_eq!(success().unwrap_or_else(|_| "not valid".into()), "success");
        assert_eq!(success().recover(|_| "alternative".into()).unwrap(), "success");
        assert_eq!(
            success()
                .transform(|s| Ok(format!("other {s}")), Err)
                .unwrap(),
            "other success"
        );
        assert_eq!(success().fold(|_| 0, |s| s.len()), 7);
    }

    #[test]
    fn test_failure_combinators() {
        assert!(failure().map(|s| format!("other {s}")).is_err());
        assert_eq!(failure().unwrap_or_else(|_| "alternative".into()), "alternative");
        assert_eq!(failure().recover(|_| "recovered".into()).unwrap(), "recovered");
        assert_eq!(
            failure().or_else(|_| Ok::<_, ReactorError>("retry".to_string())).unwrap(),
            "retry"
        );
        assert_eq!(
            failure()
                .transform(|s| Ok(format!("other {s}")), |_| Ok("alternative".into()))
                .unwrap(),
            "alternative"
        );
        assert_eq!(failure().fold(|e| e.to_string(), |s| s), "reactor failed: boom");
    }
}
