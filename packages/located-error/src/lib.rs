//! A wrapper around an error that includes the source location where the
//! error was wrapped.
//!
//! Deep call chains make "database timeout" style messages useless on their
//! own. Wrapping the source error at the boundary where it is converted
//! captures the file and line of that boundary:
//!
//! ```rust
//! use reef_tracker_located_error::{Located, LocatedError};
//!
//! #[derive(thiserror::Error, Debug)]
//! enum TestError {
//!     #[error("test")]
//!     Test,
//! }
//!
//! let error: LocatedError<TestError> = Located(TestError::Test).into();
//!
//! assert!(error.to_string().contains("test, src/lib.rs"));
//! ```
use std::error::Error;
use std::panic::Location;
use std::sync::Arc;

use tracing::debug;

pub type DynError = Arc<dyn std::error::Error + Send + Sync>;

/// A newtype to wrap a source error before converting it into a
/// [`LocatedError`]. The conversion is where the location is captured.
pub struct Located<E>(pub E);

/// An error together with the location where it was wrapped.
#[derive(Debug)]
pub struct LocatedError<'a, E>
where
    E: Error + ?Sized + Send + Sync,
{
    source: Arc<E>,
    location: Box<Location<'a>>,
}

impl<E> LocatedError<'_, E>
where
    E: Error + ?Sized + Send + Sync,
{
    #[must_use]
    pub fn location(&self) -> &Location<'_> {
        &self.location
    }
}

impl<E> std::fmt::Display for LocatedError<'_, E>
where
    E: Error + ?Sized + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.source, self.location)
    }
}

impl<E> Error for LocatedError<'_, E>
where
    E: Error + ?Sized + Send + Sync + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

impl<E> Clone for LocatedError<'_, E>
where
    E: Error + ?Sized + Send + Sync,
{
    fn clone(&self) -> Self {
        LocatedError {
            source: self.source.clone(),
            location: self.location.clone(),
        }
    }
}

impl<'a, E> From<Located<E>> for LocatedError<'a, E>
where
    E: Error + Send + Sync,
{
    #[track_caller]
    fn from(wrapped: Located<E>) -> Self {
        let error = LocatedError {
            source: Arc::new(wrapped.0),
            location: Box::new(*Location::caller()),
        };
        debug!("{error}");
        error
    }
}

impl<'a> From<DynError> for LocatedError<'a, dyn std::error::Error + Send + Sync> {
    #[track_caller]
    fn from(source: DynError) -> Self {
        LocatedError {
            source,
            location: Box::new(*Location::caller()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::Location;
    use std::sync::Arc;

    use super::{DynError, Located, LocatedError};

    #[derive(thiserror::Error, Debug)]
    enum TestError {
        #[error("test")]
        Test,
    }

    #[track_caller]
    fn get_caller_location() -> Location<'static> {
        *Location::caller()
    }

    #[test]
    fn error_should_include_the_location_it_was_wrapped_at() {
        let error: LocatedError<'_, TestError> = Located(TestError::Test).into();
        let here = get_caller_location();

        assert_eq!(error.location().file(), here.file());
    }

    #[test]
    fn display_should_include_source_message_and_location() {
        let error: LocatedError<'_, TestError> = Located(TestError::Test).into();

        let rendered = error.to_string();

        assert!(rendered.starts_with("test, "));
        assert!(rendered.contains("src/lib.rs"));
    }

    #[test]
    fn a_type_erased_error_should_be_wrappable_too() {
        let source: DynError = Arc::new(TestError::Test);

        let error: LocatedError<'_, dyn std::error::Error + Send + Sync> = source.into();

        assert!(error.to_string().contains("test"));
    }
}
