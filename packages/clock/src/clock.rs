//! Working and stopped clocks behind a common [`Time`] trait.
use std::time::Duration;

use reef_tracker_primitives::DurationSinceUnixEpoch;

/// A clock the tracker can ask for the current time.
pub trait Time: Sized {
    fn now() -> DurationSinceUnixEpoch;

    /// The current time plus `add`. `None` on overflow.
    #[must_use]
    fn now_add(add: &Duration) -> Option<DurationSinceUnixEpoch> {
        Self::now().checked_add(*add)
    }

    /// The current time minus `sub`. `None` when that would be before the
    /// Unix Epoch.
    #[must_use]
    fn now_sub(sub: &Duration) -> Option<DurationSinceUnixEpoch> {
        Self::now().checked_sub(*sub)
    }
}

/// The production clock. It returns the system time.
#[derive(Debug)]
pub struct Working;

impl Time for Working {
    fn now() -> DurationSinceUnixEpoch {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .expect("system time is after the Unix Epoch")
    }
}

/// The test clock. It returns a fixed time that only moves when a test tells
/// it to, so expiry windows and cookie lifetimes can be exercised without
/// sleeping.
#[derive(Debug)]
pub struct Stopped;

impl Time for Stopped {
    fn now() -> DurationSinceUnixEpoch {
        stopped::FIXED_TIME.with(|time| *time.borrow())
    }
}

pub mod stopped {
    //! Controls for the [`Stopped`](super::Stopped) clock.
    //!
    //! The fixed time is thread local, so concurrently running tests do not
    //! interfere with each other.
    use std::cell::RefCell;
    use std::time::Duration;

    use reef_tracker_primitives::DurationSinceUnixEpoch;

    use super::Time;

    thread_local! {
        pub(super) static FIXED_TIME: RefCell<DurationSinceUnixEpoch> = const { RefCell::new(Duration::ZERO) };
    }

    /// Trait with the operations to move a stopped clock around.
    pub trait Stopped: Time {
        /// Sets the clock to a specific timestamp.
        fn local_set(unix_time: &DurationSinceUnixEpoch);

        /// Sets the clock to the Unix Epoch (timestamp `0`).
        fn local_set_to_unix_epoch() {
            Self::local_set(&Duration::ZERO);
        }

        /// Sets the clock to the actual system time.
        fn local_set_to_system_time_now();

        /// Advances the clock by `duration`.
        ///
        /// # Errors
        ///
        /// Returns an error when the resulting time would overflow.
        fn local_add(duration: &Duration) -> Result<(), IllegalTimeError>;

        /// Rewinds the clock by `duration`.
        ///
        /// # Errors
        ///
        /// Returns an error when the resulting time would be before the Unix
        /// Epoch.
        fn local_sub(duration: &Duration) -> Result<(), IllegalTimeError>;
    }

    /// The requested adjustment would move the clock out of the representable
    /// range.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IllegalTimeError;

    impl std::fmt::Display for IllegalTimeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "clock adjustment out of range")
        }
    }

    impl std::error::Error for IllegalTimeError {}

    impl Stopped for super::Stopped {
        fn local_set(unix_time: &DurationSinceUnixEpoch) {
            FIXED_TIME.with(|time| *time.borrow_mut() = *unix_time);
        }

        fn local_set_to_system_time_now() {
            Self::local_set(&super::Working::now());
        }

        fn local_add(duration: &Duration) -> Result<(), IllegalTimeError> {
            FIXED_TIME.with(|time| {
                let new_time = time.borrow().checked_add(*duration).ok_or(IllegalTimeError)?;
                *time.borrow_mut() = new_time;
                Ok(())
            })
        }

        fn local_sub(duration: &Duration) -> Result<(), IllegalTimeError> {
            FIXED_TIME.with(|time| {
                let new_time = time.borrow().checked_sub(*duration).ok_or(IllegalTimeError)?;
                *time.borrow_mut() = new_time;
                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::stopped::Stopped as _;
    use super::{Stopped, Time, Working};

    #[test]
    fn the_working_clock_should_return_a_time_after_the_unix_epoch() {
        assert!(Working::now() > Duration::ZERO);
    }

    #[test]
    fn the_stopped_clock_should_return_a_fixed_time() {
        Stopped::local_set(&Duration::from_secs(100));

        assert_eq!(Stopped::now(), Duration::from_secs(100));
        assert_eq!(Stopped::now(), Duration::from_secs(100));
    }

    #[test]
    fn the_stopped_clock_should_support_adding_time() {
        Stopped::local_set(&Duration::from_secs(100));

        Stopped::local_add(&Duration::from_secs(20)).unwrap();

        assert_eq!(Stopped::now(), Duration::from_secs(120));
    }

    #[test]
    fn the_stopped_clock_should_support_subtracting_time() {
        Stopped::local_set(&Duration::from_secs(100));

        Stopped::local_sub(&Duration::from_secs(20)).unwrap();

        assert_eq!(Stopped::now(), Duration::from_secs(80));
    }

    #[test]
    fn the_stopped_clock_should_reject_rewinding_past_the_unix_epoch() {
        Stopped::local_set_to_unix_epoch();

        assert!(Stopped::local_sub(&Duration::from_secs(1)).is_err());
    }

    #[test]
    fn now_add_should_be_relative_to_the_clock_time() {
        Stopped::local_set(&Duration::from_secs(100));

        assert_eq!(Stopped::now_add(&Duration::from_secs(5)), Some(Duration::from_secs(105)));
    }

    #[test]
    fn now_sub_should_return_none_before_the_unix_epoch() {
        Stopped::local_set_to_unix_epoch();

        assert_eq!(Stopped::now_sub(&Duration::from_secs(5)), None);
    }
}
