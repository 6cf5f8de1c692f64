//! Helpers for testing simulations with predictable random variables.

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::cell::Cell;

use rand::distributions::Distribution;

/// This distribution ignores the random number generator and returns the given values in order,
/// starting over after the last one.
///
/// It is meant for testing: a simulation driven by scripted durations can be checked against
/// hand-computed expectations.
///
/// # Examples
///
/// ```
/// # use rand::distributions::Distribution;
/// # use testing::Scripted;
/// let dist = Scripted::new(vec![1.0, 2.0]);
/// let mut rng = rand::rngs::mock::StepRng::new(0, 1);
/// assert_eq!(dist.sample(&mut rng), 1.0);
/// assert_eq!(dist.sample(&mut rng), 2.0);
/// assert_eq!(dist.sample(&mut rng), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Scripted<T> {
    values: Vec<T>,
    next: Cell<usize>,
}

impl<T> Scripted<T> {
    /// Constructs a distribution cycling through `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    #[must_use]
    pub fn new(values: Vec<T>) -> Self {
        assert!(!values.is_empty(), "scripted distribution needs values");
        Self {
            values,
            next: Cell::new(0),
        }
    }

    /// Number of values sampled so far.
    #[must_use]
    pub fn sampled(&self) -> usize {
        self.next.get()
    }
}

impl<T: Copy> Distribution<T> for Scripted<T> {
    fn sample<R: rand::Rng + ?Sized>(&self, _: &mut R) -> T {
        let idx = self.next.get();
        self.next.replace(idx + 1);
        self.values[idx % self.values.len()]
    }
}

/// Always returns the same value, like a distribution with zero variance.
#[derive(Debug, Clone, Copy)]
pub struct Fixed<T>(pub T);

impl<T: Copy> Distribution<T> for Fixed<T> {
    fn sample<R: rand::Rng + ?Sized>(&self, _: &mut R) -> T {
        self.0
    }
}
