//! Distributions of non-negative durations.

use rand::Rng;
use rand_distr::{Distribution, Exp, Normal, Uniform};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::{Error, Result};

/// Configuration of a distribution of durations (inter-arrival or service times).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DurationDistribution {
    /// Exponential distribution with the given rate, i.e., with mean `1 / rate`.
    Exponential {
        /// Events per unit of time.
        rate: f64,
    },
    /// Normal distribution restricted to non-negative values.
    ///
    /// Note that `mean` and `std_dev` are the parameters of the underlying normal distribution,
    /// and the mean of the truncated one is higher. A zero `std_dev` makes it deterministic.
    TruncatedNormal {
        /// Mean of the underlying normal distribution.
        mean: f64,
        /// Standard deviation of the underlying normal distribution.
        std_dev: f64,
    },
    /// Always the same value.
    Constant {
        /// The value.
        value: f64,
    },
    /// Uniform distribution on `[low, high)`.
    Uniform {
        /// Lower bound, inclusive.
        low: f64,
        /// Upper bound, exclusive.
        high: f64,
    },
}

fn invalid<T>(msg: String) -> Result<T> {
    Err(Error::InvalidConfiguration(msg))
}

fn std_normal_pdf(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

fn std_normal_sf(x: f64) -> f64 {
    erfc(x / std::f64::consts::SQRT_2) / 2.0
}

impl DurationDistribution {
    /// Checks that all parameters are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] describing the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Exponential { rate } => {
                if !(rate.is_finite() && rate > 0.0) {
                    return invalid(format!("exponential rate must be positive, got {}", rate));
                }
            }
            Self::TruncatedNormal { mean, std_dev } => {
                if !(mean.is_finite() && mean > 0.0) {
                    return invalid(format!("truncated normal mean must be positive, got {}", mean));
                }
                if !(std_dev.is_finite() && std_dev >= 0.0) {
                    return invalid(format!(
                        "truncated normal standard deviation must be non-negative, got {}",
                        std_dev
                    ));
                }
            }
            Self::Constant { value } => {
                if !(value.is_finite() && value > 0.0) {
                    return invalid(format!("constant duration must be positive, got {}", value));
                }
            }
            Self::Uniform { low, high } => {
                if !(low.is_finite() && high.is_finite() && low >= 0.0 && low < high) {
                    return invalid(format!(
                        "uniform bounds must satisfy 0 <= low < high, got [{}, {})",
                        low, high
                    ));
                }
            }
        }
        Ok(())
    }

    /// Builds a sampler for this distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the parameters are invalid.
    pub fn sampler(&self) -> Result<Sampler> {
        self.validate()?;
        let sampler = match *self {
            Self::Exponential { rate } => Sampler::Exponential(
                Exp::new(rate).map_err(|e| Error::InvalidConfiguration(e.to_string()))?,
            ),
            Self::TruncatedNormal { mean, std_dev } if std_dev == 0.0 => Sampler::Constant(mean),
            Self::TruncatedNormal { mean, std_dev } => Sampler::TruncatedNormal(
                Normal::new(mean, std_dev)
                    .map_err(|e| Error::InvalidConfiguration(e.to_string()))?,
            ),
            Self::Constant { value } => Sampler::Constant(value),
            Self::Uniform { low, high } => Sampler::Uniform(Uniform::new(low, high)),
        };
        Ok(sampler)
    }

    /// Mean of the distribution.
    #[must_use]
    pub fn mean(&self) -> f64 {
        match *self {
            Self::Exponential { rate } => 1.0 / rate,
            Self::TruncatedNormal { mean, std_dev } if std_dev == 0.0 => mean,
            Self::TruncatedNormal { mean, std_dev } => {
                let alpha = -mean / std_dev;
                mean + std_dev * std_normal_pdf(alpha) / std_normal_sf(alpha)
            }
            Self::Constant { value } => value,
            Self::Uniform { low, high } => (low + high) / 2.0,
        }
    }

    /// Variance of the distribution.
    #[must_use]
    pub fn variance(&self) -> f64 {
        match *self {
            Self::Exponential { rate } => 1.0 / (rate * rate),
            Self::TruncatedNormal { std_dev, .. } if std_dev == 0.0 => 0.0,
            Self::TruncatedNormal { mean, std_dev } => {
                let alpha = -mean / std_dev;
                let hazard = std_normal_pdf(alpha) / std_normal_sf(alpha);
                std_dev * std_dev * (1.0 + alpha * hazard - hazard * hazard)
            }
            Self::Constant { .. } => 0.0,
            Self::Uniform { low, high } => (high - low) * (high - low) / 12.0,
        }
    }
}

/// Samples non-negative durations, see [`DurationDistribution`].
#[derive(Debug, Clone, Copy)]
pub enum Sampler {
    /// Exponential distribution.
    Exponential(Exp<f64>),
    /// Normal distribution, resampled until the value is non-negative.
    TruncatedNormal(Normal<f64>),
    /// Deterministic value.
    Constant(f64),
    /// Uniform distribution.
    Uniform(Uniform<f64>),
}

impl Distribution<f64> for Sampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Exponential(dist) => dist.sample(rng),
            Self::TruncatedNormal(dist) => loop {
                let value = dist.sample(rng);
                if value >= 0.0 {
                    break value;
                }
            },
            Self::Constant(value) => *value,
            Self::Uniform(dist) => dist.sample(rng),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_mean(dist: &DurationDistribution, n: usize) -> f64 {
        let sampler = dist.sampler().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let values: Vec<f64> = (0..n).map(|_| sampler.sample(&mut rng)).collect();
        assert!(values.iter().all(|&v| v >= 0.0));
        values.iter().sum::<f64>() / n as f64
    }

    #[test]
    fn test_truncated_normal_is_resampled_not_clamped() {
        let dist = DurationDistribution::TruncatedNormal {
            mean: 0.5,
            std_dev: 1.0,
        };
        // Truncated mean is about 1.009; clamping negative draws to zero would give about 0.698.
        assert!(approx_eq!(f64, dist.mean(), 1.0092, epsilon = 1e-3));
        let mean = sample_mean(&dist, 100_000);
        assert!((mean - dist.mean()).abs() < 0.02, "sample mean {}", mean);
    }

    #[test]
    fn test_truncation_negligible_far_from_zero() {
        let dist = DurationDistribution::TruncatedNormal {
            mean: 10.0,
            std_dev: 1.0,
        };
        assert!(approx_eq!(f64, dist.mean(), 10.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, dist.variance(), 1.0, epsilon = 1e-9));
    }

    #[test]
    fn test_zero_variance_normal_is_deterministic() {
        let dist = DurationDistribution::TruncatedNormal {
            mean: 2.0,
            std_dev: 0.0,
        };
        let sampler = dist.sampler().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!((0..10).all(|_| sampler.sample(&mut rng) == 2.0));
        assert_eq!(dist.mean(), 2.0);
        assert_eq!(dist.variance(), 0.0);
    }

    #[test]
    fn test_exponential_mean() {
        let dist = DurationDistribution::Exponential { rate: 2.0 };
        assert_eq!(dist.mean(), 0.5);
        assert_eq!(dist.variance(), 0.25);
        assert!((sample_mean(&dist, 100_000) - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_uniform() {
        let dist = DurationDistribution::Uniform {
            low: 1.0,
            high: 3.0,
        };
        assert_eq!(dist.mean(), 2.0);
        assert!(approx_eq!(f64, dist.variance(), 1.0 / 3.0, ulps = 2));
        assert!((sample_mean(&dist, 10_000) - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_invalid_parameters() {
        let invalid = [
            DurationDistribution::Exponential { rate: 0.0 },
            DurationDistribution::Exponential { rate: -1.0 },
            DurationDistribution::Exponential { rate: f64::NAN },
            DurationDistribution::TruncatedNormal {
                mean: 0.0,
                std_dev: 1.0,
            },
            DurationDistribution::TruncatedNormal {
                mean: 1.0,
                std_dev: -1.0,
            },
            DurationDistribution::Constant { value: 0.0 },
            DurationDistribution::Uniform {
                low: 2.0,
                high: 1.0,
            },
            DurationDistribution::Uniform {
                low: -1.0,
                high: 1.0,
            },
        ];
        for dist in &invalid {
            assert!(
                matches!(dist.sampler(), Err(Error::InvalidConfiguration(_))),
                "{:?} accepted",
                dist
            );
        }
    }

    #[test]
    fn test_deserialize() {
        let dist: DurationDistribution =
            serde_json::from_str(r#"{"type":"truncated_normal","mean":1.5,"std_dev":0.25}"#)
                .unwrap();
        assert_eq!(
            dist,
            DurationDistribution::TruncatedNormal {
                mean: 1.5,
                std_dev: 0.25
            }
        );
    }
}
