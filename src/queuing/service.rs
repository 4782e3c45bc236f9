//! Exponential service process for inspection booths

use crate::types::ServiceTimeModel;
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

/// Shortest service time the jittered model will produce, in minutes
pub const MIN_VARIABLE_SERVICE_MINUTES: f64 = 0.1;

/// Draws service durations (minutes) for one booth
///
/// `service_rate` is in completions per minute; the mean service time is its
/// reciprocal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceProcess {
    service_rate: f64,
    service_time_variation: f64,
}

impl ServiceProcess {
    /// Create a service process with the default jitter coefficient
    pub fn new(service_rate: f64) -> Self {
        Self {
            service_rate,
            service_time_variation: crate::types::defaults::SERVICE_TIME_VARIATION,
        }
    }

    /// Set the coefficient of variation used by the jittered model
    pub fn with_variation(mut self, service_time_variation: f64) -> Self {
        self.service_time_variation = service_time_variation.max(0.0);
        self
    }

    /// Completions per minute
    pub fn service_rate(&self) -> f64 {
        self.service_rate
    }

    /// Replace the service rate
    pub fn set_service_rate(&mut self, service_rate: f64) {
        self.service_rate = service_rate;
    }

    /// Mean service time in minutes
    pub fn mean_service_time(&self) -> f64 {
        if self.service_rate > 0.0 {
            1.0 / self.service_rate
        } else {
            f64::INFINITY
        }
    }

    /// Jitter coefficient
    pub fn service_time_variation(&self) -> f64 {
        self.service_time_variation
    }

    /// Rate multiplier for the hour of day
    ///
    /// Rush hours process slower, nights faster.
    pub fn time_of_day_factor(hour: u32) -> f64 {
        match hour % 24 {
            6..=8 => 0.8,
            16..=18 => 0.7,
            h if h >= 22 || h < 4 => 1.2,
            _ => 1.0,
        }
    }

    /// Rate multiplier for officer fatigue under a long queue
    pub fn congestion_factor(queue_length: usize) -> f64 {
        if queue_length > 20 {
            0.8
        } else if queue_length > 10 {
            0.9
        } else {
            1.0
        }
    }

    /// Effective rate under the given conditions
    pub fn service_rate_at(&self, hour: u32, queue_length: usize) -> f64 {
        self.service_rate * Self::time_of_day_factor(hour) * Self::congestion_factor(queue_length)
    }

    /// Exponential draw with mean `1 / service_rate`
    pub fn generate_service_time<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        exponential_minutes(self.service_rate, rng)
    }

    /// Exponential draw with the rate adjusted for hour and queue length
    pub fn generate_service_time_with_conditions<R: Rng + ?Sized>(
        &self,
        hour: u32,
        queue_length: usize,
        rng: &mut R,
    ) -> f64 {
        exponential_minutes(self.service_rate_at(hour, queue_length), rng)
    }

    /// Exponential draw plus `Normal(0, service_time_variation)`, at least 0.1 minutes
    pub fn generate_variable_service_time<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let base = self.generate_service_time(rng);
        let jitter = match Normal::new(0.0, self.service_time_variation) {
            Ok(normal) => normal.sample(rng),
            Err(_) => 0.0,
        };
        (base + jitter).max(MIN_VARIABLE_SERVICE_MINUTES)
    }

    /// Draw according to `model`
    pub fn sample<R: Rng + ?Sized>(
        &self,
        model: ServiceTimeModel,
        hour: u32,
        queue_length: usize,
        rng: &mut R,
    ) -> f64 {
        match model {
            ServiceTimeModel::Exponential => self.generate_service_time(rng),
            ServiceTimeModel::Conditional => {
                self.generate_service_time_with_conditions(hour, queue_length, rng)
            }
            ServiceTimeModel::Variable => self.generate_variable_service_time(rng),
        }
    }
}

fn exponential_minutes<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> f64 {
    if !(rate.is_finite() && rate > 0.0) {
        return f64::INFINITY;
    }
    match Exp::new(rate) {
        Ok(exp) => exp.sample(rng),
        Err(_) => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mean_of(n: usize, mut draw: impl FnMut() -> f64) -> f64 {
        (0..n).map(|_| draw()).sum::<f64>() / n as f64
    }

    #[test]
    fn test_exponential_mean() {
        let mut rng = StdRng::seed_from_u64(11);
        let process = ServiceProcess::new(3.0);
        let mean = mean_of(20_000, || process.generate_service_time(&mut rng));
        assert!((mean - 1.0 / 3.0).abs() < 0.015, "mean service time {}", mean);
    }

    #[test]
    fn test_conditional_factors() {
        let process = ServiceProcess::new(2.0);
        assert_eq!(process.service_rate_at(12, 0), 2.0);
        assert!((process.service_rate_at(7, 0) - 1.6).abs() < 1e-12);
        assert!((process.service_rate_at(17, 0) - 1.4).abs() < 1e-12);
        assert!((process.service_rate_at(23, 0) - 2.4).abs() < 1e-12);
        assert!((process.service_rate_at(12, 11) - 1.8).abs() < 1e-12);
        assert!((process.service_rate_at(12, 21) - 1.6).abs() < 1e-12);
        assert!((process.service_rate_at(17, 25) - 2.0 * 0.7 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_conditional_draws_slower_under_congestion() {
        let process = ServiceProcess::new(3.0);
        let mut rng = StdRng::seed_from_u64(5);
        let calm =
            mean_of(10_000, || process.generate_service_time_with_conditions(12, 0, &mut rng));
        let busy =
            mean_of(10_000, || process.generate_service_time_with_conditions(17, 30, &mut rng));
        assert!(busy > calm);
    }

    #[test]
    fn test_variable_service_time_floor() {
        let mut rng = StdRng::seed_from_u64(9);
        let process = ServiceProcess::new(50.0).with_variation(0.5);
        for _ in 0..1000 {
            assert!(process.generate_variable_service_time(&mut rng) >= 0.1);
        }
    }

    #[test]
    fn test_zero_variation_is_plain_exponential_with_floor() {
        let process = ServiceProcess::new(3.0).with_variation(0.0);
        let mut a = StdRng::seed_from_u64(21);
        let mut b = StdRng::seed_from_u64(21);
        let plain = process.generate_service_time(&mut a).max(0.1);
        let varied = process.generate_variable_service_time(&mut b);
        assert!((plain - varied).abs() < 1e-12);
    }

    #[test]
    fn test_non_positive_rate_is_infinite() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut process = ServiceProcess::new(3.0);
        process.set_service_rate(0.0);
        assert!(process.generate_service_time(&mut rng).is_infinite());
        assert!(process.mean_service_time().is_infinite());
    }
}
