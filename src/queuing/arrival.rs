//! Poisson arrival process with time-of-day modulation

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Hour of day (0-23) for a simulation clock that starts at midnight
pub fn hour_of_day(seconds: f64) -> u32 {
    if !seconds.is_finite() {
        return 0;
    }
    ((seconds / SECONDS_PER_HOUR).floor() as i64).rem_euclid(24) as u32
}

/// Generates car arrivals with exponential inter-arrival times
///
/// The base rate is system-wide, in cars per minute. When time-of-day
/// modulation is on, the effective rate is scaled by the hour band:
///
/// | hours        | factor |
/// |--------------|--------|
/// | 06:00-09:00  | 0.75   |
/// | 16:00-19:00  | 0.9    |
/// | 22:00-04:00  | 0.1    |
/// | otherwise    | 1.0    |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalProcess {
    base_rate: f64,
    time_of_day_modulation: bool,
}

impl ArrivalProcess {
    /// Create a time-of-day modulated process
    pub fn new(base_rate: f64) -> Self {
        Self { base_rate, time_of_day_modulation: true }
    }

    /// Create a homogeneous Poisson process
    pub fn constant(base_rate: f64) -> Self {
        Self { base_rate, time_of_day_modulation: false }
    }

    /// Enable or disable time-of-day modulation
    pub fn with_time_of_day_modulation(mut self, enabled: bool) -> Self {
        self.time_of_day_modulation = enabled;
        self
    }

    /// Base arrival rate (cars/minute)
    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    /// Whether the rate follows the hour of day
    pub fn is_time_of_day_modulated(&self) -> bool {
        self.time_of_day_modulation
    }

    /// Multiplier applied to the base rate during `hour`
    pub fn time_of_day_factor(hour: u32) -> f64 {
        match hour % 24 {
            6..=8 => 0.75,
            16..=18 => 0.9,
            h if h >= 22 || h < 4 => 0.1,
            _ => 1.0,
        }
    }

    /// Effective arrival rate (cars/minute) during `hour`
    pub fn arrival_rate_at_hour(&self, hour: u32) -> f64 {
        if self.time_of_day_modulation {
            self.base_rate * Self::time_of_day_factor(hour)
        } else {
            self.base_rate
        }
    }

    /// Draw the time until the next arrival, in minutes
    ///
    /// `current_time_seconds` is seconds since the simulated midnight. Returns
    /// `f64::INFINITY` when the effective rate is not positive.
    pub fn generate_interarrival_time<R: Rng + ?Sized>(
        &self,
        current_time_seconds: f64,
        rng: &mut R,
    ) -> f64 {
        let rate = self.arrival_rate_at_hour(hour_of_day(current_time_seconds));
        if !(rate.is_finite() && rate > 0.0) {
            return f64::INFINITY;
        }
        match Exp::new(rate) {
            Ok(exp) => exp.sample(rng),
            Err(_) => f64::INFINITY,
        }
    }

    /// Ordered arrival timestamps within `duration_minutes` of `start_time`
    ///
    /// The simulated clock is offset by the hour of `start_time`, so a run
    /// starting at 07:00 sees the morning factor first. Timestamps are strictly
    /// before `start_time + duration_minutes`. The returned iterator draws
    /// lazily and cannot be restarted.
    pub fn generate_arrival_times<'a, R: Rng + ?Sized>(
        &'a self,
        duration_minutes: f64,
        start_time: DateTime<Utc>,
        rng: &'a mut R,
    ) -> ArrivalTimes<'a, R> {
        ArrivalTimes {
            process: self,
            rng,
            start_time,
            clock_offset_seconds: f64::from(start_time.hour()) * SECONDS_PER_HOUR,
            duration_minutes,
            elapsed_minutes: 0.0,
            exhausted: duration_minutes.is_nan() || duration_minutes <= 0.0,
        }
    }
}

/// Lazy sequence of arrival timestamps, see [`ArrivalProcess::generate_arrival_times`]
#[derive(Debug)]
pub struct ArrivalTimes<'a, R: ?Sized> {
    process: &'a ArrivalProcess,
    rng: &'a mut R,
    start_time: DateTime<Utc>,
    clock_offset_seconds: f64,
    duration_minutes: f64,
    elapsed_minutes: f64,
    exhausted: bool,
}

impl<R: Rng + ?Sized> Iterator for ArrivalTimes<'_, R> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let now = self.clock_offset_seconds + self.elapsed_minutes * 60.0;
        let gap = self.process.generate_interarrival_time(now, &mut *self.rng);
        self.elapsed_minutes += gap;

        if self.elapsed_minutes.is_nan() || self.elapsed_minutes >= self.duration_minutes {
            self.exhausted = true;
            return None;
        }

        // Truncate so a timestamp never reaches start_time + duration
        let offset_ms = (self.elapsed_minutes * 60_000.0).floor() as i64;
        Some(self.start_time + Duration::milliseconds(offset_ms))
    }
}

impl<R: Rng + ?Sized> std::iter::FusedIterator for ArrivalTimes<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_hour_of_day() {
        assert_eq!(hour_of_day(0.0), 0);
        assert_eq!(hour_of_day(3599.9), 0);
        assert_eq!(hour_of_day(7.5 * 3600.0), 7);
        assert_eq!(hour_of_day(25.0 * 3600.0), 1);
        assert_eq!(hour_of_day(f64::NAN), 0);
    }

    #[test]
    fn test_time_of_day_factor_bands() {
        assert_eq!(ArrivalProcess::time_of_day_factor(5), 1.0);
        assert_eq!(ArrivalProcess::time_of_day_factor(6), 0.75);
        assert_eq!(ArrivalProcess::time_of_day_factor(8), 0.75);
        assert_eq!(ArrivalProcess::time_of_day_factor(9), 1.0);
        assert_eq!(ArrivalProcess::time_of_day_factor(16), 0.9);
        assert_eq!(ArrivalProcess::time_of_day_factor(19), 1.0);
        assert_eq!(ArrivalProcess::time_of_day_factor(22), 0.1);
        assert_eq!(ArrivalProcess::time_of_day_factor(0), 0.1);
        assert_eq!(ArrivalProcess::time_of_day_factor(3), 0.1);
        assert_eq!(ArrivalProcess::time_of_day_factor(4), 1.0);
    }

    #[test]
    fn test_constant_process_ignores_hour() {
        let process = ArrivalProcess::constant(2.0);
        assert_eq!(process.arrival_rate_at_hour(1), 2.0);
        assert_eq!(process.arrival_rate_at_hour(7), 2.0);

        let modulated = ArrivalProcess::new(2.0);
        assert!((modulated.arrival_rate_at_hour(1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_rate_never_arrives() {
        let mut rng = StdRng::seed_from_u64(1);
        let process = ArrivalProcess::constant(0.0);
        assert!(process.generate_interarrival_time(0.0, &mut rng).is_infinite());
    }

    #[test]
    fn test_interarrival_mean_matches_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let process = ArrivalProcess::constant(4.0);
        let n = 20_000;
        let mean: f64 =
            (0..n).map(|_| process.generate_interarrival_time(0.0, &mut rng)).sum::<f64>()
                / n as f64;
        assert!((mean - 0.25).abs() < 0.01, "mean inter-arrival {}", mean);
    }

    #[test]
    fn test_arrival_times_ordered_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let process = ArrivalProcess::new(3.0);
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let end = start + Duration::minutes(60);

        let times: Vec<_> = process.generate_arrival_times(60.0, start, &mut rng).collect();

        assert!(!times.is_empty());
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert!(times.iter().all(|t| *t >= start && *t < end));
    }

    #[test]
    fn test_arrival_times_stay_before_end_at_millisecond_resolution() {
        // About one arrival per millisecond, so some land just short of the end
        let process = ArrivalProcess::constant(60_000.0);
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = start + Duration::milliseconds(6_000);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let times: Vec<_> = process.generate_arrival_times(0.1, start, &mut rng).collect();
            assert!(times.len() > 5_000);
            assert!(times.iter().all(|t| *t >= start && *t < end), "seed {} reached the end", seed);
        }
    }

    #[test]
    fn test_arrival_times_iterator_is_fused() {
        let mut rng = StdRng::seed_from_u64(3);
        let process = ArrivalProcess::constant(1.0);
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        let mut iter = process.generate_arrival_times(5.0, start, &mut rng);
        while iter.next().is_some() {}
        assert!(iter.next().is_none());

        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(process.generate_arrival_times(0.0, start, &mut rng).count(), 0);
    }
}
