use std::collections::VecDeque;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VoltageFilterConfig {
    /// Moving-average window; 100 samples is about two seconds at 50 Hz.
    pub window: usize,
    /// EMA weight of the newest moving average.
    pub ema_alpha: f32,
    /// Readings outside `[min_volts, max_volts]` are skipped.
    pub min_volts: f32,
    pub max_volts: f32,
}
impl Default for VoltageFilterConfig {
    fn default() -> Self {
        Self {
            window: 100,
            ema_alpha: 0.15,
            min_volts: 0.1,
            max_volts: 5.0,
        }
    }
}
impl VoltageFilterConfig {
    fn sanitized(self) -> Self {
        let ema_alpha = if self.ema_alpha.is_finite() && self.ema_alpha > 0.0 {
            self.ema_alpha.min(1.0)
        } else {
            Self::default().ema_alpha
        };
        Self {
            window: self.window.max(1),
            ema_alpha,
            ..self
        }
    }
}
/// Two-stage battery voltage smoother: a long moving average followed by an EMA.
///
/// Display-only; the canonical sample keeps its raw voltage.
pub struct VoltageFilter {
    config: VoltageFilterConfig,
    window: VecDeque<f32>,
    window_sum: f32,
    ema: f32,
    ema_initialized: bool,
    accepted: u64,
    rejected: u64,
}
impl Default for VoltageFilter {
    fn default() -> Self {
        Self::new(VoltageFilterConfig::default())
    }
}
impl VoltageFilter {
    pub fn new(config: VoltageFilterConfig) -> Self {
        let config = config.sanitized();
        Self {
            window: VecDeque::with_capacity(config.window + 1),
            config,
            window_sum: 0.0,
            ema: 0.0,
            ema_initialized: false,
            accepted: 0,
            rejected: 0,
        }
    }
    /// Pushes a raw reading and returns the smoothed value.
    ///
    /// Implausible readings, including the codec's 0.0 sentinel, leave the
    /// state untouched and return the last smoothed value.
    pub fn add_sample(&mut self, raw: f32) -> f32 {
        if !(self.config.min_volts..=self.config.max_volts).contains(&raw) {
            self.rejected += 1;
            if raw == 0.0 {
                debug!("no valid battery reading, keeping {:.3} V", self.ema);
            } else {
                warn!("battery reading {raw} V skipped by voltage filter");
            }
            return self.ema;
        }
        self.window.push_back(raw);
        self.window_sum += raw;
        if self.window.len() > self.config.window {
            if let Some(oldest) = self.window.pop_front() {
                self.window_sum -= oldest;
            }
        }
        let moving_average = self.window_sum / self.window.len() as f32;
        if self.ema_initialized {
            let alpha = self.config.ema_alpha;
            self.ema = alpha * moving_average + (1.0 - alpha) * self.ema;
        } else {
            self.ema = moving_average;
            self.ema_initialized = true;
        }
        self.accepted += 1;
        if self.accepted % 100 == 0 {
            debug!(
                "voltage filter: raw={:.3} V ma={:.3} V ema={:.3} V window={}",
                raw,
                moving_average,
                self.ema,
                self.window.len()
            );
        }
        self.ema
    }
    /// Last smoothed value, or `None` before the first valid reading.
    pub fn current(&self) -> Option<f32> {
        self.ema_initialized.then_some(self.ema)
    }
    pub fn window_len(&self) -> usize {
        self.window.len()
    }
    pub fn accepted(&self) -> u64 {
        self.accepted
    }
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
    pub fn reset(&mut self) {
        self.window.clear();
        self.window_sum = 0.0;
        self.ema = 0.0;
        self.ema_initialized = false;
        self.accepted = 0;
        self.rejected = 0;
        debug!("voltage filter reset");
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn first_sample_initializes_ema() {
        let mut f = VoltageFilter::default();
        assert_eq!(f.current(), None);
        assert_eq!(f.add_sample(3.8), 3.8);
        assert_eq!(f.current(), Some(3.8));
    }
    #[test]
    fn second_sample_blends_moving_average() {
        let mut f = VoltageFilter::default();
        f.add_sample(4.0);
        let out = f.add_sample(3.0);
        // ma = 3.5, ema = 0.15 * 3.5 + 0.85 * 4.0
        assert!((out - 3.925).abs() < 1e-5);
    }
    #[test]
    fn converges_to_constant_input() {
        let mut f = VoltageFilter::default();
        f.add_sample(4.2);
        let mut out = 0.0;
        for _ in 0..300 {
            out = f.add_sample(3.7);
        }
        assert!((out - 3.7).abs() < 1e-3, "got {out}");
        assert_eq!(f.window_len(), 100);
    }
    #[test]
    fn window_is_bounded() {
        let mut f = VoltageFilter::new(VoltageFilterConfig {
            window: 4,
            ..VoltageFilterConfig::default()
        });
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            f.add_sample(v);
        }
        assert_eq!(f.window_len(), 4);
    }
    #[test]
    fn out_of_range_readings_do_not_touch_state() {
        let mut f = VoltageFilter::default();
        f.add_sample(3.9);
        let before = f.add_sample(3.8);
        assert_eq!(f.add_sample(0.0), before);
        assert_eq!(f.add_sample(6.0), before);
        assert_eq!(f.add_sample(f32::NAN), before);
        assert_eq!(f.window_len(), 2);
        assert_eq!(f.current(), Some(before));
        assert_eq!(f.rejected(), 3);
        assert_eq!(f.accepted(), 2);
    }
    #[test]
    fn rejection_before_first_sample_returns_zero() {
        let mut f = VoltageFilter::default();
        assert_eq!(f.add_sample(0.0), 0.0);
        assert_eq!(f.window_len(), 0);
    }
    #[test]
    fn reset_clears_everything() {
        let mut f = VoltageFilter::default();
        f.add_sample(3.9);
        f.reset();
        assert_eq!(f.current(), None);
        assert_eq!(f.window_len(), 0);
        assert_eq!(f.add_sample(3.5), 3.5);
    }
    #[test]
    fn bad_config_is_clamped() {
        let mut f = VoltageFilter::new(VoltageFilterConfig {
            window: 0,
            ema_alpha: -1.0,
            ..VoltageFilterConfig::default()
        });
        f.add_sample(3.0);
        f.add_sample(4.0);
        assert_eq!(f.window_len(), 1);
    }
}
