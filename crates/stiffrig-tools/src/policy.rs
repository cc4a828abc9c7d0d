//! 命令参数策略
//!
//! 两种策略刻意不同：
//! - 点动速度超出范围时**钳位**后写入
//! - 步进距离取绝对值后超出范围时**拒绝**

use serde::{Deserialize, Serialize};

/// 点动速度范围（mm/min）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JogPolicy {
    pub min_velocity: f32,
    pub max_velocity: f32,
}

impl Default for JogPolicy {
    fn default() -> Self {
        Self {
            min_velocity: 1.2,
            max_velocity: 6000.0,
        }
    }
}

impl JogPolicy {
    /// 钳位到 `[min_velocity, max_velocity]`
    ///
    /// NaN 视为最小速度。上下限颠倒（未经 `RigConfig::validate`）时不 panic，结果为 `max_velocity`。
    pub fn clamp(&self, velocity: f32) -> f32 {
        if velocity.is_nan() {
            return self.min_velocity;
        }
        velocity.max(self.min_velocity).min(self.max_velocity)
    }
}

/// 步进距离范围（mm）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepPolicy {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self {
            min_distance: 0.1,
            max_distance: 100.0,
        }
    }
}

impl StepPolicy {
    /// 取绝对值后检查范围
    ///
    /// # 返回
    ///
    /// - `Some(distance)`: 实际应写入的距离（非负）
    /// - `None`: 超出范围或非有限值
    pub fn accept(&self, distance: f32) -> Option<f32> {
        let distance = distance.abs();
        (self.min_distance..=self.max_distance).contains(&distance).then_some(distance)
    }

    /// 拒绝时返回给调用方的说明
    pub fn range_message(&self) -> String {
        format!(
            "Distance must be between {} and {} mm",
            self.min_distance, self.max_distance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_jog_clamp() {
        let policy = JogPolicy::default();
        assert_eq!(policy.clamp(10_000.0), 6000.0);
        assert_eq!(policy.clamp(0.0), 1.2);
        assert_eq!(policy.clamp(-50.0), 1.2);
        assert_eq!(policy.clamp(300.0), 300.0);
        assert_eq!(policy.clamp(f32::NAN), 1.2);
        assert_eq!(policy.clamp(f32::INFINITY), 6000.0);
    }

    #[test]
    fn test_jog_clamp_inverted_bounds_does_not_panic() {
        let policy = JogPolicy {
            min_velocity: 100.0,
            max_velocity: 10.0,
        };
        assert_eq!(policy.clamp(50.0), 10.0);
        assert_eq!(policy.clamp(-1.0), 10.0);
        assert_eq!(policy.clamp(1.0e6), 10.0);
    }

    #[test]
    fn test_step_accept() {
        let policy = StepPolicy::default();
        assert_eq!(policy.accept(0.05), None);
        assert_eq!(policy.accept(150.0), None);
        assert_eq!(policy.accept(-5.0), Some(5.0));
        assert_eq!(policy.accept(0.1), Some(0.1));
        assert_eq!(policy.accept(100.0), Some(100.0));
        assert_eq!(policy.accept(-150.0), None);
        assert_eq!(policy.accept(f32::NAN), None);
        assert_eq!(policy.range_message(), "Distance must be between 0.1 and 100 mm");
    }

    proptest! {
        #[test]
        fn prop_jog_clamp_stays_in_range(v in proptest::num::f32::ANY) {
            let policy = JogPolicy::default();
            let clamped = policy.clamp(v);
            prop_assert!(clamped >= policy.min_velocity && clamped <= policy.max_velocity);
        }

        #[test]
        fn prop_jog_clamp_is_identity_inside_range(v in 1.2f32..=6000.0) {
            prop_assert_eq!(JogPolicy::default().clamp(v), v);
        }

        #[test]
        fn prop_step_accept_matches_abs_range(v in -200.0f32..200.0) {
            let policy = StepPolicy::default();
            let abs = v.abs();
            match policy.accept(v) {
                Some(d) => {
                    prop_assert_eq!(d, abs);
                    prop_assert!((0.1..=100.0).contains(&d));
                },
                None => prop_assert!(!(0.1..=100.0).contains(&abs)),
            }
        }
    }
}
