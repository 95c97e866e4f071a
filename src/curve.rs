//! 限制曲线 - 样条限制的一维输入
//!
//! 关键帧之间使用三次 Hermite 插值，区间外取端点值。

use crate::error::{IkError, Result};

/// 曲线 trait
pub trait Curve {
    fn value(&self, v: f32) -> f32;
}

/// 关键帧
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    pub in_tangent: f32,
    pub out_tangent: f32,
}

impl Keyframe {
    /// 平切线关键帧
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }

    pub fn with_tangents(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
        }
    }
}

/// 关键帧曲线
#[derive(Clone, Debug, PartialEq)]
pub struct LimitCurve {
    /// 按 time 升序
    keys: Vec<Keyframe>,
}

impl LimitCurve {
    /// 从关键帧创建（自动排序）
    pub fn new(mut keys: Vec<Keyframe>) -> Result<Self> {
        if keys.is_empty() {
            return Err(IkError::EmptyCurve);
        }
        keys.sort_unstable_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { keys })
    }

    /// 默认 swing 曲线：0/90/180/270/360 五个关键帧，全部为 `degrees`
    pub fn constant_swing(degrees: f32) -> Self {
        let keys = [0.0, 90.0, 180.0, 270.0, 360.0]
            .iter()
            .map(|&t| Keyframe::new(t, degrees))
            .collect();
        Self { keys }
    }

    #[inline]
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// 内部关键帧使用 Catmull-Rom 切线，端点保持平切线
    pub fn smooth_tangents(&mut self) {
        let n = self.keys.len();
        if n < 3 {
            return;
        }
        for i in 1..n - 1 {
            let prev = self.keys[i - 1];
            let next = self.keys[i + 1];
            let dt = next.time - prev.time;
            let slope = if dt.abs() > f32::EPSILON {
                (next.value - prev.value) / dt
            } else {
                0.0
            };
            self.keys[i].in_tangent = slope;
            self.keys[i].out_tangent = slope;
        }
    }

    /// 相邻关键帧之间的最大斜率（绝对值）
    pub fn max_slope(&self) -> f32 {
        self.keys
            .windows(2)
            .filter(|w| w[1].time > w[0].time)
            .map(|w| ((w[1].value - w[0].value) / (w[1].time - w[0].time)).abs())
            .chain(self.keys.iter().flat_map(|k| [k.in_tangent.abs(), k.out_tangent.abs()]))
            .fold(0.0, f32::max)
    }

    fn hermite(k0: &Keyframe, k1: &Keyframe, v: f32) -> f32 {
        let dt = k1.time - k0.time;
        if dt <= f32::EPSILON {
            return k0.value;
        }
        let s = (v - k0.time) / dt;
        let s2 = s * s;
        let s3 = s2 * s;
        // Hermite 基函数
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        h00 * k0.value + h10 * dt * k0.out_tangent + h01 * k1.value + h11 * dt * k1.in_tangent
    }
}

impl Curve for LimitCurve {
    fn value(&self, v: f32) -> f32 {
        let first = &self.keys[0];
        let last = &self.keys[self.keys.len() - 1];
        if v <= first.time {
            return first.value;
        }
        if v >= last.time {
            return last.value;
        }
        // 第一个 time > v 的关键帧
        let i = self.keys.partition_point(|k| k.time <= v);
        Self::hermite(&self.keys[i - 1], &self.keys[i], v)
    }
}
