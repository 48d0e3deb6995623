//! 时间网格模块
//!
//! 秒、节拍与像素坐标之间的纯函数换算，由 BPM、缩放级别、时间轴宽度
//! 和音频时长参数化。不依赖渲染，也不修改谱面数据。

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GridError {
    #[error("timeline duration must be a positive number of seconds (got {0})")]
    InvalidDuration(f64),
    #[error("timeline width must be a positive number of pixels (got {0})")]
    InvalidWidth(f32),
}

/// 秒 / 节拍 / 像素换算器。构造后不可变；缩放或 BPM 变化时重建。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeGrid {
    bpm: u32,
    duration_seconds: f64,
    pixels_per_second: f64,
}

impl TimeGrid {
    /// 时长或宽度非正（或非有限）视为前置条件违规，直接返回错误。
    pub fn new(
        bpm: u32,
        zoom_level: f32,
        timeline_width_px: f32,
        duration_seconds: f64,
    ) -> Result<Self, GridError> {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(GridError::InvalidDuration(duration_seconds));
        }
        if !timeline_width_px.is_finite() || timeline_width_px <= 0.0 {
            return Err(GridError::InvalidWidth(timeline_width_px));
        }
        let pixels_per_second =
            timeline_width_px as f64 * zoom_level as f64 / duration_seconds;
        Ok(Self {
            bpm,
            duration_seconds,
            pixels_per_second,
        })
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// 每拍秒数。BPM 在计算中被钳制到最小 1（防止除零），谱面存储的
    /// tempo 不受影响。
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm.max(1) as f64
    }

    pub fn time_to_pixel(&self, time_seconds: f64) -> f32 {
        (time_seconds * self.pixels_per_second) as f32
    }

    pub fn pixel_to_time(&self, pixel_x: f32) -> f64 {
        pixel_x as f64 / self.pixels_per_second
    }

    /// 拍对齐的主刻度时间序列，从 0 到覆盖整个时长，步长为每拍秒数。
    /// 每次调用返回一个新的迭代器，可重复遍历。
    pub fn major_tick_times(&self) -> impl Iterator<Item = f64> {
        let step = self.seconds_per_beat();
        let last = (self.duration_seconds / step).ceil() as u64;
        (0..=last).map(move |k| k as f64 * step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_duration() {
        assert_eq!(
            TimeGrid::new(120, 10.0, 800.0, 0.0),
            Err(GridError::InvalidDuration(0.0))
        );
        assert_eq!(
            TimeGrid::new(120, 10.0, 800.0, -3.0),
            Err(GridError::InvalidDuration(-3.0))
        );
        assert!(TimeGrid::new(120, 10.0, 800.0, f64::NAN).is_err());
    }

    #[test]
    fn rejects_non_positive_width() {
        assert_eq!(
            TimeGrid::new(120, 10.0, 0.0, 10.0),
            Err(GridError::InvalidWidth(0.0))
        );
    }

    #[test]
    fn pixels_per_second_formula() {
        let grid = TimeGrid::new(120, 10.0, 800.0, 10.0).unwrap();
        assert_eq!(grid.pixels_per_second(), 800.0);
    }

    #[test]
    fn time_pixel_round_trip() {
        let grid = TimeGrid::new(97, 13.5, 800.0, 42.0).unwrap();
        for i in 0..=100 {
            let t = 42.0 * i as f64 / 100.0;
            let back = grid.pixel_to_time(grid.time_to_pixel(t));
            assert!((back - t).abs() < 1e-3, "t={t} came back as {back}");
        }
    }

    #[test]
    fn bpm_zero_is_clamped_to_one() {
        let grid = TimeGrid::new(0, 10.0, 800.0, 10.0).unwrap();
        assert_eq!(grid.seconds_per_beat(), 60.0);
    }

    #[test]
    fn major_ticks_cover_ten_seconds_at_120_bpm() {
        let grid = TimeGrid::new(120, 10.0, 800.0, 10.0).unwrap();
        assert_eq!(grid.seconds_per_beat(), 0.5);

        let ticks: Vec<f64> = grid.major_tick_times().collect();
        assert_eq!(ticks.len(), 21);
        assert_eq!(ticks[0], 0.0);
        assert_eq!(ticks[1], 0.5);
        assert_eq!(*ticks.last().unwrap(), 10.0);
    }

    #[test]
    fn major_tick_count_matches_ceil_formula() {
        let grid = TimeGrid::new(100, 10.0, 800.0, 10.0).unwrap();
        let step = grid.seconds_per_beat();
        let expected = (10.0f64 / step).ceil() as usize + 1;
        assert_eq!(grid.major_tick_times().count(), expected);
    }

    #[test]
    fn major_ticks_are_restartable() {
        let grid = TimeGrid::new(120, 25.0, 800.0, 7.3).unwrap();
        let first: Vec<f64> = grid.major_tick_times().collect();
        let second: Vec<f64> = grid.major_tick_times().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn ticks_are_beat_multiples() {
        let grid = TimeGrid::new(90, 10.0, 640.0, 12.0).unwrap();
        let step = grid.seconds_per_beat();
        for (k, tick) in grid.major_tick_times().enumerate() {
            assert!((tick - k as f64 * step).abs() < 1e-9);
        }
    }
}
