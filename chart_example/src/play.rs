//! 播放会话模块
//!
//! 用宿主帧时钟驱动 [`PlaybackScheduler`]，把到期音符转成音频反馈与
//! 轨道闪光。会话只持有调度器快照；谱面在播放期间不被修改。

use chart_core::{Chart, PlaybackScheduler, Tick, LANE_COUNT};
use egui_chart::AudioBackend;

/// 轨道闪光衰减速度（每秒）。
const FLASH_DECAY_PER_SECOND: f32 = 4.0;

pub struct PlaySession {
    scheduler: PlaybackScheduler,
    elapsed: f64,
    last_update: Option<f64>,
    duration: f64,
    lane_flash: [f32; LANE_COUNT],
    completed: bool,
}

impl PlaySession {
    pub fn new(chart: &Chart) -> Self {
        Self {
            scheduler: PlaybackScheduler::start(chart),
            elapsed: 0.0,
            last_update: None,
            duration: chart.audio_duration_seconds(),
            lane_flash: [0.0; LANE_COUNT],
            completed: false,
        }
    }

    /// 每帧推进一次。`now` 是宿主时钟（秒）。返回调度器本帧的输出。
    pub fn tick(&mut self, now: f64, audio: &dyn AudioBackend) -> Tick {
        let dt = match self.last_update {
            Some(prev) => now - prev,
            None => 0.0,
        };
        self.last_update = Some(now);
        // 跳过大间隔（窗口失焦后恢复等），避免一次性灌入大段时间。
        if dt > 0.0 && dt < 1.0 {
            self.elapsed += dt;
        }
        for flash in &mut self.lane_flash {
            *flash = (*flash - dt as f32 * FLASH_DECAY_PER_SECOND).max(0.0);
        }

        match self.scheduler.advance(self.elapsed) {
            Ok(tick) => {
                for note in &tick.due {
                    log::debug!(
                        "note due at {:.2}s on lane {}",
                        note.spawn_time,
                        note.lane
                    );
                    audio.lane_hit(note.lane);
                    if let Some(flash) = self.lane_flash.get_mut(note.lane) {
                        *flash = 1.0;
                    }
                }
                if tick.completed {
                    self.completed = true;
                    log::info!("chart complete at {:.2}s", self.elapsed);
                }
                tick
            }
            Err(err) => {
                // 帧时钟只会累加，出现回退说明宿主时钟异常。
                log::error!("playback clock error: {err}");
                Tick::default()
            }
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn progress(&self) -> f32 {
        if self.duration > 0.0 {
            (self.elapsed / self.duration).clamp(0.0, 1.0) as f32
        } else {
            1.0
        }
    }

    pub fn lane_flash(&self, lane: usize) -> f32 {
        self.lane_flash.get(lane).copied().unwrap_or(0.0)
    }

    pub fn remaining_notes(&self) -> usize {
        self.scheduler.remaining()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}
