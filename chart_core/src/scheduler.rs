//! 播放调度模块
//!
//! 在播放会话中沿着谱面按时间排序的音符序列推进游标。宿主每帧以单调
//! 递增的已播放时间调用 [`PlaybackScheduler::advance`]，调度器返回本帧
//! 到期的音符，每个音符恰好触发一次。

use crate::structure::{Chart, Note};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SchedulerError {
    /// 会话内不支持时钟回退；已播放时间必须单调不减。
    #[error("elapsed time moved backwards ({previous}s -> {current}s)")]
    ClockRewound { previous: f64, current: f64 },
}

/// 单次 `advance` 调用的输出。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tick {
    /// 本帧到期的音符，按 spawn_time 升序（同刻保持插入顺序）。
    pub due: Vec<Note>,
    /// 会话结束信号。最后一个音符被消费之后的第一次 `advance` 返回
    /// true，此后永远为 false（边沿触发，不会重复通知）。
    pub completed: bool,
}

pub struct PlaybackScheduler {
    notes: Vec<Note>,
    cursor: usize,
    last_elapsed: f64,
    completion_signaled: bool,
}

impl PlaybackScheduler {
    /// 开始一次播放会话。对谱面当前的音符做一次排序快照；会话期间
    /// 谱面不再被修改（创作与播放互斥持有谱面）。
    pub fn start(chart: &Chart) -> Self {
        let notes: Vec<Note> = chart.sorted_by_spawn_time().copied().collect();
        log::debug!("playback session started with {} notes", notes.len());
        Self {
            notes,
            cursor: 0,
            last_elapsed: 0.0,
            completion_signaled: false,
        }
    }

    /// 以会话开始以来的总播放秒数推进游标。时间倒退返回错误且不改变
    /// 任何状态。
    pub fn advance(&mut self, elapsed_seconds: f64) -> Result<Tick, SchedulerError> {
        if elapsed_seconds < self.last_elapsed {
            return Err(SchedulerError::ClockRewound {
                previous: self.last_elapsed,
                current: elapsed_seconds,
            });
        }
        self.last_elapsed = elapsed_seconds;

        let was_finished = self.cursor >= self.notes.len();

        let mut due = Vec::new();
        while self.cursor < self.notes.len()
            && self.notes[self.cursor].spawn_time <= elapsed_seconds
        {
            due.push(self.notes[self.cursor]);
            self.cursor += 1;
        }

        let completed = was_finished && !self.completion_signaled;
        if completed {
            self.completion_signaled = true;
            log::debug!("playback session finished after {} notes", self.notes.len());
        }

        Ok(Tick { due, completed })
    }

    /// 游标是否已越过最后一个音符（终止状态）。
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.notes.len()
    }

    pub fn remaining(&self) -> usize {
        self.notes.len() - self.cursor
    }
}
