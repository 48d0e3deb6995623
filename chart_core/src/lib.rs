//! # chart_core
//!
//! 节奏游戏谱面引擎核心库。
//!
//! ## 功能特性
//!
//! - **谱面数据模型**：多轨道定时音符集合，插入顺序存储，按需生成
//!   稳定的时间排序视图
//! - **时间网格换算**：秒 / 节拍 / 像素之间的纯函数映射，供编辑器
//!   做网格吸附与坐标换算
//! - **播放调度**：沿排序视图推进游标，随挂钟时间恰好一次地派发
//!   到期音符，并在会话结束时发出一次完成信号
//!
//! 本 crate 不含任何 UI 依赖；渲染、输入与持久化由上层的
//! `egui_chart` 与宿主应用提供。

pub mod grid;
pub mod scheduler;
pub mod structure;

pub use grid::{GridError, TimeGrid};
pub use scheduler::{PlaybackScheduler, SchedulerError, Tick};
pub use structure::{Chart, Note, NoteId, NoteKind, LANE_COUNT};
