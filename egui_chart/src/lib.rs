//! # egui_chart
//!
//! 节奏游戏谱面创作组件库。
//!
//! ## 功能特性
//!
//! - **创作状态机**：指针命中测试与插入、选中音符编辑、删除、缩放，
//!   所有越界输入静默钳制
//! - **时间轴组件**：在 egui 中渲染四条轨道、拍网格与音符，并把
//!   交互回填为编辑命令
//! - **谱面持久化**：带版本号的 JSON 谱面文件
//! - **音频反馈**：可替换的打击音后端（rodio 实现与空实现）
//!
//! ## 基本使用
//!
//! ```no_run
//! use chart_core::Chart;
//! use egui_chart::{ChartEditor, EditorOptions};
//!
//! let chart = Chart::new(120, 60.0);
//! let mut editor = ChartEditor::new(chart, EditorOptions::default()).unwrap();
//!
//! // 在 egui UI 中使用
//! // egui_chart::ChartTimeline::new(&mut editor).ui(ui);
//! ```

pub mod audio;
pub mod editor;
pub mod project;
pub mod ui;

pub use audio::{AudioBackend, AudioEngine, NullAudio};
pub use editor::{
    ChartEditor, EditorCommand, EditorEvent, EditorOptions, ViewState, HIT_TOLERANCE_PX,
    ZOOM_MAX, ZOOM_MIN,
};
pub use project::ChartFile;
pub use ui::{ChartTimeline, TimelineOptions};
