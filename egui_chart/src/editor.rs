//! 谱面编辑器模块
//!
//! 在单个谱面与视图状态之上实现 {Idle, NoteSelected} 创作状态机：
//! 指针命中测试与插入、选中音符的字段编辑、删除、缩放，以及与宿主
//! 交互的命令 / 事件系统。

use chart_core::{Chart, GridError, Note, NoteId, NoteKind, TimeGrid, LANE_COUNT};
use std::io;
use std::path::{Path, PathBuf};

use crate::project::ChartFile;

pub const ZOOM_MIN: f32 = 10.0;
pub const ZOOM_MAX: f32 = 50.0;
/// 每单位滚轮增量对应的缩放变化。
pub const ZOOM_STEP: f32 = 0.25;
/// 指针命中测试的容差（屏幕像素，不随缩放变化）。
pub const HIT_TOLERANCE_PX: f32 = 5.0;

/// 编辑器视图状态。随编辑会话创建与丢弃，不持久化。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    pub zoom_level: f32,
    pub scroll_offset: f32,
    /// 弱引用：选中音符的稳定 id。音符被删除后自然悬空，解析为未选中。
    pub selected: Option<NoteId>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom_level: ZOOM_MIN,
            scroll_offset: 0.0,
            selected: None,
        }
    }
}

/// 宿主可推送到编辑器的创作命令，与指针 / 滚轮 / 字段编辑一一对应。
#[derive(Clone, Debug)]
pub enum EditorCommand {
    PointerDown { lane: usize, pixel_x: f32 },
    EditSelected {
        new_time: f64,
        new_lane: usize,
        new_kind: NoteKind,
    },
    DeleteSelected,
    Zoom { delta_scroll: f32 },
    SetTempo { bpm: u32 },
}

/// 宿主可监听的编辑事件。
#[derive(Clone, Debug)]
pub enum EditorEvent {
    NoteAdded(Note),
    NoteUpdated { before: Note, after: Note },
    NoteDeleted(Note),
    SelectionChanged(Option<NoteId>),
    ZoomChanged(f32),
    TempoChanged(u32),
    ChartReplaced,
    ChartSaved { path: PathBuf },
}

#[derive(Clone, Copy, Debug)]
pub struct EditorOptions {
    /// 基准时间轴宽度（像素）。内容宽度 = 基准宽度 × 缩放级别。
    pub timeline_width: f32,
    pub zoom_level: f32,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            timeline_width: 800.0,
            zoom_level: ZOOM_MIN,
        }
    }
}

pub struct ChartEditor {
    chart: Chart,
    view: ViewState,
    timeline_width: f32,
    grid: TimeGrid,
    pending_events: Vec<EditorEvent>,
    event_listener: Option<Box<dyn FnMut(&EditorEvent)>>,
}

impl ChartEditor {
    /// 打开一个编辑会话。谱面时长非正视为前置条件违规。
    pub fn new(chart: Chart, options: EditorOptions) -> Result<Self, GridError> {
        let view = ViewState {
            zoom_level: options.zoom_level.clamp(ZOOM_MIN, ZOOM_MAX),
            ..ViewState::default()
        };
        let grid = TimeGrid::new(
            chart.tempo(),
            view.zoom_level,
            options.timeline_width,
            chart.audio_duration_seconds(),
        )?;
        Ok(Self {
            chart,
            view,
            timeline_width: options.timeline_width,
            grid,
            pending_events: Vec::new(),
            event_listener: None,
        })
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn timeline_width(&self) -> f32 {
        self.timeline_width
    }

    /// 将选中 id 解析回当前音符；选中悬空时返回 None。
    pub fn selected_note(&self) -> Option<&Note> {
        self.view.selected.and_then(|id| self.chart.note(id))
    }

    pub fn set_scroll_offset(&mut self, offset: f32) {
        self.view.scroll_offset = offset;
    }

    pub fn set_event_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.event_listener = Some(Box::new(listener));
    }

    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn apply_command(&mut self, command: EditorCommand) {
        match command {
            EditorCommand::PointerDown { lane, pixel_x } => self.pointer_down(lane, pixel_x),
            EditorCommand::EditSelected {
                new_time,
                new_lane,
                new_kind,
            } => self.edit_selected(new_time, new_lane, new_kind),
            EditorCommand::DeleteSelected => self.delete_selected(),
            EditorCommand::Zoom { delta_scroll } => self.zoom(delta_scroll),
            EditorCommand::SetTempo { bpm } => self.set_tempo(bpm),
        }
    }

    /// 指针在某条轨道的 `pixel_x` 处按下。命中已有音符则选中它；
    /// 落空则在该位置插入一个普通音符并保持未选中。轨道号越界
    /// （点击在所有时间轴行之外）是无操作。
    pub fn pointer_down(&mut self, lane: usize, pixel_x: f32) {
        if lane >= LANE_COUNT {
            return;
        }
        if let Some(id) = self.hit_test(lane, pixel_x) {
            if self.view.selected != Some(id) {
                self.view.selected = Some(id);
                self.emit(EditorEvent::SelectionChanged(Some(id)));
            }
        } else {
            self.clear_selection();
            let time = self.grid.pixel_to_time(pixel_x);
            let id = self.chart.add_note(time, lane, NoteKind::Normal);
            if let Some(note) = self.chart.note(id).copied() {
                self.emit(EditorEvent::NoteAdded(note));
            }
        }
    }

    /// 编辑选中音符的字段。时间与轨道号越界时静默钳制；没有选中
    /// 音符时（Idle 状态）是无操作。
    pub fn edit_selected(&mut self, new_time: f64, new_lane: usize, new_kind: NoteKind) {
        let Some(id) = self.view.selected else {
            return;
        };
        let clamped_time = self.chart.clamp_time(new_time);
        let clamped_lane = new_lane.min(LANE_COUNT - 1);
        let Some(note) = self.chart.note_mut(id) else {
            return;
        };
        let before = *note;
        note.spawn_time = clamped_time;
        note.lane = clamped_lane;
        note.kind = new_kind;
        let after = *note;
        if before != after {
            self.emit(EditorEvent::NoteUpdated { before, after });
        }
    }

    /// 删除选中的音符并回到 Idle。没有选中时是无操作。
    pub fn delete_selected(&mut self) {
        let Some(id) = self.view.selected.take() else {
            return;
        };
        if let Some(note) = self.chart.note(id).copied() {
            self.chart.remove_note(id);
            self.emit(EditorEvent::NoteDeleted(note));
        }
        self.emit(EditorEvent::SelectionChanged(None));
    }

    /// 滚轮缩放：`zoom = clamp(zoom - delta * 0.25, 10, 50)`。
    pub fn zoom(&mut self, delta_scroll: f32) {
        let target = (self.view.zoom_level - delta_scroll * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
        if (target - self.view.zoom_level).abs() <= f32::EPSILON {
            return;
        }
        self.view.zoom_level = target;
        self.rebuild_grid();
        self.emit(EditorEvent::ZoomChanged(target));
    }

    /// 修改编辑网格使用的 BPM（仅影响网格吸附，不影响播放时序）。
    pub fn set_tempo(&mut self, bpm: u32) {
        let clamped = bpm.max(1);
        if self.chart.tempo() == clamped {
            return;
        }
        self.chart.set_tempo(clamped);
        self.rebuild_grid();
        self.emit(EditorEvent::TempoChanged(clamped));
    }

    /// 用新的谱面替换当前会话内容，清空选中状态。
    pub fn replace_chart(&mut self, chart: Chart) -> Result<(), GridError> {
        let grid = TimeGrid::new(
            chart.tempo(),
            self.view.zoom_level,
            self.timeline_width,
            chart.audio_duration_seconds(),
        )?;
        self.chart = chart;
        self.grid = grid;
        self.clear_selection();
        self.emit(EditorEvent::ChartReplaced);
        Ok(())
    }

    /// 将当前谱面按内存中的音符顺序原样写入磁盘（保存是透传，不做
    /// 过滤或重排；排序视图始终按需计算）。
    pub fn save_to_path(&mut self, path: &Path) -> io::Result<()> {
        ChartFile::from_chart(&self.chart).save_to_path(path)?;
        log::info!("chart saved to {}", path.display());
        self.emit(EditorEvent::ChartSaved {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    pub fn load_from_path(&mut self, path: &Path) -> io::Result<()> {
        let chart = ChartFile::load_from_path(path)?.into_chart();
        self.replace_chart(chart)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        log::info!("chart loaded from {}", path.display());
        Ok(())
    }

    fn hit_test(&self, lane: usize, pixel_x: f32) -> Option<NoteId> {
        let mut best: Option<(f32, NoteId)> = None;
        for note in self.chart.notes_in_lane(lane) {
            let dx = (self.grid.time_to_pixel(note.spawn_time) - pixel_x).abs();
            if dx > HIT_TOLERANCE_PX {
                continue;
            }
            // 同距离时保留先插入的音符。
            if best.map_or(true, |(b, _)| dx < b) {
                best = Some((dx, note.id));
            }
        }
        best.map(|(_, id)| id)
    }

    fn clear_selection(&mut self) {
        if self.view.selected.take().is_some() {
            self.emit(EditorEvent::SelectionChanged(None));
        }
    }

    fn rebuild_grid(&mut self) {
        // 时长与宽度在构造时已校验且会话内不变，这里只会因缩放或
        // BPM 变化而重建。
        if let Ok(grid) = TimeGrid::new(
            self.chart.tempo(),
            self.view.zoom_level,
            self.timeline_width,
            self.chart.audio_duration_seconds(),
        ) {
            self.grid = grid;
        }
    }

    fn emit(&mut self, event: EditorEvent) {
        if let Some(listener) = &mut self.event_listener {
            listener(&event);
        }
        self.pending_events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with_duration(duration: f64) -> ChartEditor {
        ChartEditor::new(Chart::new(120, duration), EditorOptions::default()).unwrap()
    }

    #[test]
    fn rejects_chart_with_non_positive_duration() {
        assert!(ChartEditor::new(Chart::new(120, 0.0), EditorOptions::default()).is_err());
    }

    #[test]
    fn pointer_miss_adds_note_and_stays_idle() {
        let mut editor = editor_with_duration(10.0);
        // 800 px * zoom 10 / 10 s = 800 px/s; 2560 px -> 3.2 s.
        editor.pointer_down(2, 2560.0);

        assert!(editor.view().selected.is_none());
        let lane2: Vec<_> = editor.chart().notes_in_lane(2).collect();
        assert_eq!(lane2.len(), 1);
        assert!((lane2[0].spawn_time - 3.2).abs() < 1e-6);
        assert_eq!(lane2[0].kind, NoteKind::Normal);
    }

    #[test]
    fn add_then_pointer_down_at_same_pixel_selects_it() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(1, 2560.0);
        let id = editor.chart().notes_in_lane(1).next().unwrap().id;

        editor.pointer_down(1, 2560.0);
        assert_eq!(editor.view().selected, Some(id));
        assert_eq!(editor.chart().notes_in_lane(1).count(), 1);
    }

    #[test]
    fn hit_test_respects_pixel_tolerance() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(0, 800.0);

        // 5 px off still selects, 6 px off inserts a second note.
        editor.pointer_down(0, 805.0);
        assert!(editor.view().selected.is_some());

        editor.pointer_down(0, 806.0 + HIT_TOLERANCE_PX);
        assert!(editor.view().selected.is_none());
        assert_eq!(editor.chart().notes_in_lane(0).count(), 2);
    }

    #[test]
    fn pointer_down_outside_rows_is_a_no_op() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(LANE_COUNT, 100.0);
        assert!(editor.chart().notes.is_empty());
        assert!(editor.take_events().is_empty());
    }

    #[test]
    fn pointer_beyond_timeline_end_clamps_to_duration() {
        let mut editor = editor_with_duration(10.0);
        // Content width at zoom 10 is 8000 px; 9000 px would be 11.25 s.
        editor.pointer_down(0, 9000.0);
        assert_eq!(editor.chart().notes[0].spawn_time, 10.0);
    }

    #[test]
    fn edit_selected_clamps_time_and_lane() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(0, 800.0);
        editor.pointer_down(0, 800.0);
        assert!(editor.view().selected.is_some());

        editor.edit_selected(15.0, 9, NoteKind::Long);
        let note = editor.selected_note().unwrap();
        assert_eq!(note.spawn_time, 10.0);
        assert_eq!(note.lane, LANE_COUNT - 1);
        assert_eq!(note.kind, NoteKind::Long);
    }

    #[test]
    fn edit_without_selection_is_a_no_op() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(0, 800.0);
        editor.take_events();

        editor.edit_selected(5.0, 1, NoteKind::Long);
        assert_eq!(editor.chart().notes[0].kind, NoteKind::Normal);
        assert!(editor.take_events().is_empty());
    }

    #[test]
    fn delete_selected_removes_and_returns_to_idle() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(3, 400.0);
        editor.pointer_down(3, 400.0);

        editor.delete_selected();
        assert!(editor.chart().notes.is_empty());
        assert!(editor.view().selected.is_none());

        // Deleting again with nothing selected stays a no-op.
        editor.take_events();
        editor.delete_selected();
        assert!(editor.take_events().is_empty());
    }

    #[test]
    fn zoom_follows_scroll_delta_and_clamps() {
        let mut editor = editor_with_duration(10.0);
        assert_eq!(editor.view().zoom_level, ZOOM_MIN);

        editor.zoom(-4.0);
        assert_eq!(editor.view().zoom_level, ZOOM_MIN + 1.0);

        editor.zoom(1000.0);
        assert_eq!(editor.view().zoom_level, ZOOM_MIN);
        editor.zoom(-1000.0);
        assert_eq!(editor.view().zoom_level, ZOOM_MAX);
    }

    #[test]
    fn zoom_changes_pixel_mapping_but_not_times() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(0, 2560.0);
        let before = editor.chart().notes[0].spawn_time;

        editor.zoom(-8.0);
        assert_eq!(editor.chart().notes[0].spawn_time, before);
        let x = editor.grid().time_to_pixel(before);
        assert!((editor.grid().pixel_to_time(x) - before).abs() < 1e-3);
    }

    #[test]
    fn set_tempo_only_touches_the_grid() {
        let mut editor = editor_with_duration(10.0);
        let pps = editor.grid().pixels_per_second();
        editor.set_tempo(60);
        assert_eq!(editor.chart().tempo(), 60);
        assert_eq!(editor.grid().seconds_per_beat(), 1.0);
        assert_eq!(editor.grid().pixels_per_second(), pps);
    }

    #[test]
    fn events_report_the_authoring_flow() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(1, 800.0);
        editor.pointer_down(1, 800.0);
        editor.edit_selected(2.0, 1, NoteKind::Long);
        editor.delete_selected();

        let events = editor.take_events();
        assert!(matches!(events[0], EditorEvent::NoteAdded(_)));
        assert!(matches!(events[1], EditorEvent::SelectionChanged(Some(_))));
        assert!(matches!(events[2], EditorEvent::NoteUpdated { .. }));
        assert!(matches!(events[3], EditorEvent::NoteDeleted(_)));
        assert!(matches!(events[4], EditorEvent::SelectionChanged(None)));
    }

    #[test]
    fn replace_chart_clears_selection() {
        let mut editor = editor_with_duration(10.0);
        editor.pointer_down(0, 800.0);
        editor.pointer_down(0, 800.0);
        assert!(editor.view().selected.is_some());
        editor.take_events();

        editor.replace_chart(Chart::new(90, 30.0)).unwrap();
        assert!(editor.view().selected.is_none());
        assert!(editor.selected_note().is_none());
        let events = editor.take_events();
        assert!(matches!(events.last(), Some(EditorEvent::ChartReplaced)));
    }
}
