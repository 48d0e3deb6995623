//! UI 模块
//!
//! 时间轴创作界面：四条轨道行、拍对齐网格线与秒标签、音符矩形与
//! 选中高亮。指针与滚轮输入被转换为编辑器命令；选中音符时在下方
//! 提供字段编辑面板。

use chart_core::{NoteKind, LANE_COUNT};
use egui::*;

use crate::editor::{ChartEditor, EditorCommand};

#[derive(Clone, Copy)]
pub struct TimelineOptions {
    pub lane_height: f32,
    pub lane_spacing: f32,
    /// 每行下方秒标签条的高度。
    pub label_strip_height: f32,
    /// 滚轮增量换算为缩放步进的除数。
    pub scroll_to_zoom_divisor: f32,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            lane_height: 50.0,
            lane_spacing: 20.0,
            label_strip_height: 18.0,
            scroll_to_zoom_divisor: 20.0,
        }
    }
}

/// 谱面时间轴组件。借用编辑器渲染一帧并回填交互命令。
pub struct ChartTimeline<'a> {
    editor: &'a mut ChartEditor,
    options: TimelineOptions,
}

impl<'a> ChartTimeline<'a> {
    pub fn new(editor: &'a mut ChartEditor) -> Self {
        Self {
            editor,
            options: TimelineOptions::default(),
        }
    }

    pub fn with_options(editor: &'a mut ChartEditor, options: TimelineOptions) -> Self {
        Self { editor, options }
    }

    pub fn ui(mut self, ui: &mut Ui) {
        let mut commands: Vec<EditorCommand> = Vec::new();

        self.toolbar(ui, &mut commands);
        ui.separator();

        let (hovered_rows, scroll_x) = self.lanes(ui, &mut commands);
        self.editor.set_scroll_offset(scroll_x);

        // 悬停在轨道区域时滚轮控制缩放（水平滚动由 ScrollArea 处理）。
        if hovered_rows {
            let scroll_y = ui.input(|i| i.raw_scroll_delta.y);
            if scroll_y != 0.0 {
                commands.push(EditorCommand::Zoom {
                    delta_scroll: -scroll_y / self.options.scroll_to_zoom_divisor,
                });
            }
        }

        ui.separator();
        self.inspector(ui, &mut commands);

        for command in commands {
            self.editor.apply_command(command);
        }
    }

    fn toolbar(&self, ui: &mut Ui, commands: &mut Vec<EditorCommand>) {
        ui.horizontal(|ui| {
            ui.label("BPM:");
            let mut bpm = self.editor.chart().tempo();
            if ui
                .add(DragValue::new(&mut bpm).speed(1.0).range(1..=400))
                .changed()
            {
                commands.push(EditorCommand::SetTempo { bpm });
            }
            ui.separator();
            ui.label(format!("Zoom: {:.2}x", self.editor.view().zoom_level));
            ui.separator();
            ui.label(format!("Notes: {}", self.editor.chart().notes.len()));
        });
    }

    /// 渲染全部轨道行。返回指针是否悬停在任一行上，以及当前的水平
    /// 滚动偏移（回写到视图状态）。
    fn lanes(&self, ui: &mut Ui, commands: &mut Vec<EditorCommand>) -> (bool, f32) {
        let grid = *self.editor.grid();
        let duration = self.editor.chart().audio_duration_seconds();
        let content_width = grid.time_to_pixel(duration).max(1.0);
        let row_height = self.options.lane_height + self.options.label_strip_height;
        let selected = self.editor.view().selected;
        let mut hovered = false;

        let output = ScrollArea::horizontal()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for lane in 0..LANE_COUNT {
                    ui.add_space(self.options.lane_spacing);

                    let (rect, response) = ui.allocate_exact_size(
                        vec2(content_width, row_height),
                        Sense::click(),
                    );
                    hovered |= response.hovered();
                    let note_area = Rect::from_min_size(
                        rect.min,
                        vec2(content_width, self.options.lane_height),
                    );
                    let painter = ui.painter_at(rect);
                    painter.rect_filled(note_area, 0.0, Color32::from_gray(26));

                    // 主刻度：每拍一条网格线，下方标注秒数。
                    for tick in grid.major_tick_times() {
                        let x = rect.min.x + grid.time_to_pixel(tick);
                        painter.line_segment(
                            [pos2(x, note_area.min.y), pos2(x, note_area.max.y)],
                            Stroke::new(1.0, Color32::from_gray(90)),
                        );
                        painter.text(
                            pos2(x, note_area.max.y + 2.0),
                            Align2::CENTER_TOP,
                            format!("{tick:.2}s"),
                            FontId::proportional(10.0),
                            Color32::from_gray(140),
                        );
                    }

                    for note in self.editor.chart().notes_in_lane(lane) {
                        let x = rect.min.x + grid.time_to_pixel(note.spawn_time);
                        let note_rect = Rect::from_min_size(
                            pos2(x - 5.0, note_area.min.y + 10.0),
                            vec2(10.0, self.options.lane_height - 20.0),
                        );
                        let fill = match note.kind {
                            NoteKind::Normal => Color32::from_rgb(220, 60, 60),
                            NoteKind::Long => Color32::from_rgb(230, 140, 40),
                        };
                        painter.rect_filled(note_rect, 1.0, fill);
                        if selected == Some(note.id) {
                            painter.rect_stroke(
                                note_rect.expand(2.0),
                                1.0,
                                Stroke::new(2.0, Color32::YELLOW),
                            );
                        }
                    }

                    if response.clicked() {
                        if let Some(pos) = response.interact_pointer_pos() {
                            // 标签条上的点击不算作轨道内点击。
                            if note_area.contains(pos) {
                                commands.push(EditorCommand::PointerDown {
                                    lane,
                                    pixel_x: pos.x - rect.min.x,
                                });
                            }
                        }
                    }
                }
            });

        (hovered, output.state.offset.x)
    }

    fn inspector(&self, ui: &mut Ui, commands: &mut Vec<EditorCommand>) {
        let Some(note) = self.editor.selected_note().copied() else {
            ui.label("Click a lane to place a note; click a note to edit it.");
            return;
        };
        let duration = self.editor.chart().audio_duration_seconds();

        ui.heading("Note");
        let mut time = note.spawn_time;
        let mut lane = note.lane;
        let mut kind = note.kind;
        let mut changed = false;

        ui.horizontal(|ui| {
            ui.label("Spawn time (s):");
            changed |= ui
                .add(DragValue::new(&mut time).speed(0.05).range(0.0..=duration))
                .changed();
            ui.label("Lane:");
            changed |= ui
                .add(DragValue::new(&mut lane).speed(0.1).range(0..=LANE_COUNT - 1))
                .changed();
            ComboBox::from_id_salt("note_kind")
                .selected_text(match kind {
                    NoteKind::Normal => "Normal",
                    NoteKind::Long => "Long",
                })
                .show_ui(ui, |ui| {
                    changed |= ui
                        .selectable_value(&mut kind, NoteKind::Normal, "Normal")
                        .changed();
                    changed |= ui
                        .selectable_value(&mut kind, NoteKind::Long, "Long")
                        .changed();
                });
        });

        if changed {
            commands.push(EditorCommand::EditSelected {
                new_time: time,
                new_lane: lane,
                new_kind: kind,
            });
        }

        if ui.button("Delete note").clicked() {
            commands.push(EditorCommand::DeleteSelected);
        }
    }
}
