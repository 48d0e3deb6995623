use chart_core::{Chart, NoteKind, LANE_COUNT};
use eframe::egui::{self, TopBottomPanel};
use egui_chart::{AudioBackend, AudioEngine, ChartEditor, ChartTimeline, EditorOptions};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;

mod play;

use play::PlaySession;

/// 四条轨道对应的触发键。
const LANE_KEYS: [egui::Key; LANE_COUNT] = [egui::Key::U, egui::Key::I, egui::Key::O, egui::Key::P];

fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "egui Chart Editor Example",
        native_options,
        Box::new(|_cc| Ok(Box::new(ChartApp::new()))),
    )
}

struct ChartApp {
    editor: ChartEditor,
    audio: Arc<dyn AudioBackend>,
    session: Option<PlaySession>,
    current_path: Option<PathBuf>,
    status_line: String,
}

impl ChartApp {
    fn new() -> Self {
        let audio: Arc<dyn AudioBackend> = Arc::new(AudioEngine::new());

        // 开一张演示谱面：四条轨道上的一小段滚奏。
        let mut chart = Chart::new(120, 30.0);
        chart.add_note(0.5, 0, NoteKind::Normal);
        chart.add_note(1.0, 1, NoteKind::Normal);
        chart.add_note(1.5, 2, NoteKind::Normal);
        chart.add_note(2.0, 3, NoteKind::Long);

        let editor = ChartEditor::new(chart, EditorOptions::default())
            .expect("demo chart has a positive duration");

        Self {
            editor,
            audio,
            session: None,
            current_path: None,
            status_line: "Ready".to_owned(),
        }
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("New").clicked() {
                    self.new_chart();
                    ui.close_menu();
                }
                if ui.button("Open...").clicked() {
                    self.open_chart_dialog();
                    ui.close_menu();
                }
                if ui.button("Save").clicked() {
                    self.save_chart();
                    ui.close_menu();
                }
                if ui.button("Save As...").clicked() {
                    self.save_chart_as_dialog();
                    ui.close_menu();
                }
            });

            ui.separator();
            if self.session.is_none() {
                if ui.button("▶ Play").clicked() {
                    self.start_playback();
                }
            } else if ui.button("⏹ Stop").clicked() {
                self.stop_playback();
            }

            if let Some(path) = &self.current_path {
                ui.label(format!(" Chart: {}", path.display()));
            } else {
                ui.label(" Chart: (unsaved)");
            }
        });
    }

    fn new_chart(&mut self) {
        self.stop_playback();
        match self.editor.replace_chart(Chart::new(120, 30.0)) {
            Ok(()) => {
                self.current_path = None;
                self.set_status("Created new chart");
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn open_chart_dialog(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("Chart File", &["chart"])
            .pick_file()
        {
            self.stop_playback();
            match self.editor.load_from_path(&path) {
                Ok(()) => {
                    self.current_path = Some(path.clone());
                    self.set_status(format!("Opened {}", path.display()));
                }
                Err(err) => self.set_error(err.to_string()),
            }
        }
    }

    fn save_chart(&mut self) {
        if let Some(path) = self.current_path.clone() {
            match self.editor.save_to_path(&path) {
                Ok(()) => self.set_status(format!("Saved {}", path.display())),
                Err(err) => self.set_error(err.to_string()),
            }
        } else {
            self.save_chart_as_dialog();
        }
    }

    fn save_chart_as_dialog(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("Chart File", &["chart"])
            .set_file_name(self.default_file_name())
            .save_file()
        {
            match self.editor.save_to_path(&path) {
                Ok(()) => {
                    self.current_path = Some(path.clone());
                    self.set_status(format!("Saved {}", path.display()));
                }
                Err(err) => self.set_error(err.to_string()),
            }
        }
    }

    fn default_file_name(&self) -> String {
        self.current_path
            .as_ref()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .map(|name| format!("{name}.chart"))
            .unwrap_or_else(|| "chart.chart".to_owned())
    }

    fn start_playback(&mut self) {
        self.session = Some(PlaySession::new(self.editor.chart()));
        self.set_status("Playing");
    }

    fn stop_playback(&mut self) {
        if self.session.take().is_some() {
            self.audio.all_off();
            self.set_status("Stopped");
        }
    }

    fn play_view(&mut self, ui: &mut egui::Ui) {
        let now = ui.input(|i| i.time);
        // 输入采集：每帧一个按键布尔数组，按轨道索引。
        let keys: [bool; LANE_COUNT] = LANE_KEYS.map(|key| ui.input(|i| i.key_down(key)));

        let Some(session) = &mut self.session else {
            return;
        };
        ui.ctx().request_repaint();

        let tick = session.tick(now, self.audio.as_ref());
        if tick.completed {
            self.status_line = "Chart complete".to_owned();
        }

        // 按键演奏反馈（独立于谱面调度）。
        for lane in 0..LANE_COUNT {
            if ui.input(|i| i.key_pressed(LANE_KEYS[lane])) {
                self.audio.lane_hit(lane);
            }
        }

        if session.is_completed() {
            ui.heading(format!("Chart complete ({:.2}s)", session.elapsed()));
        } else {
            ui.heading(format!(
                "{:.2}s / {:.2}s, {} notes left",
                session.elapsed(),
                session.duration(),
                session.remaining_notes()
            ));
        }
        ui.add(egui::ProgressBar::new(session.progress()));
        ui.add_space(8.0);

        let approach_window = 4.0_f64; // 只画未来几秒内的音符
        let hit_line_x = 70.0;
        let pixels_per_second =
            ((ui.available_width() - hit_line_x - 20.0).max(100.0)) / approach_window as f32;
        let elapsed = session.elapsed();
        let upcoming: Vec<(usize, f64, NoteKind)> = self
            .editor
            .chart()
            .sorted_by_spawn_time()
            .filter(|n| n.spawn_time >= elapsed && n.spawn_time <= elapsed + approach_window)
            .map(|n| (n.lane, n.spawn_time, n.kind))
            .collect();

        for lane in 0..LANE_COUNT {
            ui.add_space(6.0);
            let (rect, _response) = ui
                .allocate_exact_size(egui::vec2(ui.available_width(), 40.0), egui::Sense::hover());
            let painter = ui.painter_at(rect);
            painter.rect_filled(rect, 2.0, egui::Color32::from_gray(26));

            // 到期闪光
            let flash = session.lane_flash(lane);
            if flash > 0.0 {
                let alpha = (flash * 160.0) as u8;
                painter.rect_filled(
                    rect,
                    2.0,
                    egui::Color32::from_rgba_unmultiplied(255, 200, 60, alpha),
                );
            }

            // 判定线
            painter.line_segment(
                [
                    egui::pos2(rect.min.x + hit_line_x, rect.min.y),
                    egui::pos2(rect.min.x + hit_line_x, rect.max.y),
                ],
                egui::Stroke::new(2.0, egui::Color32::from_gray(180)),
            );

            // 按键指示灯
            let key_color = if keys[lane] {
                egui::Color32::from_rgb(120, 220, 120)
            } else {
                egui::Color32::from_gray(70)
            };
            painter.circle_filled(egui::pos2(rect.min.x + 30.0, rect.center().y), 10.0, key_color);

            // 接近判定线的音符
            for (note_lane, spawn_time, kind) in &upcoming {
                if *note_lane != lane {
                    continue;
                }
                let x = rect.min.x
                    + hit_line_x
                    + ((spawn_time - elapsed) as f32 * pixels_per_second);
                let color = match kind {
                    NoteKind::Normal => egui::Color32::from_rgb(220, 60, 60),
                    NoteKind::Long => egui::Color32::from_rgb(230, 140, 40),
                };
                painter.rect_filled(
                    egui::Rect::from_center_size(
                        egui::pos2(x, rect.center().y),
                        egui::vec2(10.0, 26.0),
                    ),
                    1.0,
                    color,
                );
            }
        }

        ui.add_space(12.0);
        ui.label("Lanes are played with U / I / O / P.");
    }

    fn set_status<S: Into<String>>(&mut self, msg: S) {
        self.status_line = msg.into();
        log::info!("{}", self.status_line);
    }

    fn set_error<E: Into<String>>(&mut self, err: E) {
        let msg = err.into();
        self.status_line = format!("Error: {msg}");
        log::error!("{msg}");
    }
}

impl eframe::App for ChartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.is_some() {
                self.play_view(ui);
            } else {
                ChartTimeline::new(&mut self.editor).ui(ui);
            }
        });

        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(self.status_line.clone());
        });

        for event in self.editor.take_events() {
            log::info!("[EditorEvent] {:?}", event);
        }
    }
}
