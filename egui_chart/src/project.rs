//! 谱面文件模块
//!
//! 谱面的保存与加载。落盘格式是带版本号的 JSON 文档：速度、音频时长
//! 与按当前内存顺序排列的音符记录。音符 id 只在进程内有意义，加载时
//! 重新分配。

use chart_core::{Chart, NoteKind, LANE_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

pub const CHART_FILE_VERSION: &str = "1.0";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct NoteRecord {
    pub spawn_time: f64,
    pub lane: usize,
    pub kind: NoteKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChartFile {
    pub version: String,
    pub tempo: u32,
    pub audio_duration_seconds: f64,
    pub notes: Vec<NoteRecord>,
}

impl ChartFile {
    /// 按谱面当前的内存顺序打包音符（透传，不重排）。
    pub fn from_chart(chart: &Chart) -> Self {
        Self {
            version: CHART_FILE_VERSION.to_string(),
            tempo: chart.tempo(),
            audio_duration_seconds: chart.audio_duration_seconds(),
            notes: chart
                .notes
                .iter()
                .map(|n| NoteRecord {
                    spawn_time: n.spawn_time,
                    lane: n.lane,
                    kind: n.kind,
                })
                .collect(),
        }
    }

    /// 还原为谱面并分配新的音符 id。时间经由插入路径钳制、轨道号
    /// 钳制到有效范围，手工编辑过的文件也不会产生越界数据。
    pub fn into_chart(self) -> Chart {
        let mut chart = Chart::new(self.tempo, self.audio_duration_seconds);
        for record in self.notes {
            chart.add_note(
                record.spawn_time,
                record.lane.min(LANE_COUNT - 1),
                record.kind,
            );
        }
        chart
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), io::Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, io::Error> {
        let json = fs::read_to_string(path)?;
        let file: ChartFile = serde_json::from_str(&json).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("chart parse error: {e}"))
        })?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chart() -> Chart {
        let mut chart = Chart::new(120, 10.0);
        chart.add_note(3.2, 2, NoteKind::Normal);
        chart.add_note(0.5, 0, NoteKind::Long);
        chart.add_note(0.5, 1, NoteKind::Normal);
        chart
    }

    #[test]
    fn json_round_trip_preserves_order_and_fields() {
        let chart = sample_chart();
        let file = ChartFile::from_chart(&chart);
        assert_eq!(file.version, CHART_FILE_VERSION);

        let json = serde_json::to_string(&file).unwrap();
        let parsed: ChartFile = serde_json::from_str(&json).unwrap();
        let restored = parsed.into_chart();

        assert_eq!(restored.tempo(), 120);
        assert_eq!(restored.audio_duration_seconds(), 10.0);
        let times: Vec<f64> = restored.notes.iter().map(|n| n.spawn_time).collect();
        assert_eq!(times, vec![3.2, 0.5, 0.5]);
        let lanes: Vec<usize> = restored.notes.iter().map(|n| n.lane).collect();
        assert_eq!(lanes, vec![2, 0, 1]);
        assert_eq!(restored.notes[1].kind, NoteKind::Long);
    }

    #[test]
    fn load_assigns_fresh_ids() {
        let chart = sample_chart();
        let restored = ChartFile::from_chart(&chart).into_chart();
        for (a, b) in chart.notes.iter().zip(&restored.notes) {
            assert_ne!(a.id, b.id);
        }
    }

    #[test]
    fn out_of_range_records_are_clamped_on_load() {
        let file = ChartFile {
            version: CHART_FILE_VERSION.to_string(),
            tempo: 120,
            audio_duration_seconds: 10.0,
            notes: vec![
                NoteRecord {
                    spawn_time: -2.0,
                    lane: 0,
                    kind: NoteKind::Normal,
                },
                NoteRecord {
                    spawn_time: 99.0,
                    lane: 17,
                    kind: NoteKind::Normal,
                },
            ],
        };
        let chart = file.into_chart();
        assert_eq!(chart.notes[0].spawn_time, 0.0);
        assert_eq!(chart.notes[1].spawn_time, 10.0);
        assert_eq!(chart.notes[1].lane, LANE_COUNT - 1);
    }

    #[test]
    fn save_and_load_round_trip_on_disk() {
        let path = std::env::temp_dir().join(format!("chart_file_test_{}.chart", std::process::id()));
        let file = ChartFile::from_chart(&sample_chart());
        file.save_to_path(&path).unwrap();

        let loaded = ChartFile::load_from_path(&path).unwrap();
        assert_eq!(loaded.notes, file.notes);
        assert_eq!(loaded.tempo, file.tempo);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_json_maps_to_invalid_data() {
        let path = std::env::temp_dir().join(format!("chart_file_bad_{}.chart", std::process::id()));
        std::fs::write(&path, "not a chart").unwrap();
        let err = ChartFile::load_from_path(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let _ = std::fs::remove_file(&path);
    }
}
