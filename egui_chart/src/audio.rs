use chart_core::LANE_COUNT;
use crossbeam_channel::{unbounded, Receiver, Sender};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::time::Duration;

/// 宿主可替换的音频反馈后端抽象。
pub trait AudioBackend {
    /// 某条轨道的音符到期（或被触发）时播放一次打击音。
    fn lane_hit(&self, lane: usize);
    fn all_off(&self);
    fn set_volume(&self, volume: f32);
}

/// 每条轨道一个固定音高（A 小调五声，低轨道音低）。
const LANE_FREQUENCIES: [f32; LANE_COUNT] = [440.0, 523.25, 659.25, 783.99];

/// 默认的打击音播放实现：rodio 输出流 + 指数衰减的正弦音。
pub struct AudioEngine {
    _stream: OutputStream,
    _handle: OutputStreamHandle,
    sender: Sender<AudioMessage>,
}

impl AudioEngine {
    pub fn new() -> Self {
        Self::with_config(BlipConfig::default())
    }

    pub fn with_config(config: BlipConfig) -> Self {
        let (_stream, handle) = OutputStream::try_default().expect("无法初始化输出设备");
        let (sender, receiver) = unbounded();
        let mixer = BlipMixer::new(receiver, config);
        handle
            .play_raw(mixer.convert_samples())
            .expect("无法启动音频线程");

        Self {
            _stream,
            _handle: handle,
            sender,
        }
    }

    fn dispatch(&self, msg: AudioMessage) {
        let _ = self.sender.send(msg);
    }
}

impl AudioBackend for AudioEngine {
    fn lane_hit(&self, lane: usize) {
        if lane < LANE_COUNT {
            self.dispatch(AudioMessage::LaneHit { lane });
        }
    }

    fn all_off(&self) {
        self.dispatch(AudioMessage::AllOff);
    }

    fn set_volume(&self, volume: f32) {
        self.dispatch(AudioMessage::SetVolume(volume));
    }
}

/// 空实现，允许宿主禁用音频输出（以及无声测试）。
#[derive(Default)]
pub struct NullAudio;

impl AudioBackend for NullAudio {
    fn lane_hit(&self, _lane: usize) {}
    fn all_off(&self) {}
    fn set_volume(&self, _volume: f32) {}
}

#[derive(Clone, Copy, Debug)]
pub struct BlipConfig {
    pub sample_rate: u32,
    pub max_voices: usize,
    pub decay_ms: f32,
}

impl Default for BlipConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            max_voices: 16,
            decay_ms: 140.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum AudioMessage {
    LaneHit { lane: usize },
    AllOff,
    SetVolume(f32),
}

struct BlipMixer {
    receiver: Receiver<AudioMessage>,
    voices: Vec<BlipVoice>,
    volume: f32,
    config: BlipConfig,
}

impl BlipMixer {
    fn new(receiver: Receiver<AudioMessage>, config: BlipConfig) -> Self {
        Self {
            receiver,
            voices: Vec::new(),
            volume: 0.5,
            config,
        }
    }

    fn process_messages(&mut self) {
        while let Ok(msg) = self.receiver.try_recv() {
            match msg {
                AudioMessage::LaneHit { lane } => {
                    if self.voices.len() >= self.config.max_voices {
                        self.voices.remove(0);
                    }
                    self.voices
                        .push(BlipVoice::new(LANE_FREQUENCIES[lane], &self.config));
                }
                AudioMessage::AllOff => {
                    self.voices.clear();
                }
                AudioMessage::SetVolume(vol) => {
                    self.volume = vol.clamp(0.0, 2.0);
                }
            }
        }
    }
}

impl Iterator for BlipMixer {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.process_messages();

        if self.voices.is_empty() {
            return Some(0.0);
        }

        let sample_rate = self.config.sample_rate;
        let mut mix = 0.0;
        self.voices.retain_mut(|voice| {
            mix += voice.next_sample(sample_rate);
            !voice.is_finished()
        });

        Some((mix * self.volume * 0.7).tanh())
    }
}

impl Source for BlipMixer {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

struct BlipVoice {
    phase: f32,
    frequency: f32,
    level: f32,
    decay_step: f32,
}

impl BlipVoice {
    fn new(frequency: f32, config: &BlipConfig) -> Self {
        let decay_samples = (config.decay_ms.max(1.0) / 1000.0) * config.sample_rate as f32;
        Self {
            phase: 0.0,
            frequency,
            level: 1.0,
            decay_step: 1.0 / decay_samples.max(1.0),
        }
    }

    fn next_sample(&mut self, sample_rate: u32) -> f32 {
        let sample = (self.phase * 2.0 * std::f32::consts::PI).sin() * self.level;
        self.phase += self.frequency / sample_rate as f32;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.level = (self.level - self.decay_step).max(0.0);
        sample
    }

    fn is_finished(&self) -> bool {
        self.level <= 0.0
    }
}
