//! 备用音色
//!
//! 缺少采样文件时，为每个键预先渲染一段一次性的正弦音：线性起音、指数衰减，
//! 在结尾处线性淡出到 0。

use std::f32::consts::TAU;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneConfig {
    pub sample_rate: u32,
    pub attack_ms: f32,
    /// 指数衰减的时间常数
    pub decay_ms: f32,
    /// 整个音的长度
    pub length_ms: f32,
    /// 结尾淡出段的长度
    pub fade_ms: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            attack_ms: 8.0,
            decay_ms: 350.0,
            length_ms: 1_200.0,
            fade_ms: 150.0,
        }
    }
}

impl ToneConfig {
    pub fn len_samples(&self) -> usize {
        (self.length_ms.max(0.0) / 1000.0 * self.sample_rate.max(1) as f32) as usize
    }

    /// 第 `index` 个采样处的包络值，位于 [0, 1]
    pub fn envelope(&self, index: usize) -> f32 {
        let t_ms = index as f32 * 1000.0 / self.sample_rate.max(1) as f32;
        let remaining = self.length_ms - t_ms;
        if remaining <= 0.0 {
            return 0.0;
        }
        let attack = if self.attack_ms > 0.0 {
            (t_ms / self.attack_ms).min(1.0)
        } else {
            1.0
        };
        let decay = if self.decay_ms > 0.0 {
            (-(t_ms - self.attack_ms).max(0.0) / self.decay_ms).exp()
        } else {
            1.0
        };
        let fade = if self.fade_ms > 0.0 {
            (remaining / self.fade_ms).min(1.0)
        } else {
            1.0
        };
        attack * decay * fade
    }
}

/// 十二平均律，A4 (69) = 440 Hz
pub fn pitch_frequency(pitch: u8) -> f32 {
    440.0 * 2.0f32.powf((pitch as f32 - 69.0) / 12.0)
}

/// 渲染一个完整的单声道音符
pub fn render_tone(pitch: u8, config: &ToneConfig) -> Vec<f32> {
    let cycles_per_sample = pitch_frequency(pitch) / config.sample_rate.max(1) as f32;
    (0..config.len_samples())
        .map(|i| {
            let phase = (i as f32 * cycles_per_sample).fract() * TAU;
            // Fundamental plus a quieter octave.
            let wave = phase.sin() * 0.8 + (phase * 2.0).sin() * 0.2;
            wave * config.envelope(i)
        })
        .collect()
}
