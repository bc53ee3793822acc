//! 音符目录
//!
//! 88 键钢琴（A0 - C8）的静态布局：音名与 (键类型, 键序号) 之间的映射。

use std::collections::HashMap;

/// 从 C 开始的十二平均律音名表
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

// Sample files for black keys are named with flats (Bb0, Db1, ...).
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// 最低音 A0
pub const LOWEST_PITCH: u8 = 21;
/// 最高音 C8
pub const HIGHEST_PITCH: u8 = 108;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VoiceClass {
    White,
    Black,
}

/// 键盘上的一个键：键类型 + 在该类型中的序号
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId {
    pub class: VoiceClass,
    pub index: usize,
}

impl KeyId {
    pub fn white(index: usize) -> Self {
        Self {
            class: VoiceClass::White,
            index,
        }
    }

    pub fn black(index: usize) -> Self {
        Self {
            class: VoiceClass::Black,
            index,
        }
    }
}

/// 将 MIDI 音高（0-127）转换为 "C4"、"A#5" 这样的音名。
///
/// 超出范围的输入返回 `None`。
pub fn pitch_to_note_name(pitch: i32) -> Option<String> {
    if !(0..=127).contains(&pitch) {
        return None;
    }
    let octave = pitch / 12 - 1;
    let semitone = (pitch % 12) as usize;
    Some(format!("{}{}", NOTE_NAMES[semitone], octave))
}

pub fn is_black_semitone(semitone: usize) -> bool {
    [1, 3, 6, 8, 10].contains(&(semitone % 12))
}

/// 单个键的静态描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySpec {
    pub key: KeyId,
    pub pitch: u8,
    /// 显示用的音名（升号写法）
    pub label: String,
    /// 音色文件名（黑键使用降号写法）
    pub sound_name: String,
}

#[derive(Clone, Debug)]
pub struct NoteCatalog {
    whites: Vec<KeySpec>,
    blacks: Vec<KeySpec>,
    white_map: HashMap<String, usize>,
    black_map: HashMap<String, usize>,
}

impl Default for NoteCatalog {
    fn default() -> Self {
        Self::piano()
    }
}

impl NoteCatalog {
    /// 标准 88 键钢琴：52 个白键、36 个黑键
    pub fn piano() -> Self {
        let mut whites = Vec::new();
        let mut blacks = Vec::new();

        for pitch in LOWEST_PITCH..=HIGHEST_PITCH {
            let semitone = (pitch % 12) as usize;
            let octave = pitch as i32 / 12 - 1;
            let label = format!("{}{}", NOTE_NAMES[semitone], octave);

            if is_black_semitone(semitone) {
                blacks.push(KeySpec {
                    key: KeyId::black(blacks.len()),
                    pitch,
                    label,
                    sound_name: format!("{}{}", FLAT_NAMES[semitone], octave),
                });
            } else {
                whites.push(KeySpec {
                    key: KeyId::white(whites.len()),
                    pitch,
                    sound_name: label.clone(),
                    label,
                });
            }
        }

        let white_map = whites
            .iter()
            .map(|spec| (spec.label.clone(), spec.key.index))
            .collect();
        let black_map = blacks
            .iter()
            .map(|spec| (spec.label.clone(), spec.key.index))
            .collect();

        Self {
            whites,
            blacks,
            white_map,
            black_map,
        }
    }

    /// 按音名查找键；不在音域内返回 `None`，调用方应直接忽略。
    pub fn lookup(&self, name: &str) -> Option<KeyId> {
        if let Some(&index) = self.black_map.get(name) {
            return Some(KeyId::black(index));
        }
        self.white_map.get(name).map(|&index| KeyId::white(index))
    }

    pub fn lookup_pitch(&self, pitch: i32) -> Option<KeyId> {
        pitch_to_note_name(pitch).and_then(|name| self.lookup(&name))
    }

    pub fn spec(&self, key: KeyId) -> Option<&KeySpec> {
        match key.class {
            VoiceClass::White => self.whites.get(key.index),
            VoiceClass::Black => self.blacks.get(key.index),
        }
    }

    pub fn white_keys(&self) -> &[KeySpec] {
        &self.whites
    }

    pub fn black_keys(&self) -> &[KeySpec] {
        &self.blacks
    }

    pub fn keys(&self) -> impl Iterator<Item = &KeySpec> {
        self.whites.iter().chain(self.blacks.iter())
    }

    pub fn contains(&self, key: KeyId) -> bool {
        self.spec(key).is_some()
    }
}
