use crate::catalog::{KeyId, NoteCatalog};
use crate::error::LoadError;
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::fs;
use std::path::Path;

/// Default tempo when a file carries no Set Tempo event (120 BPM).
const DEFAULT_TEMPO_US: u32 = 500_000;

/// 一次需要触发的音符
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    pub time_offset_ms: f64, // Absolute milliseconds from the start of the file
    pub key: KeyId,
    pub velocity: u8, // 1-127
}

impl NoteEvent {
    pub fn new(time_offset_ms: f64, key: KeyId, velocity: u8) -> Self {
        Self {
            time_offset_ms,
            key,
            velocity,
        }
    }
}

/// 按时间升序排列的音符序列，以及指向下一个待触发音符的游标
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackTrack {
    events: Vec<NoteEvent>,
    next_index: usize,
}

impl PlaybackTrack {
    /// Sorts by time; equal timestamps keep their original order.
    pub fn from_events(mut events: Vec<NoteEvent>) -> Self {
        events.sort_by(|a, b| a.time_offset_ms.total_cmp(&b.time_offset_ms));
        Self {
            events,
            next_index: 0,
        }
    }

    pub fn load(path: &Path, catalog: &NoteCatalog) -> Result<Self, LoadError> {
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let track = Self::parse(&bytes, catalog).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded {} notes from {}", track.len(), path.display());
        Ok(track)
    }

    pub fn parse(bytes: &[u8], catalog: &NoteCatalog) -> Result<Self, midly::Error> {
        let smf = Smf::parse(bytes)?;
        Ok(Self::from_smf(&smf, catalog))
    }

    pub fn from_smf(smf: &Smf, catalog: &NoteCatalog) -> Self {
        // Merge every track onto one absolute tick axis. Format 2 files hold
        // independent sequences that play one after another.
        let sequential = matches!(smf.header.format, Format::Sequential);
        let mut merged: Vec<(u64, TrackEventKind)> = Vec::new();
        let mut track_offset = 0u64;
        for track in &smf.tracks {
            let mut current_ticks = track_offset;
            for event in track {
                current_ticks += event.delta.as_int() as u64;
                merged.push((current_ticks, event.kind));
            }
            if sequential {
                track_offset = current_ticks;
            }
        }
        // Stable: events on the same tick keep track order.
        merged.sort_by_key(|(tick, _)| *tick);

        let mut tempo_us = DEFAULT_TEMPO_US;
        let mut last_tick = 0u64;
        let mut current_seconds = 0.0f64;
        let mut events = Vec::new();
        let mut dropped = 0usize;

        for (tick, kind) in merged {
            current_seconds +=
                (tick - last_tick) as f64 * seconds_per_tick(smf.header.timing, tempo_us);
            last_tick = tick;

            match kind {
                TrackEventKind::Meta(MetaMessage::Tempo(value)) => {
                    if value.as_int() > 0 {
                        tempo_us = value.as_int();
                    }
                }
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, vel },
                    ..
                } => {
                    // NoteOn with velocity 0 is a release
                    if vel.as_int() == 0 {
                        continue;
                    }
                    match catalog.lookup_pitch(key.as_int() as i32) {
                        Some(key) => events.push(NoteEvent::new(
                            current_seconds * 1000.0,
                            key,
                            vel.as_int(),
                        )),
                        None => dropped += 1,
                    }
                }
                _ => {}
            }
        }

        if dropped > 0 {
            log::debug!("Skipped {} notes outside the keyboard range", dropped);
        }

        Self::from_events(events)
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NoteEvent> {
        self.events.get(index)
    }

    /// 最后一个音符的时间（毫秒）
    pub fn duration_ms(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.time_offset_ms)
    }

    pub fn cursor(&self) -> usize {
        self.next_index
    }

    pub fn is_finished(&self) -> bool {
        self.next_index >= self.events.len()
    }

    pub fn reset_cursor(&mut self) {
        self.next_index = 0;
    }

    /// 将游标移动到 `time_ms` 处（不会重复触发之前的音符）
    pub fn seek_cursor(&mut self, time_ms: f64) {
        self.next_index = self.find_first_event_at_or_after(time_ms);
    }

    /// 第一个 `time_offset_ms >= time_ms` 的下标；没有则返回长度。
    pub fn find_first_event_at_or_after(&self, time_ms: f64) -> usize {
        self.events
            .partition_point(|event| event.time_offset_ms < time_ms)
    }

    /// 如果游标处的音符已经到时间，返回它并前移游标。
    pub fn pop_due(&mut self, elapsed_ms: f64) -> Option<NoteEvent> {
        let event = *self.events.get(self.next_index)?;
        if event.time_offset_ms <= elapsed_ms {
            self.next_index += 1;
            Some(event)
        } else {
            None
        }
    }
}

fn seconds_per_tick(timing: Timing, tempo_us: u32) -> f64 {
    match timing {
        Timing::Metrical(ticks_per_beat) => {
            let ticks_per_beat = ticks_per_beat.as_int().max(1) as f64;
            tempo_us as f64 / 1_000_000.0 / ticks_per_beat
        }
        Timing::Timecode(fps, subframes) => {
            1.0 / (fps.as_f32() as f64 * subframes.max(1) as f64)
        }
    }
}
