//! 播放调度模块
//!
//! `PlaybackSession` 是曲目、游标与传输时钟的唯一所有者。
//! 宿主每帧调用 `advance`，到时间的音符按时间顺序交给回调触发。

use crate::catalog::NoteCatalog;
use crate::error::LoadError;
use crate::structure::{NoteEvent, PlaybackTrack};
use crate::transport::Transport;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    /// 刚加载或已播放完毕，下一次播放从头开始
    Stopped,
    Playing,
    Paused,
}

/// `advance` 的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Idle,
    Playing { triggered: usize },
    Finished { triggered: usize },
}

/// `toggle` 的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    Started { from_ms: i64 },
    Resumed { from_ms: i64 },
    Paused { at_ms: i64 },
}

#[derive(Clone, Debug)]
pub struct PlaybackSession {
    track: PlaybackTrack,
    transport: Transport,
    state: PlayState,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            track: PlaybackTrack::default(),
            transport: Transport::new(),
            state: PlayState::Stopped,
        }
    }

    /// 加载 MIDI 文件；失败时保留原有曲目不变。
    pub fn load(&mut self, path: &Path, catalog: &NoteCatalog) -> Result<usize, LoadError> {
        let track = PlaybackTrack::load(path, catalog)?;
        let notes = track.len();
        self.replace_track(track);
        Ok(notes)
    }

    /// 替换曲目：游标归零，停止传输。已经在发声的音不受影响。
    pub fn replace_track(&mut self, mut track: PlaybackTrack) {
        track.reset_cursor();
        self.track = track;
        self.transport.stop();
        self.state = PlayState::Stopped;
    }

    pub fn track(&self) -> &PlaybackTrack {
        &self.track
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn position_ms(&self, now_ms: i64) -> i64 {
        self.transport.elapsed_ms(now_ms)
    }

    /// 从指定位置开始播放，跳过之前的音符
    pub fn start_from_position(&mut self, now_ms: i64, position_ms: i64) {
        self.track.seek_cursor(position_ms as f64);
        self.transport.start(now_ms, position_ms);
        self.state = PlayState::Playing;
    }

    pub fn pause(&mut self, now_ms: i64) {
        if self.state != PlayState::Playing {
            return;
        }
        self.transport.pause(now_ms);
        self.state = PlayState::Paused;
    }

    pub fn resume(&mut self, now_ms: i64) {
        if self.state != PlayState::Paused {
            return;
        }
        let position = self.transport.elapsed_ms(now_ms);
        self.transport.resume_from(now_ms, position);
        self.state = PlayState::Playing;
    }

    /// 跳转：重新定位游标与锚点，不改变播放/暂停状态
    pub fn seek(&mut self, now_ms: i64, target_ms: i64) {
        self.track.seek_cursor(target_ms as f64);
        self.transport.seek(now_ms, target_ms);
        if self.state == PlayState::Stopped {
            self.state = PlayState::Paused;
        }
    }

    /// 播放/暂停切换
    pub fn toggle(&mut self, now_ms: i64, start_offset_ms: i64) -> Toggle {
        match self.state {
            PlayState::Stopped => {
                self.start_from_position(now_ms, start_offset_ms);
                Toggle::Started {
                    from_ms: start_offset_ms,
                }
            }
            PlayState::Paused => {
                self.resume(now_ms);
                Toggle::Resumed {
                    from_ms: self.transport.elapsed_ms(now_ms),
                }
            }
            PlayState::Playing => {
                self.pause(now_ms);
                Toggle::Paused {
                    at_ms: self.transport.elapsed_ms(now_ms),
                }
            }
        }
    }

    /// 更新播放（应在每帧调用）
    ///
    /// 触发所有 `time_offset_ms <= elapsed` 的音符，遇到未来的音符立即停止。
    pub fn advance<F>(&mut self, now_ms: i64, mut on_event: F) -> Advance
    where
        F: FnMut(&NoteEvent),
    {
        if !self.transport.is_active() {
            return Advance::Idle;
        }

        let elapsed = self.transport.elapsed_ms(now_ms) as f64;
        let mut triggered = 0;
        while let Some(event) = self.track.pop_due(elapsed) {
            on_event(&event);
            triggered += 1;
        }

        if self.track.is_finished() {
            self.transport.pause(now_ms);
            self.state = PlayState::Stopped;
            log::info!("Playback finished.");
            Advance::Finished { triggered }
        } else {
            Advance::Playing { triggered }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KeyId;

    fn session_with(times_ms: &[f64]) -> PlaybackSession {
        let mut session = PlaybackSession::new();
        session.replace_track(PlaybackTrack::from_events(
            times_ms
                .iter()
                .enumerate()
                .map(|(i, &t)| NoteEvent::new(t, KeyId::white(i), 100))
                .collect(),
        ));
        session
    }

    fn collect(session: &mut PlaybackSession, now_ms: i64) -> (Advance, Vec<f64>) {
        let mut fired = Vec::new();
        let result = session.advance(now_ms, |e| fired.push(e.time_offset_ms));
        (result, fired)
    }

    #[test]
    fn idle_until_started() {
        let mut session = session_with(&[0.0, 100.0]);
        assert_eq!(collect(&mut session, 10_000).0, Advance::Idle);
        assert_eq!(session.track().cursor(), 0);
    }

    #[test]
    fn releases_only_due_events_in_order() {
        let mut session = session_with(&[0.0, 100.0, 100.0, 250.0]);
        session.start_from_position(1_000, 0);

        let (result, fired) = collect(&mut session, 1_100);
        assert_eq!(result, Advance::Playing { triggered: 3 });
        assert_eq!(fired, vec![0.0, 100.0, 100.0]);

        let (_, fired) = collect(&mut session, 1_249);
        assert!(fired.is_empty());

        let (result, fired) = collect(&mut session, 1_250);
        assert_eq!(result, Advance::Finished { triggered: 1 });
        assert_eq!(fired, vec![250.0]);
        assert_eq!(session.state(), PlayState::Stopped);
        assert!(!session.transport().is_active());
    }

    #[test]
    fn repeated_advance_with_same_time_does_not_double_trigger() {
        let mut session = session_with(&[0.0, 50.0, 500.0]);
        session.start_from_position(0, 0);
        assert_eq!(collect(&mut session, 60).1.len(), 2);
        assert_eq!(collect(&mut session, 60).1.len(), 0);
        assert_eq!(collect(&mut session, 60).1.len(), 0);
        assert_eq!(session.track().cursor(), 2);
    }

    #[test]
    fn seek_skips_events_before_target() {
        let mut session = session_with(&[1000.0, 2000.0, 3000.0, 4000.0]);
        session.start_from_position(0, 0);
        session.seek(100, 2500);

        let (_, fired) = collect(&mut session, 1_700);
        assert_eq!(fired, vec![3000.0, 4000.0]);
    }

    #[test]
    fn seek_then_advance_triggers_window_only() {
        let mut session = session_with(&[1000.0, 2000.0, 3000.0, 4000.0, 5000.0]);
        session.start_from_position(0, 0);
        session.seek(0, 2000);

        // elapsed = 3500: window [2000, 3500]
        let (_, fired) = collect(&mut session, 1_500);
        assert_eq!(fired, vec![2000.0, 3000.0]);
    }

    #[test]
    fn seek_while_stopped_resumes_from_target() {
        let mut session = session_with(&[1000.0, 2000.0, 3000.0, 4000.0]);
        session.seek(0, 2500);
        assert_eq!(session.state(), PlayState::Paused);
        assert_eq!(session.track().cursor(), 2);
        assert_eq!(collect(&mut session, 400).0, Advance::Idle);

        assert_eq!(session.toggle(500, 0), Toggle::Resumed { from_ms: 2500 });
        assert_eq!(session.track().cursor(), 2);
        assert!(collect(&mut session, 999).1.is_empty());
        assert_eq!(collect(&mut session, 1_000).1, vec![3000.0]);
    }

    #[test]
    fn pause_halts_scheduling_and_resume_continues() {
        let mut session = session_with(&[0.0, 500.0, 1000.0]);
        assert!(matches!(session.toggle(0, 0), Toggle::Started { from_ms: 0 }));
        assert_eq!(collect(&mut session, 10).1, vec![0.0]);

        assert_eq!(session.toggle(300, 0), Toggle::Paused { at_ms: 300 });
        assert_eq!(collect(&mut session, 5_000).0, Advance::Idle);

        assert_eq!(session.toggle(5_000, 0), Toggle::Resumed { from_ms: 300 });
        assert!(collect(&mut session, 5_199).1.is_empty());
        assert_eq!(collect(&mut session, 5_200).1, vec![500.0]);
    }

    #[test]
    fn start_offset_skips_earlier_notes() {
        let mut session = session_with(&[0.0, 100.0, 135_000.0, 135_500.0]);
        session.toggle(1_000, 135_000);
        assert_eq!(session.track().cursor(), 2);
        assert_eq!(collect(&mut session, 1_000).1, vec![135_000.0]);
    }

    #[test]
    fn restart_after_finish_starts_over() {
        let mut session = session_with(&[0.0, 10.0]);
        session.toggle(0, 0);
        assert!(matches!(collect(&mut session, 20).0, Advance::Finished { .. }));
        assert!(matches!(session.toggle(100, 0), Toggle::Started { .. }));
        assert_eq!(collect(&mut session, 120).1, vec![0.0, 10.0]);
    }

    #[test]
    fn start_past_the_end_finishes_immediately() {
        let mut session = session_with(&[0.0]);
        session.start_from_position(0, 10_000);
        assert_eq!(collect(&mut session, 0).0, Advance::Finished { triggered: 0 });
    }

    #[test]
    fn failed_load_keeps_previous_track() {
        let mut session = session_with(&[0.0, 1.0]);
        session.start_from_position(0, 0);
        let dir = tempfile::tempdir().unwrap();
        let result = session.load(&dir.path().join("nope.mid"), &NoteCatalog::piano());
        assert!(result.is_err());
        assert_eq!(session.track().len(), 2);
        assert!(session.is_playing());
    }

    #[test]
    fn replacing_track_resets_cursor_and_stops() {
        let mut session = session_with(&[0.0, 1.0]);
        session.start_from_position(0, 0);
        collect(&mut session, 0);
        session.replace_track(PlaybackTrack::from_events(vec![NoteEvent::new(
            5.0,
            KeyId::black(0),
            1,
        )]));
        assert_eq!(session.track().cursor(), 0);
        assert_eq!(session.state(), PlayState::Stopped);
        assert!(!session.transport().is_active());
    }
}
