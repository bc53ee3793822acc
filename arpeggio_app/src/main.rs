mod keyboard;

use arpeggio::{
    FrameSnapshot, Hand, InputEvent, MixerBackend, NoteCatalog, NullMixer, Piano, PianoEvent,
    PianoOptions, RodioMixer, SoundBank, ToneConfig,
};
use eframe::egui::{self, Key, Sense, TopBottomPanel};
use keyboard::KeyboardLayout;
use rfd::FileDialog;
use std::path::Path;
use std::time::{Duration, Instant};

const CONFIG_FILE: &str = "arpeggio.json";

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match PianoOptions::load_or_default(Path::new(CONFIG_FILE)) {
        Ok(options) => options,
        Err(err) => {
            log::error!("{err}; falling back to defaults");
            PianoOptions::default()
        }
    };

    let catalog = NoteCatalog::piano();
    let bank = SoundBank::load_dir(&options.notes_dir, &catalog, &ToneConfig::default());
    let keyboard_size = KeyboardLayout::size(&catalog);
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([keyboard_size.x + 16.0, keyboard_size.y + 90.0]),
        ..Default::default()
    };

    match RodioMixer::new(options.channel_count, bank) {
        Ok(mixer) => run(native_options, Piano::new(mixer, options)),
        Err(err) => {
            log::error!("{err}; running without sound");
            run(native_options, Piano::new(NullMixer, options))
        }
    }
}

fn run<M: MixerBackend + 'static>(
    native_options: eframe::NativeOptions,
    piano: Piano<M>,
) -> eframe::Result<()> {
    eframe::run_native(
        "Arpeggio",
        native_options,
        Box::new(move |_cc| Ok(Box::new(PianoApp::new(piano)))),
    )
}

struct PianoApp<M: MixerBackend> {
    piano: Piano<M>,
    started: Instant,
    status_line: String,
}

impl<M: MixerBackend> PianoApp<M> {
    fn new(piano: Piano<M>) -> Self {
        Self {
            piano,
            started: Instant::now(),
            status_line: "Ready. Space plays the configured MIDI file.".to_owned(),
        }
    }

    fn now_ms(&self) -> i64 {
        self.started.elapsed().as_millis() as i64
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.piano.options().frames_per_second as f64)
    }

    /// 把本帧的键盘事件翻译成钢琴输入
    fn collect_key_input(ctx: &egui::Context) -> Vec<InputEvent> {
        ctx.input(|input| {
            input
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        repeat: false,
                        ..
                    } => key_to_input(*key),
                    _ => None,
                })
                .collect()
        })
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui, now_ms: i64) {
        egui::menu::bar(ui, |ui| {
            if ui.button("Open MIDI...").clicked() {
                self.open_midi_dialog();
            }
            let label = if self.piano.session().is_playing() {
                "Pause"
            } else {
                "Play"
            };
            if ui.button(label).clicked() {
                self.piano.handle_toggle_playback(now_ms);
            }
            ui.separator();
            for hand in [Hand::Left, Hand::Right] {
                if ui.small_button("-").clicked() {
                    self.piano.handle_octave_change(hand, -1);
                }
                ui.label(format!("{hand:?} octave {}", self.piano.dispatcher().octave(hand)));
                if ui.small_button("+").clicked() {
                    self.piano.handle_octave_change(hand, 1);
                }
                ui.separator();
            }
            match self.piano.loaded_path() {
                Some(path) => ui.label(format!("Track: {}", path.display())),
                None => ui.label("Track: (none)"),
            };
        });
    }

    fn open_midi_dialog(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("Standard MIDI", &["mid", "midi"])
            .pick_file()
        {
            // Success and failure are both reported through the event feed.
            let _ = self.piano.load_track(&path);
        }
    }

    fn report(&mut self, event: PianoEvent) {
        log::debug!("[PianoEvent] {:?}", event);
        let message = match event {
            PianoEvent::TrackLoaded { path, notes } => {
                format!("Loaded {} ({notes} notes)", path.display())
            }
            PianoEvent::LoadFailed { message } => format!("Error: {message}"),
            PianoEvent::PlaybackStarted { from_ms } => {
                format!("Playing from {:.2}s", from_ms as f64 / 1000.0)
            }
            PianoEvent::PlaybackResumed { from_ms } => {
                format!("Resumed at {:.2}s", from_ms as f64 / 1000.0)
            }
            PianoEvent::PlaybackPaused { at_ms } => {
                format!("Paused at {:.2}s", at_ms as f64 / 1000.0)
            }
            PianoEvent::PlaybackFinished => "Playback finished".to_owned(),
            PianoEvent::OctaveChanged { hand, octave } => format!("{hand:?} hand octave {octave}"),
            // Too frequent for the status line.
            PianoEvent::NoteDropped(_) => return,
        };
        self.status_line = message;
    }

    fn status_bar(&self, ui: &mut egui::Ui, snapshot: &FrameSnapshot) {
        ui.horizontal(|ui| {
            ui.label(&self.status_line);
            ui.separator();
            ui.label(format!("{:.1}s", snapshot.position_ms as f64 / 1000.0));
            ui.separator();
            ui.label(format!(
                "{} voices, {} dropped",
                snapshot.active_voices,
                self.piano.voices().dropped_count()
            ));
            if let Some(voice) = self.piano.voices().active_voices().last() {
                let name = self
                    .piano
                    .catalog()
                    .spec(voice.sound())
                    .map_or("?", |spec| spec.label.as_str());
                ui.separator();
                ui.label(format!("last {name} @ {:.2}", voice.gain()));
            }
        });
    }
}

/// Space 播放/暂停，Esc 退出，方向键调八度（上下：左手，左右：右手），其余单字符键作为字母
fn key_to_input(key: Key) -> Option<InputEvent> {
    let event = match key {
        Key::Space => InputEvent::TogglePlayback,
        Key::Escape => InputEvent::Quit,
        Key::ArrowUp => InputEvent::OctaveChange { hand: Hand::Left, delta: 1 },
        Key::ArrowDown => InputEvent::OctaveChange { hand: Hand::Left, delta: -1 },
        Key::ArrowRight => InputEvent::OctaveChange { hand: Hand::Right, delta: 1 },
        Key::ArrowLeft => InputEvent::OctaveChange { hand: Hand::Right, delta: -1 },
        other => {
            let mut chars = other.name().chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) => InputEvent::Letter(letter),
                _ => return None,
            }
        }
    };
    Some(event)
}

impl<M: MixerBackend> eframe::App for PianoApp<M> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now_ms = self.now_ms();

        for input in Self::collect_key_input(ctx) {
            if self.piano.handle_event(input, now_ms).is_break() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }

        self.piano.tick(now_ms);
        for event in self.piano.take_events() {
            self.report(event);
        }

        TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui, now_ms);
        });

        let snapshot = self.piano.snapshot(now_ms);
        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.status_bar(ui, &snapshot);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let size = KeyboardLayout::size(self.piano.catalog());
            let (response, painter) = ui.allocate_painter(size, Sense::click());
            let layout = KeyboardLayout::new(self.piano.catalog(), response.rect.min);

            if ui.input(|i| i.pointer.primary_pressed()) {
                if let Some(key) = response.hover_pos().and_then(|pos| layout.hit_test(pos)) {
                    let _ = self.piano.handle_event(InputEvent::PointerHit(key), now_ms);
                }
            }

            // Snapshot again so a key clicked this frame is already lit.
            let snapshot = self.piano.snapshot(now_ms);
            layout.paint(&painter, self.piano.catalog(), self.piano.dispatcher(), &snapshot);
        });

        ctx.request_repaint_after(self.frame_interval());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_piano_input() {
        assert_eq!(key_to_input(Key::Space), Some(InputEvent::TogglePlayback));
        assert_eq!(key_to_input(Key::Escape), Some(InputEvent::Quit));
        assert_eq!(
            key_to_input(Key::ArrowDown),
            Some(InputEvent::OctaveChange { hand: Hand::Left, delta: -1 })
        );
        assert_eq!(key_to_input(Key::Z), Some(InputEvent::Letter('Z')));
        assert_eq!(key_to_input(Key::Num5), Some(InputEvent::Letter('5')));
        assert_eq!(key_to_input(Key::Enter), None);
    }
}
