//! Looping alarm sound.
//!
//! The output device is a single shared actuator: every `play` replaces
//! whatever is sounding, and `stop` only acts when the caller still owns it.
//! Playback runs on its own thread so the engine never waits on audio setup.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rodio::source::SineWave;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use serde::{Deserialize, Serialize};

use super::PresentationHandle;
use crate::core::error::SinkError;

const BEEP_ON: Duration = Duration::from_millis(1000);
const BEEP_OFF: Duration = Duration::from_millis(500);

/// Sound configuration - persisted in settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSettings {
    /// Audio file to loop; the built-in tone is used when unset or unreadable
    #[serde(default)]
    pub alarm_file: Option<PathBuf>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_tone_hz")]
    pub tone_hz: f32,
}

fn default_volume() -> f32 {
    1.0
}

fn default_tone_hz() -> f32 {
    880.0
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            alarm_file: None,
            volume: default_volume(),
            tone_hz: default_tone_hz(),
        }
    }
}

enum SoundCommand {
    Play(PresentationHandle),
    Stop(PresentationHandle),
    StopAll,
}

pub struct AlarmSound {
    tx: Option<mpsc::Sender<SoundCommand>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl AlarmSound {
    /// Open the default output device on a dedicated audio thread.
    pub fn open(settings: SoundSettings) -> Result<Self, SinkError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("alarm-sound".to_string())
            .spawn(move || audio_loop(settings, rx, ready_tx))
            .map_err(|e| SinkError::Audio(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx: Some(tx),
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(SinkError::Audio(e))
            }
            Err(_) => Err(SinkError::Audio("audio thread exited during setup".to_string())),
        }
    }

    /// Start looping the alarm for `owner`, replacing any current playback.
    pub fn play(&self, owner: PresentationHandle) -> Result<(), SinkError> {
        self.send(SoundCommand::Play(owner))
    }

    /// Stop playback if `owner` is the one sounding.
    pub fn stop(&self, owner: PresentationHandle) {
        if let Err(e) = self.send(SoundCommand::Stop(owner)) {
            log::debug!("Could not stop alarm sound: {}", e);
        }
    }

    pub fn stop_all(&self) {
        if let Err(e) = self.send(SoundCommand::StopAll) {
            log::debug!("Could not stop alarm sound: {}", e);
        }
    }

    fn send(&self, command: SoundCommand) -> Result<(), SinkError> {
        self.tx
            .as_ref()
            .ok_or_else(|| SinkError::Audio("audio thread stopped".to_string()))?
            .send(command)
            .map_err(|_| SinkError::Audio("audio thread stopped".to_string()))
    }
}

impl Drop for AlarmSound {
    fn drop(&mut self) {
        // Closing the channel ends the audio loop.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn audio_loop(
    settings: SoundSettings,
    rx: mpsc::Receiver<SoundCommand>,
    ready: mpsc::Sender<Result<(), String>>,
) {
    let stream = match OutputStreamBuilder::open_default_stream() {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut current: Option<(PresentationHandle, Sink)> = None;

    for command in rx {
        match command {
            SoundCommand::Play(owner) => {
                if let Some((_, previous)) = current.take() {
                    previous.stop();
                }
                let sink = Sink::connect_new(stream.mixer());
                sink.set_volume(settings.volume);
                append_alarm(&sink, &settings);
                log::debug!("Alarm sound started for {}", owner);
                current = Some((owner, sink));
            }
            SoundCommand::Stop(owner) => {
                if matches!(&current, Some((playing, _)) if *playing == owner) {
                    if let Some((_, sink)) = current.take() {
                        sink.stop();
                        log::debug!("Alarm sound stopped for {}", owner);
                    }
                }
            }
            SoundCommand::StopAll => {
                if let Some((_, sink)) = current.take() {
                    sink.stop();
                }
            }
        }
    }

    if let Some((_, sink)) = current.take() {
        sink.stop();
    }
}

fn append_alarm(sink: &Sink, settings: &SoundSettings) {
    if let Some(path) = &settings.alarm_file {
        match open_alarm_file(path) {
            Ok(decoder) => {
                sink.append(decoder.repeat_infinite());
                return;
            }
            Err(e) => {
                log::warn!("Cannot play alarm file {:?}, using built-in tone: {}", path, e);
            }
        }
    }
    sink.append(alarm_tone(settings.tone_hz));
}

fn open_alarm_file(path: &Path) -> Result<Decoder<BufReader<File>>, SinkError> {
    let file = File::open(path).map_err(|e| SinkError::Audio(e.to_string()))?;
    Decoder::new(BufReader::new(file)).map_err(|e| SinkError::Audio(e.to_string()))
}

/// Endless 1s beep / 0.5s pause, matching the vibration rhythm.
fn alarm_tone(frequency: f32) -> impl Source + Send + 'static {
    SineWave::new(frequency)
        .take_duration(BEEP_ON)
        .delay(BEEP_OFF)
        .amplify(0.8)
        .repeat_infinite()
}
