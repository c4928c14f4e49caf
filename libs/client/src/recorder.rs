//! Audio capture with live transcription
//!
//! Two independent state machines run side by side: the recording
//! (`Idle → RequestingMic → Recording → Stopped`) and the transcription
//! (`Idle → Listening → Stopped`). The host platform supplies the
//! microphone, the playback probe and the speech engine through the traits
//! below.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, interval_at},
};
use tracing::{info, warn};

/// File name used for uploaded recordings
pub const RECORDING_FILE_NAME: &str = "recording.webm";

/// Position used to force a duration computation on streamed recordings
const PROBE_POSITION: f64 = 9_007_199_254_740_991.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecorderError {
    #[error("Can't access microphone due to {0}")]
    Microphone(String),

    #[error("Speech recognition is not supported.")]
    SpeechUnsupported,

    #[error("Error with speech recognition: {0}")]
    Speech(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("A recording is already in progress")]
    AlreadyRecording,
}

/// Audio produced by a [`Microphone`]
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A loaded recording whose length can be read
#[async_trait]
pub trait Playback: Send {
    /// Length in seconds; may be infinite until the media was scanned
    fn duration(&self) -> f64;
    async fn seek(&mut self, position: f64) -> Result<(), RecorderError>;
}

#[async_trait]
pub trait Microphone: Send + Sync {
    /// Ask for permission and start capturing
    async fn start(&self) -> Result<(), RecorderError>;
    /// Stop capturing and hand over the audio
    async fn stop(&self) -> Result<Recording, RecorderError>;
    /// Load `recording` for playback
    async fn load(&self, recording: &Recording) -> Result<Box<dyn Playback>, RecorderError>;
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn is_supported(&self) -> bool;
    async fn start(&self) -> Result<(), RecorderError>;
    /// Stop listening and return the transcript so far
    async fn stop(&self) -> Result<String, RecorderError>;
}

/// Length of a loaded recording in seconds
///
/// Streamed recordings report an infinite duration until the media has been
/// scanned, so the playback is sent far ahead, read, and rewound.
pub async fn resolve_duration(playback: &mut dyn Playback) -> Result<Option<f64>, RecorderError> {
    let duration = playback.duration();
    if duration.is_finite() {
        return Ok(Some(duration));
    }

    playback.seek(PROBE_POSITION).await?;
    let duration = playback.duration();
    playback.seek(0.0).await?;

    Ok(duration.is_finite().then_some(duration))
}

/// `MM:SS` display of an elapsed time
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    RequestingMic,
    Recording,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptionState {
    #[default]
    Idle,
    Listening,
    Stopped,
}

/// Result of a finished recording session
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    pub recording: Recording,
    pub file_name: String,
    pub duration: Option<f64>,
    pub transcript: String,
}

#[derive(Debug)]
struct State {
    recording: RecordingState,
    transcription: TranscriptionState,
    elapsed_seconds: u64,
    dot_visible: bool,
    errors: Vec<RecorderError>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            recording: RecordingState::Idle,
            transcription: TranscriptionState::Idle,
            elapsed_seconds: 0,
            dot_visible: true,
            errors: Vec::new(),
        }
    }
}

/// Drives a microphone and a speech engine together
pub struct Recorder {
    microphone: Arc<dyn Microphone>,
    speech: Arc<dyn SpeechRecognizer>,
    state: Arc<Mutex<State>>,
    clock: Option<JoinHandle<()>>,
    blink: Option<JoinHandle<()>>,
}

impl Recorder {
    pub fn new(microphone: Arc<dyn Microphone>, speech: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            microphone,
            speech,
            state: Arc::new(Mutex::new(State::default())),
            clock: None,
            blink: None,
        }
    }

    pub async fn recording_state(&self) -> RecordingState {
        self.state.lock().await.recording
    }

    pub async fn transcription_state(&self) -> TranscriptionState {
        self.state.lock().await.transcription
    }

    pub async fn elapsed_seconds(&self) -> u64 {
        self.state.lock().await.elapsed_seconds
    }

    pub async fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed_seconds().await)
    }

    pub async fn is_dot_visible(&self) -> bool {
        self.state.lock().await.dot_visible
    }

    /// Errors to surface to the user, oldest first
    pub async fn take_errors(&self) -> Vec<RecorderError> {
        std::mem::take(&mut self.state.lock().await.errors)
    }

    /// Start recording and transcribing
    ///
    /// A missing or failing speech engine only disables transcription. A
    /// refused microphone aborts the whole session.
    pub async fn start(&mut self) -> Result<(), RecorderError> {
        {
            let mut state = self.state.lock().await;
            if matches!(
                state.recording,
                RecordingState::RequestingMic | RecordingState::Recording
            ) {
                return Err(RecorderError::AlreadyRecording);
            }
            *state = State {
                recording: RecordingState::RequestingMic,
                ..State::default()
            };
        }

        self.start_transcription().await;

        if let Err(e) = self.microphone.start().await {
            warn!("{}", e);
            if self.transcription_state().await == TranscriptionState::Listening {
                if let Err(speech_error) = self.speech.stop().await {
                    warn!("{}", speech_error);
                }
            }
            let mut state = self.state.lock().await;
            state.recording = RecordingState::Idle;
            state.transcription = TranscriptionState::Idle;
            state.errors.push(e.clone());
            return Err(e);
        }

        self.state.lock().await.recording = RecordingState::Recording;
        self.start_tickers();
        info!("Recording started");
        Ok(())
    }

    async fn start_transcription(&self) {
        let result = if self.speech.is_supported() {
            self.speech.start().await
        } else {
            Err(RecorderError::SpeechUnsupported)
        };

        let mut state = self.state.lock().await;
        match result {
            Ok(()) => state.transcription = TranscriptionState::Listening,
            Err(e) => {
                warn!("{}", e);
                state.errors.push(e);
            }
        }
    }

    fn start_tickers(&mut self) {
        let second = Duration::from_secs(1);

        let state = self.state.clone();
        self.clock = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + second, second);
            loop {
                ticks.tick().await;
                state.lock().await.elapsed_seconds += 1;
            }
        }));

        let state = self.state.clone();
        self.blink = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + second, second);
            loop {
                ticks.tick().await;
                let mut state = state.lock().await;
                state.dot_visible = !state.dot_visible;
            }
        }));
    }

    fn stop_tickers(&mut self) {
        for handle in [self.clock.take(), self.blink.take()].into_iter().flatten() {
            handle.abort();
        }
    }

    /// Stop both machines and collect the recording
    ///
    /// Returns `None` when nothing was being recorded.
    pub async fn stop(&mut self) -> Result<Option<CapturedAudio>, RecorderError> {
        let transcript = self.stop_transcription().await;

        if self.recording_state().await != RecordingState::Recording {
            return Ok(None);
        }

        self.stop_tickers();
        let recording = self.microphone.stop().await;
        {
            let mut state = self.state.lock().await;
            state.recording = RecordingState::Stopped;
            state.elapsed_seconds = 0;
            state.dot_visible = true;
        }
        let recording = recording?;

        let mut playback = self.microphone.load(&recording).await?;
        let duration = resolve_duration(playback.as_mut()).await?;
        info!("Recording stopped");

        Ok(Some(CapturedAudio {
            recording,
            file_name: RECORDING_FILE_NAME.to_string(),
            duration,
            transcript,
        }))
    }

    /// The speech engine ended on its own, e.g. after a long silence
    pub async fn speech_ended(&mut self) -> Result<Option<CapturedAudio>, RecorderError> {
        info!("Speech recognition stopped due to no further speech detected");
        self.stop().await
    }

    async fn stop_transcription(&self) -> String {
        if self.transcription_state().await != TranscriptionState::Listening {
            return String::new();
        }

        let result = self.speech.stop().await;
        let mut state = self.state.lock().await;
        state.transcription = TranscriptionState::Stopped;
        match result {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!("{}", e);
                state.errors.push(e);
                String::new()
            }
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop_tickers();
    }
}
