//! The playback side: voices, the outputs which play them and the tap which lets the analyser listen.
mod output;
mod tap;
mod voice;

use std::{fmt, sync::Arc};

use cpal::SampleRate;

pub use output::{CpalOutput, NullOutput, OutputConnection, OutputDevice, OutputFormat};
pub use tap::{SampleTap, TapFetcher};
pub use voice::{PlaybackState, Voice};

/// How the audio data reaches the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphKind {
    /// The whole file is decoded before playback starts.
    Buffered,
    /// The file is played while it's decoded.
    Streaming,
}

/// A playing (or soon playing) audio file connected to an output.
pub struct AudioGraph {
    kind: GraphKind,
    voice: Arc<Voice>,

    _connection: OutputConnection,
}

impl AudioGraph {
    pub(crate) fn new(kind: GraphKind, voice: Arc<Voice>, connection: OutputConnection) -> Self {
        Self {
            kind,
            voice,
            _connection: connection,
        }
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Returns a handle to control the playback of this graph.
    pub fn playback(&self) -> PlaybackHandle {
        PlaybackHandle::new(self.voice.clone())
    }

    /// Returns a fetcher which provides the samples this graph played most recently.
    pub fn fetcher(&self) -> TapFetcher {
        let sample_rate = SampleRate(self.voice.format().sample_rate);
        TapFetcher::new(self.voice.tap(), sample_rate)
    }

    pub fn voice(&self) -> &Arc<Voice> {
        &self.voice
    }
}

impl fmt::Debug for AudioGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioGraph")
            .field("kind", &self.kind)
            .field("state", &self.voice.state())
            .finish_non_exhaustive()
    }
}

/// Transport control of a playing file.
///
/// Cheap to clone, all clones control the same playback.
#[derive(Clone)]
pub struct PlaybackHandle {
    voice: Arc<Voice>,
}

impl PlaybackHandle {
    pub(crate) fn new(voice: Arc<Voice>) -> Self {
        Self { voice }
    }

    pub fn play(&self) {
        self.voice.play();
    }

    pub fn pause(&self) {
        self.voice.pause();
    }

    /// Stops the playback for good. The handle can't be resumed afterwards.
    pub fn stop(&self) {
        self.voice.stop();
    }

    pub fn state(&self) -> PlaybackState {
        self.voice.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn is_finished(&self) -> bool {
        self.state() == PlaybackState::Finished
    }

    /// Whether both handles control the same playback.
    pub fn same_playback(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.voice, &other.voice)
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("state", &self.state())
            .finish()
    }
}
