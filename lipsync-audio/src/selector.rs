//! Picks how an audio file gets played and builds its [AudioGraph].
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread,
};

use tracing::{debug, error, instrument};

use crate::{
    analyser::{Analyser, AnalyserConfig, FrequencyAnalyser},
    decoder::{DecodedChunk, StreamDecoder, StreamLayout},
    graph::{AudioGraph, GraphKind, OutputDevice, PlaybackHandle, Voice},
    handler::AudioLoader,
    Error,
};

/// The amount of decoded chunks which the streaming decoder may run ahead of the output.
const STREAM_QUEUE_CHUNKS: usize = 32;

/// User agent fragments of platforms which can't analyse streamed media.
const BUFFER_ONLY_PLATFORMS: [&str; 3] = ["iPad", "iPhone", "iPod"];

/// Decides how an audio file should be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackMode {
    /// Stream the file if the output can be analysed while streaming and the file declares
    /// its layout up front. Decode it completely otherwise.
    #[default]
    Auto,

    /// Always decode the complete file before playing it.
    Buffered,

    /// Always play the file while it's decoded.
    Streaming,
}

impl PlaybackMode {
    /// Picks the mode a browser with the given user agent would need.
    ///
    /// # Example
    /// ```
    /// use lipsync_audio::PlaybackMode;
    ///
    /// let ipad = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
    /// let linux = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
    ///
    /// assert_eq!(PlaybackMode::from_user_agent(ipad), PlaybackMode::Buffered);
    /// assert_eq!(PlaybackMode::from_user_agent(linux), PlaybackMode::Streaming);
    /// ```
    pub fn from_user_agent(user_agent: &str) -> Self {
        if BUFFER_ONLY_PLATFORMS
            .iter()
            .any(|platform| user_agent.contains(platform))
        {
            Self::Buffered
        } else {
            Self::Streaming
        }
    }
}

/// Receives the handle of every playback once it has started.
pub type Publisher = Arc<dyn Fn(PlaybackHandle) + Send + Sync>;

/// A host owned slot which always contains the playback that started last.
///
/// # Example
/// ```
/// use lipsync_audio::{CurrentAudio, NullOutput, PlaybackMode, SourceSelector};
///
/// let current = CurrentAudio::default();
/// let selector = SourceSelector::new(Box::new(NullOutput::default()), PlaybackMode::Auto)
///     .with_publisher(current.publisher());
///
/// // nothing has been loaded yet
/// assert!(current.get().is_none());
/// ```
#[derive(Clone, Default)]
pub struct CurrentAudio {
    slot: Arc<Mutex<Option<PlaybackHandle>>>,
}

impl CurrentAudio {
    /// Returns a publisher which overwrites this slot.
    pub fn publisher(&self) -> Publisher {
        let slot = self.slot.clone();
        Arc::new(move |handle| {
            *slot.lock().unwrap() = Some(handle);
        })
    }

    pub fn get(&self) -> Option<PlaybackHandle> {
        self.slot.lock().unwrap().clone()
    }
}

impl fmt::Debug for CurrentAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CurrentAudio").field(&self.get()).finish()
    }
}

/// Loads audio files, starts their playback and attaches an [Analyser] to them.
pub struct SourceSelector {
    mode: PlaybackMode,
    analyser_config: AnalyserConfig,
    output: Box<dyn OutputDevice>,
    publisher: Option<Publisher>,
}

impl SourceSelector {
    pub fn new(output: Box<dyn OutputDevice>, mode: PlaybackMode) -> Self {
        Self {
            mode,
            analyser_config: AnalyserConfig::default(),
            output,
            publisher: None,
        }
    }

    /// Every started playback is handed to `publisher`.
    pub fn with_publisher(mut self, publisher: Publisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_analyser_config(mut self, config: AnalyserConfig) -> Self {
        self.analyser_config = config;
        self
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Starts playing the file at `path`.
    ///
    /// Errors which can be detected right away (missing file, unknown format, ...) are returned.
    /// A buffered graph decodes in the background: decoding errors are only logged there and the
    /// graph stays silent.
    #[instrument(name = "SourceSelector::open_graph", skip(self))]
    pub fn open_graph(&self, path: &Path) -> Result<AudioGraph, Error> {
        match self.mode {
            PlaybackMode::Buffered => self.open_buffered(path),
            PlaybackMode::Streaming => {
                let decoder = StreamDecoder::open(path)?;
                self.open_streaming(decoder)
            }
            PlaybackMode::Auto => {
                if !self.output.supports_streaming_tap() {
                    debug!("Output can't analyse streamed audio, decoding completely");
                    return self.open_buffered(path);
                }

                let decoder = StreamDecoder::open(path)?;
                if decoder.layout().is_none() {
                    debug!("Stream doesn't declare its layout, decoding completely");
                    return self.open_buffered(path);
                }

                self.open_streaming(decoder)
            }
        }
    }

    fn open_streaming(&self, mut decoder: StreamDecoder) -> Result<AudioGraph, Error> {
        let (tx, rx) = mpsc::sync_channel::<DecodedChunk>(STREAM_QUEUE_CHUNKS);

        let layout = match decoder.layout() {
            Some(layout) => layout,
            None => {
                // the first chunk tells us the layout
                let chunk = decoder.next_chunk()?.ok_or(Error::UnknownStreamLayout)?;
                let layout = chunk.layout;
                // can't block: the channel is still empty
                let _ = tx.try_send(chunk);
                layout
            }
        };
        debug!("Streaming with layout {:?}", layout);

        let voice = Voice::new(self.output.format());
        voice.set_stream(layout, rx);
        let connection = self.output.connect(voice.clone())?;

        thread::Builder::new()
            .name("lipsync-stream-decoder".to_string())
            .spawn(move || stream_chunks(decoder, layout, tx))?;

        voice.play();
        publish(&self.publisher, PlaybackHandle::new(voice.clone()));

        Ok(AudioGraph::new(GraphKind::Streaming, voice, connection))
    }

    fn open_buffered(&self, path: &Path) -> Result<AudioGraph, Error> {
        let voice = Voice::new(self.output.format());
        let connection = self.output.connect(voice.clone())?;

        thread::Builder::new()
            .name("lipsync-buffer-decoder".to_string())
            .spawn({
                let path = path.to_path_buf();
                let voice = voice.clone();
                let publisher = self.publisher.clone();
                move || decode_into(path, voice, publisher)
            })?;

        Ok(AudioGraph::new(GraphKind::Buffered, voice, connection))
    }
}

impl AudioLoader for SourceSelector {
    fn load(&mut self, path: &Path) -> Result<Box<dyn FrequencyAnalyser>, Error> {
        let graph = self.open_graph(path)?;
        let analyser = Analyser::new(Box::new(graph.fetcher()), self.analyser_config.clone())?;

        Ok(Box::new(AnalyserHandle {
            analyser,
            _graph: graph,
        }))
    }
}

/// An [Analyser] together with the graph it listens to.
///
/// The graph (and with it the output connection) lives as long as the handle.
pub struct AnalyserHandle {
    analyser: Analyser,
    _graph: AudioGraph,
}

impl FrequencyAnalyser for AnalyserHandle {
    fn average_frequency(&mut self) -> f32 {
        self.analyser.average_frequency()
    }
}

fn publish(publisher: &Option<Publisher>, handle: PlaybackHandle) {
    if let Some(publisher) = publisher {
        publisher(handle);
    }
}

fn stream_chunks(
    mut decoder: StreamDecoder,
    layout: StreamLayout,
    tx: mpsc::SyncSender<DecodedChunk>,
) {
    loop {
        match decoder.next_chunk() {
            Ok(Some(chunk)) => {
                if chunk.layout != layout {
                    debug!("Layout changed to {:?}", chunk.layout);
                }

                // the voice has been dropped
                if tx.send(chunk).is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(err) => {
                error!("Couldn't decode the rest of the stream: {}", err);
                return;
            }
        }
    }
}

fn decode_into(path: PathBuf, voice: Arc<Voice>, publisher: Option<Publisher>) {
    match StreamDecoder::open(&path).and_then(StreamDecoder::decode_all) {
        Ok(audio) => {
            debug!("Decoded {} frames of {}", audio.frames(), path.display());
            voice.set_buffer(audio);
            voice.play();
            publish(&publisher, PlaybackHandle::new(voice));
        }
        Err(err) => {
            error!("Couldn't decode {}: {}", path.display(), err);
            voice.fail();
        }
    }
}
