use std::{ops::Range, path::Path};

use tracing::{debug, instrument};

use crate::{
    analyser::FrequencyAnalyser,
    easing,
    graph::OutputDevice,
    selector::{Publisher, SourceSelector},
    Error, HandlerConfig,
};

/// Interface for everything which can load an audio file and attach an analyser to it.
pub trait AudioLoader {
    /// Starts playing the file at `path` and returns the analyser which listens to it.
    fn load(&mut self, path: &Path) -> Result<Box<dyn FrequencyAnalyser>, Error>;
}

/// Plays an audio file and computes the eased average frequency of it once per frame.
///
/// # Example
/// ```no_run
/// use lipsync_audio::{AudioFileHandler, CpalOutput, HandlerConfig};
///
/// let output = CpalOutput::default_device().unwrap();
/// let mut handler =
///     AudioFileHandler::from_config(Box::new(output), None, HandlerConfig::default()).unwrap();
///
/// handler.start("voice.ogg").unwrap();
///
/// loop {
///     // once per animation frame
///     handler.update();
///
///     let mouth_open = handler.normalized_average_frequency();
///     # break;
/// }
/// ```
pub struct AudioFileHandler<L = SourceSelector> {
    loader: L,
    analyser: Option<Box<dyn FrequencyAnalyser>>,
    last_normalized_average_frequency: f32,
    normalize_range: Range<f32>,
}

impl AudioFileHandler<SourceSelector> {
    /// Creates a handler which plays its files on `output`.
    ///
    /// The handle of every started playback is given to `publisher`.
    #[instrument(name = "AudioFileHandler::from_config", skip(output, publisher))]
    pub fn from_config(
        output: Box<dyn OutputDevice>,
        publisher: Option<Publisher>,
        config: HandlerConfig,
    ) -> Result<Self, Error> {
        config.validate()?;

        let mut selector =
            SourceSelector::new(output, config.playback).with_analyser_config(config.analyser);
        if let Some(publisher) = publisher {
            selector = selector.with_publisher(publisher);
        }

        Ok(Self::new(selector).with_normalize_range(config.normalize_range))
    }
}

impl<L: AudioLoader> AudioFileHandler<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            analyser: None,
            last_normalized_average_frequency: 0.,
            normalize_range: HandlerConfig::default().normalize_range,
        }
    }

    /// Sets the range of the average frequency which is mapped onto `[0, 1]`.
    pub fn with_normalize_range(mut self, range: Range<f32>) -> Self {
        self.normalize_range = range;
        self
    }

    /// Forgets the current analyser and loads the given file.
    pub fn start<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        self.analyser = None;
        self.last_normalized_average_frequency = 0.;

        self.load_audio_file(path)
    }

    /// Starts playing the given file and attaches a new analyser to it.
    ///
    /// An empty path is ignored. If loading fails, the previous analyser stays attached.
    pub fn load_audio_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(());
        }

        debug!("Loading {}", path.display());
        self.analyser = Some(self.loader.load(path)?);

        Ok(())
    }

    /// Computes the next value of [AudioFileHandler::normalized_average_frequency].
    ///
    /// Has to be called once per frame. Returns `false` (and doesn't change anything)
    /// if there's no analyser attached.
    pub fn update(&mut self) -> bool {
        let Some(analyser) = self.analyser.as_mut() else {
            return false;
        };

        let average_frequency = analyser.average_frequency();
        self.last_normalized_average_frequency =
            easing::ease_normalized(average_frequency, &self.normalize_range);

        true
    }

    /// Returns the value computed by the last [AudioFileHandler::update] call.
    pub fn normalized_average_frequency(&self) -> f32 {
        self.last_normalized_average_frequency
    }

    pub fn has_analyser(&self) -> bool {
        self.analyser.is_some()
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    struct ConstantAnalyser(f32);

    impl FrequencyAnalyser for ConstantAnalyser {
        fn average_frequency(&mut self) -> f32 {
            self.0
        }
    }

    #[derive(Default)]
    struct MockLoader {
        value: f32,
        fail: bool,
        loaded: Vec<PathBuf>,
    }

    impl AudioLoader for MockLoader {
        fn load(&mut self, path: &Path) -> Result<Box<dyn FrequencyAnalyser>, Error> {
            if self.fail {
                return Err(Error::NoAudioTrack);
            }

            self.loaded.push(path.to_path_buf());
            Ok(Box::new(ConstantAnalyser(self.value)))
        }
    }

    fn handler(value: f32) -> AudioFileHandler<MockLoader> {
        AudioFileHandler::new(MockLoader {
            value,
            ..Default::default()
        })
    }

    #[test]
    fn zero_after_construction() {
        let handler = handler(50.);

        assert_eq!(handler.normalized_average_frequency(), 0.);
        assert!(!handler.has_analyser());
    }

    #[test]
    fn update_without_analyser() {
        let mut handler = handler(50.);

        assert!(!handler.update());
        assert_eq!(handler.normalized_average_frequency(), 0.);
    }

    #[test]
    fn empty_path_is_ignored() {
        let mut handler = handler(50.);

        assert!(handler.load_audio_file("").is_ok());
        assert!(!handler.has_analyser());
        assert!(handler.loader().loaded.is_empty());
    }

    #[test]
    fn empty_path_keeps_the_current_analyser() {
        let mut handler = handler(100.);
        handler.load_audio_file("first.ogg").unwrap();

        assert!(handler.load_audio_file("").is_ok());
        assert!(handler.has_analyser());
        assert_eq!(handler.loader().loaded, [PathBuf::from("first.ogg")]);

        assert!(handler.update());
        assert_eq!(handler.normalized_average_frequency(), 1.);
    }

    #[test]
    fn update_eases_the_average_frequency() {
        let mut handler = handler(50.);
        handler.load_audio_file("voice.ogg").unwrap();

        assert!(handler.update());
        assert_eq!(handler.normalized_average_frequency(), 0.03125);
    }

    #[test]
    fn start_resets() {
        let mut handler = handler(100.);
        handler.start("first.ogg").unwrap();
        handler.update();
        assert_eq!(handler.normalized_average_frequency(), 1.);

        handler.start("").unwrap();
        assert_eq!(handler.normalized_average_frequency(), 0.);
        assert!(!handler.has_analyser());
        assert!(!handler.update());
    }

    #[test]
    fn zero_after_start_before_update() {
        let mut handler = handler(100.);
        handler.start("voice.ogg").unwrap();

        assert!(handler.has_analyser());
        assert_eq!(handler.normalized_average_frequency(), 0.);
    }

    #[test]
    fn failed_load_keeps_previous_analyser() {
        let mut handler = handler(100.);
        handler.load_audio_file("first.ogg").unwrap();

        handler.loader.fail = true;
        assert!(handler.load_audio_file("second.ogg").is_err());

        assert!(handler.has_analyser());
        assert!(handler.update());
        assert_eq!(handler.normalized_average_frequency(), 1.);
    }

    #[test]
    fn failed_start_leaves_no_analyser() {
        let mut handler = handler(100.);
        handler.load_audio_file("first.ogg").unwrap();

        handler.loader.fail = true;
        assert!(handler.start("second.ogg").is_err());

        assert!(!handler.has_analyser());
        assert_eq!(handler.normalized_average_frequency(), 0.);
    }

    #[test]
    fn custom_normalize_range() {
        let mut handler = handler(255.).with_normalize_range(0.0..255.0);
        handler.load_audio_file("voice.ogg").unwrap();
        handler.update();

        assert_eq!(handler.normalized_average_frequency(), 1.);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = AudioFileHandler::from_config(
            Box::new(crate::NullOutput::default()),
            None,
            HandlerConfig {
                normalize_range: 1.0..0.0,
                ..Default::default()
            },
        );

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
