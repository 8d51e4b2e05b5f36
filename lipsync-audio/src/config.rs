//! Module to configure the behaviour of [AudioFileHandler].
//!
//! [AudioFileHandler]: crate::AudioFileHandler
use std::ops::Range;

use crate::{analyser::AnalyserConfig, selector::PlaybackMode};

/// All validation errors which can occur while checking a config.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Occurs, if [`HandlerConfig::normalize_range`] is empty.
    ///
    /// # Example
    /// ```rust
    /// use lipsync_audio::HandlerConfig;
    ///
    /// let config = HandlerConfig {
    ///     normalize_range: 50.0..50.0,
    ///     ..Default::default()
    /// };
    ///
    /// // the range isn't allowed to be empty!
    /// assert!(config.validate().is_err());
    /// ```
    #[error("Normalize range can't be empty but you gave: {0:?}")]
    EmptyNormalizeRange(Range<f32>),

    #[error("The fft size must be a power of two within [32, 32768] but it's {0}")]
    InvalidFftSize(usize),

    #[error("The smoothing time constant must be within [0, 1] but it's {0}")]
    InvalidSmoothing(f32),

    #[error("`min_decibels` ({min}) must be lower than `max_decibels` ({max})")]
    InvalidDecibelRange { min: f64, max: f64 },
}

/// Configure the behaviour of [AudioFileHandler] by setting the appropriate values in this struct.
///
/// # Example
/// ```rust
/// use lipsync_audio::{HandlerConfig, PlaybackMode};
///
/// let config = HandlerConfig {
///     playback: PlaybackMode::from_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"),
///     ..Default::default()
/// };
///
/// assert_eq!(config.playback, PlaybackMode::Buffered);
/// assert!(config.validate().is_ok());
/// ```
///
/// [AudioFileHandler]: crate::AudioFileHandler
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerConfig {
    /// Decide how the audio file should be played (and therefore analysed).
    pub playback: PlaybackMode,

    /// The config of the analyser which is attached to each loaded file.
    pub analyser: AnalyserConfig,

    /// The range of the average frequency which is mapped onto `[0, 1]` before easing.
    ///
    /// Values outside of this range are *not* clamped.
    pub normalize_range: Range<f32>,
}

impl HandlerConfig {
    /// Checks if the current config is valid or contains any mistakes.
    ///
    /// See [`ConfigError`] to see all possible errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.normalize_range.is_empty() {
            return Err(ConfigError::EmptyNormalizeRange(self.normalize_range.clone()));
        }

        self.analyser.validate()
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackMode::default(),
            analyser: AnalyserConfig::default(),
            normalize_range: 0.0..100.0,
        }
    }
}
