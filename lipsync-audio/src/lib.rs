//! # Description
//! A crate which plays an audio file and turns what's audible into a single value per frame
//! which can drive the mouth of an animated character.
//!
//! The value is the average frequency of the played audio (as computed by an `AnalyserNode`
//! of the Web Audio API), mapped onto `[0, 1]` and eased with a quintic curve so that quiet
//! background noise barely moves the mouth while loud parts open it completely.
//!
//! ### [cpal]
//!
//! This crate also re-exports [cpal] so there's no need to add [cpal] exclusively
//! to your dependency list.
//!
//! # Example
//!
//! ## Simple workflow
//! ```no_run
//! use lipsync_audio::{AudioFileHandler, CpalOutput, CurrentAudio, HandlerConfig};
//!
//! // the host owns the currently playing audio, e.g. to pause it later
//! let current_audio = CurrentAudio::default();
//!
//! let mut handler = AudioFileHandler::from_config(
//!     Box::new(CpalOutput::default_device().unwrap()),
//!     Some(current_audio.publisher()),
//!     HandlerConfig::default(),
//! )
//! .unwrap();
//!
//! handler.start("voice.ogg").unwrap();
//!
//! loop {
//!     // once per animation frame
//!     handler.update();
//!     let mouth_open = handler.normalized_average_frequency();
//!
//!     if let Some(playback) = current_audio.get() {
//!         if playback.is_finished() {
//!             break;
//!         }
//!     }
//! }
//! ```
//!
//! ## Without audio device
//! [NullOutput] never pulls any samples which makes it handy for tests.
//! ```
//! use lipsync_audio::{AudioFileHandler, HandlerConfig, NullOutput};
//!
//! let mut handler = AudioFileHandler::from_config(
//!     Box::new(NullOutput::default()),
//!     None,
//!     HandlerConfig::default(),
//! )
//! .unwrap();
//!
//! // nothing loaded yet
//! assert!(!handler.update());
//! assert_eq!(handler.normalized_average_frequency(), 0.);
//! ```
pub mod decoder;
pub mod easing;
pub mod fetcher;

mod analyser;
mod config;
mod error;
mod graph;
mod handler;
mod selector;

pub use analyser::{Analyser, AnalyserConfig, FrequencyAnalyser};
pub use config::{ConfigError, HandlerConfig};
pub use cpal;
pub use error::Error;
pub use graph::{
    AudioGraph, CpalOutput, GraphKind, NullOutput, OutputConnection, OutputDevice, OutputFormat,
    PlaybackHandle, PlaybackState, Voice,
};
pub use handler::{AudioFileHandler, AudioLoader};
pub use selector::{AnalyserHandle, CurrentAudio, PlaybackMode, Publisher, SourceSelector};

use cpal::SampleRate;

/// The default sample rate for an output.
/// Outputs are allowed to use this for orientation.
pub const DEFAULT_SAMPLE_RATE: SampleRate = SampleRate(44_100);
