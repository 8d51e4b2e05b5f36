use std::{any::Any, sync::Arc};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SupportedStreamConfigRange,
};
use tracing::{debug, error, instrument};

use crate::{Error, DEFAULT_SAMPLE_RATE};

use super::Voice;

/// The sample rate and channel count in which an [OutputDevice] consumes samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE.0,
            channels: 2,
        }
    }
}

/// Keeps the connection between a [Voice] and an [OutputDevice] alive.
///
/// The output stops pulling from the voice as soon as this gets dropped.
pub struct OutputConnection {
    _inner: Option<Box<dyn Any>>,
}

impl OutputConnection {
    /// A connection which doesn't hold anything.
    pub fn detached() -> Self {
        Self { _inner: None }
    }

    pub fn new<T: 'static>(inner: T) -> Self {
        Self {
            _inner: Some(Box::new(inner)),
        }
    }
}

/// Interface for everything which can play a [Voice].
pub trait OutputDevice {
    fn format(&self) -> OutputFormat;

    /// Whether the samples of a voice which is still decoding can be analysed while they are played.
    fn supports_streaming_tap(&self) -> bool {
        true
    }

    /// Starts pulling samples from `voice`.
    fn connect(&self, voice: Arc<Voice>) -> Result<OutputConnection, Error>;
}

/// An output which never pulls any samples.
///
/// Useful if there's no audio device (tests, headless runs). The voices can still be
/// rendered manually with [Voice::render].
#[derive(Debug, Clone, Copy)]
pub struct NullOutput {
    format: OutputFormat,
    streaming_tap: bool,
}

impl NullOutput {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            streaming_tap: true,
        }
    }

    /// Pretend that streamed voices can't be analysed.
    pub fn without_streaming_tap(mut self) -> Self {
        self.streaming_tap = false;
        self
    }
}

impl Default for NullOutput {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

impl OutputDevice for NullOutput {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn supports_streaming_tap(&self) -> bool {
        self.streaming_tap
    }

    fn connect(&self, _voice: Arc<Voice>) -> Result<OutputConnection, Error> {
        Ok(OutputConnection::detached())
    }
}

/// Plays voices on an output device of [cpal].
pub struct CpalOutput {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

impl CpalOutput {
    /// This exposes the API of [cpal] which you can use to use your own [cpal::Device] and [cpal::SupportedStreamConfigRange]
    /// if you want.
    #[instrument(name = "CpalOutput::new", skip_all)]
    pub fn new(device: cpal::Device, stream_config_range: &SupportedStreamConfigRange) -> Self {
        let config = stream_config_range
            .clone()
            .try_with_sample_rate(DEFAULT_SAMPLE_RATE)
            .unwrap_or_else(|| stream_config_range.clone().with_max_sample_rate())
            .config();

        debug!("Stream config: {:?}", config);

        Self { device, config }
    }

    /// Uses the default output device of the default host.
    ///
    /// This is the recommended function to create an instance of this struct.
    pub fn default_device() -> Result<Self, Error> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(Error::NoOutputDevice)?;

        let range = default_output_config(&device)?;

        Ok(Self::new(device, &range))
    }
}

impl OutputDevice for CpalOutput {
    fn format(&self) -> OutputFormat {
        OutputFormat {
            sample_rate: self.config.sample_rate.0,
            channels: self.config.channels,
        }
    }

    fn connect(&self, voice: Arc<Voice>) -> Result<OutputConnection, Error> {
        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| voice.render(data),
            |err| error!("Output stream error: {}", err),
            None,
        )?;
        stream.play()?;

        Ok(OutputConnection::new(CpalConnection(stream)))
    }
}

struct CpalConnection(cpal::Stream);

impl Drop for CpalConnection {
    /// Pauses the stream before it gets dropped.
    fn drop(&mut self) {
        if let Err(err) = self.0.pause() {
            debug!("Couldn't pause output stream: {}", err);
        }
    }
}

#[instrument(skip_all)]
fn default_output_config(device: &cpal::Device) -> Result<SupportedStreamConfigRange, Error> {
    let configs: Vec<_> = device.supported_output_configs()?.collect();
    preferred_config(&configs).ok_or(Error::NoOutputConfig)
}

/// Picks the f32 config which cpal ranks highest.
fn preferred_config(configs: &[SupportedStreamConfigRange]) -> Option<SupportedStreamConfigRange> {
    configs
        .iter()
        .filter(|config| config.sample_format() == SampleFormat::F32)
        .max_by(|a, b| a.cmp_default_heuristics(b))
        .cloned()
}

#[cfg(test)]
mod tests {
    use cpal::{SampleRate, SupportedBufferSize};

    use super::*;

    fn range(channels: u16, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(8_000),
            SampleRate(96_000),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn prefers_stereo() {
        let configs = [
            range(6, SampleFormat::F32),
            range(1, SampleFormat::F32),
            range(2, SampleFormat::F32),
            range(2, SampleFormat::I16),
        ];

        let config = preferred_config(&configs).unwrap();
        assert_eq!(config.channels(), 2);
        assert_eq!(config.sample_format(), SampleFormat::F32);
    }

    #[test]
    fn mono_before_surround() {
        let configs = [range(6, SampleFormat::F32), range(1, SampleFormat::F32)];

        assert_eq!(preferred_config(&configs).unwrap().channels(), 1);
    }

    #[test]
    fn only_f32() {
        let configs = [range(2, SampleFormat::I16), range(2, SampleFormat::U16)];

        assert!(preferred_config(&configs).is_none());
    }

    #[test]
    fn null_output_has_the_given_format() {
        let format = OutputFormat {
            sample_rate: 48_000,
            channels: 1,
        };
        let output = NullOutput::new(format);

        assert_eq!(output.format(), format);
        assert!(output.supports_streaming_tap());
        assert!(!output.without_streaming_tap().supports_streaming_tap());
    }
}
