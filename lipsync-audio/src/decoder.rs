//! Decodes audio files into interleaved `f32` samples with symphonia.
use std::{fs::File, io::ErrorKind, path::Path};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, instrument, warn};

use crate::Error;

/// Sample rate and channel count of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLayout {
    pub sample_rate: u32,
    pub channels: u16,
}

/// A batch of interleaved samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChunk {
    pub layout: StreamLayout,
    pub samples: Vec<f32>,
}

/// A completely decoded file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub layout: StreamLayout,
    pub samples: Vec<f32>,
}

impl DecodedAudio {
    /// Returns `0` if the layout has no channels.
    pub fn frames(&self) -> usize {
        self.samples
            .len()
            .checked_div(usize::from(self.layout.channels))
            .unwrap_or(0)
    }
}

/// Decodes the first audio track of a file packet by packet.
pub struct StreamDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    layout: Option<StreamLayout>,
}

impl StreamDecoder {
    /// Opens the file and prepares the decoder of its first audio track.
    ///
    /// Everything which can be checked without decoding (the file exists, the container
    /// is known, there's a supported codec) is checked here.
    #[instrument(name = "StreamDecoder::open", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(Error::NoAudioTrack)?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let layout = params
            .sample_rate
            .zip(params.channels)
            .map(|(sample_rate, channels)| StreamLayout {
                sample_rate,
                channels: channels.count() as u16,
            })
            .filter(|layout| layout.sample_rate > 0 && layout.channels > 0);
        debug!("Declared layout: {:?}", layout);

        let decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

        Ok(Self {
            format,
            decoder,
            track_id,
            layout,
        })
    }

    /// Returns the layout if the container declared it or if a chunk has been decoded already.
    pub fn layout(&self) -> Option<StreamLayout> {
        self.layout
    }

    /// Decodes the next packet of the track.
    ///
    /// Returns `None` if the end of the stream has been reached.
    pub fn next_chunk(&mut self) -> Result<Option<DecodedChunk>, Error> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => {
                    return Ok(None)
                }
                // the track list changed (chained streams), we only follow the first one
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(err) => return Err(err.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(err)) => {
                    warn!("Skipping corrupt packet: {}", err);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let spec = *decoded.spec();
            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            if sample_buf.samples().is_empty() {
                continue;
            }

            let layout = StreamLayout {
                sample_rate: spec.rate,
                channels: spec.channels.count() as u16,
            };
            self.layout = Some(layout);

            return Ok(Some(DecodedChunk {
                layout,
                samples: sample_buf.samples().to_vec(),
            }));
        }
    }

    /// Decodes the rest of the track into one buffer.
    pub fn decode_all(mut self) -> Result<DecodedAudio, Error> {
        let mut samples = Vec::new();

        while let Some(chunk) = self.next_chunk()? {
            samples.extend_from_slice(&chunk.samples);
        }

        let layout = self.layout.ok_or(Error::UnknownStreamLayout)?;
        debug!("Decoded {} samples with layout {:?}", samples.len(), layout);

        Ok(DecodedAudio { layout, samples })
    }
}
