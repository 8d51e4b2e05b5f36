use std::{
    collections::VecDeque,
    sync::{
        mpsc::{Receiver, TryRecvError},
        Arc, Mutex,
    },
};

use tracing::{debug, warn};

use crate::decoder::{DecodedAudio, DecodedChunk, StreamLayout};

use super::{OutputFormat, SampleTap};

/// The transport state of a [Voice].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// The audio data isn't available yet.
    Loading,
    Playing,
    Paused,
    /// Everything has been played or the playback has been stopped.
    Finished,
}

/// The playable source of an [AudioGraph](crate::AudioGraph).
///
/// The output device pulls its samples through [Voice::render] while the decoding
/// threads feed the voice from the other side.
pub struct Voice {
    format: OutputFormat,
    state: Mutex<VoiceState>,
    tap: Arc<Mutex<SampleTap>>,
}

impl Voice {
    pub(crate) fn new(format: OutputFormat) -> Arc<Self> {
        // keep one second of audible samples for the analyser
        let tap = SampleTap::new(format.sample_rate as usize);

        Arc::new(Self {
            format,
            state: Mutex::new(VoiceState::new()),
            tap: Arc::new(Mutex::new(tap)),
        })
    }

    /// Hands over a completely decoded file.
    pub(crate) fn set_buffer(&self, audio: DecodedAudio) {
        let mut state = self.state.lock().unwrap();

        state.layout = Some(audio.layout);
        state.frames = VecDeque::from(audio.samples);
        state.incoming = None;
        state.source_done = true;
    }

    /// Lets the voice play the chunks of `incoming` as soon as they arrive.
    pub(crate) fn set_stream(&self, layout: StreamLayout, incoming: Receiver<DecodedChunk>) {
        let mut state = self.state.lock().unwrap();

        state.layout = Some(layout);
        state.frames.clear();
        state.incoming = Some(incoming);
        state.source_done = false;
    }

    /// The source won't deliver anything (anymore).
    pub(crate) fn fail(&self) {
        let mut state = self.state.lock().unwrap();

        state.incoming = None;
        state.source_done = true;
        state.transport = PlaybackState::Finished;
    }

    pub(crate) fn play(&self) {
        let mut state = self.state.lock().unwrap();
        if state.transport != PlaybackState::Finished {
            state.transport = PlaybackState::Playing;
        }
    }

    pub(crate) fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if matches!(
            state.transport,
            PlaybackState::Playing | PlaybackState::Loading
        ) {
            state.transport = PlaybackState::Paused;
        }
    }

    pub(crate) fn stop(&self) {
        let mut state = self.state.lock().unwrap();

        state.frames.clear();
        state.incoming = None;
        state.source_done = true;
        state.transport = PlaybackState::Finished;
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.state.lock().unwrap().transport
    }

    pub(crate) fn format(&self) -> OutputFormat {
        self.format
    }

    pub(crate) fn tap(&self) -> Arc<Mutex<SampleTap>> {
        self.tap.clone()
    }

    /// Fills `out` (interleaved, in the output format) with the next samples.
    ///
    /// Everything written into `out` is also pushed into the tap as mono samples.
    pub fn render(&self, out: &mut [f32]) {
        let channels = usize::from(self.format.channels);
        if channels == 0 {
            out.fill(0.);
            return;
        }

        let mut state = self.state.lock().unwrap();

        let mut mono = std::mem::take(&mut state.mono);
        mono.clear();

        for frame in out.chunks_exact_mut(channels) {
            state.write_frame(frame, self.format.sample_rate);
            mono.push(frame.iter().sum::<f32>() / channels as f32);
        }

        self.tap.lock().unwrap().push(&mono);
        state.mono = mono;
    }
}

struct VoiceState {
    layout: Option<StreamLayout>,

    /// Interleaved samples which haven't been played yet.
    frames: VecDeque<f32>,
    incoming: Option<Receiver<DecodedChunk>>,
    source_done: bool,

    /// Fractional offset (in source frames) into `frames`.
    position: f64,
    transport: PlaybackState,

    mono: Vec<f32>,
}

impl VoiceState {
    fn new() -> Self {
        Self {
            layout: None,
            frames: VecDeque::new(),
            incoming: None,
            source_done: false,
            position: 0.,
            transport: PlaybackState::Loading,
            mono: Vec::new(),
        }
    }

    fn write_frame(&mut self, frame: &mut [f32], output_rate: u32) {
        let layout = match self.layout {
            Some(layout) if self.transport == PlaybackState::Playing => layout,
            _ => {
                frame.fill(0.);
                return;
            }
        };
        let channels = usize::from(layout.channels);
        if channels == 0 {
            warn!("Source without channels, nothing to play");
            self.transport = PlaybackState::Finished;
            frame.fill(0.);
            return;
        }

        let index = self.position as usize;
        self.pull_incoming(index + 2, layout);
        let available = self.frames.len() / channels;

        if available <= index {
            if self.source_done {
                debug!("Voice finished");
                self.transport = PlaybackState::Finished;
            }

            // either finished or the decoder can't keep up
            frame.fill(0.);
            return;
        }

        // the last frame can't be interpolated with its successor
        let frac = if available > index + 1 {
            (self.position - index as f64) as f32
        } else {
            0.
        };

        for (channel, sample) in frame.iter_mut().enumerate() {
            let src_channel = channel % channels;
            let curr = self.frames[index * channels + src_channel];
            let next = if available > index + 1 {
                self.frames[(index + 1) * channels + src_channel]
            } else {
                curr
            };

            *sample = curr + (next - curr) * frac;
        }

        self.position += f64::from(layout.sample_rate) / f64::from(output_rate);

        let consumed = (self.position as usize).min(available);
        if consumed > 0 {
            self.frames.drain(..consumed * channels);
            self.position -= consumed as f64;
        }
    }

    fn pull_incoming(&mut self, wanted_frames: usize, layout: StreamLayout) {
        let channels = usize::from(layout.channels);

        while self.frames.len() / channels < wanted_frames {
            let Some(incoming) = &self.incoming else {
                return;
            };

            match incoming.try_recv() {
                Ok(chunk) if chunk.layout.channels != layout.channels => {
                    warn!(
                        "Dropping chunk with {} channels, expected {}",
                        chunk.layout.channels, layout.channels
                    );
                }
                Ok(chunk) => self.frames.extend(chunk.samples),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.incoming = None;
                    self.source_done = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    const MONO_44K: StreamLayout = StreamLayout {
        sample_rate: 44_100,
        channels: 1,
    };

    fn stereo_output() -> OutputFormat {
        OutputFormat {
            sample_rate: 44_100,
            channels: 2,
        }
    }

    fn buffered(samples: Vec<f32>, layout: StreamLayout, format: OutputFormat) -> Arc<Voice> {
        let voice = Voice::new(format);
        voice.set_buffer(DecodedAudio { layout, samples });
        voice
    }

    #[test]
    fn silent_while_loading() {
        let voice = Voice::new(stereo_output());

        let mut out = [1.; 8];
        voice.render(&mut out);

        assert_eq!(out, [0.; 8]);
        assert_eq!(voice.state(), PlaybackState::Loading);
    }

    #[test]
    fn mono_source_is_duplicated_on_all_channels() {
        let voice = buffered(vec![0.1, 0.2, 0.3], MONO_44K, stereo_output());
        voice.play();

        let mut out = [0.; 6];
        voice.render(&mut out);

        assert_eq!(out, [0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn finishes_after_the_last_frame() {
        let voice = buffered(vec![0.5, 0.5], MONO_44K, stereo_output());
        voice.play();

        let mut out = [0.; 8];
        voice.render(&mut out);

        assert_eq!(&out[4..], &[0.; 4]);
        assert_eq!(voice.state(), PlaybackState::Finished);
    }

    #[test]
    fn paused_voice_outputs_silence_and_keeps_its_position() {
        let voice = buffered(vec![0.1, 0.2, 0.3], MONO_44K, stereo_output());
        voice.play();

        let mut out = [0.; 2];
        voice.render(&mut out);
        assert_eq!(out, [0.1, 0.1]);

        voice.pause();
        voice.render(&mut out);
        assert_eq!(out, [0.; 2]);

        voice.play();
        voice.render(&mut out);
        assert_eq!(out, [0.2, 0.2]);
    }

    #[test]
    fn upsampling_interpolates() {
        let layout = StreamLayout {
            sample_rate: 22_050,
            channels: 1,
        };
        let format = OutputFormat {
            sample_rate: 44_100,
            channels: 1,
        };
        let voice = buffered(vec![0., 1., 0.], layout, format);
        voice.play();

        let mut out = [0.; 4];
        voice.render(&mut out);

        assert_eq!(out, [0., 0.5, 1., 0.5]);
    }

    #[test]
    fn tap_receives_mono_mix() {
        let layout = StreamLayout {
            sample_rate: 44_100,
            channels: 2,
        };
        let voice = buffered(vec![1., 0., 0.5, 0.5], layout, stereo_output());
        voice.play();

        let mut out = [0.; 4];
        voice.render(&mut out);

        let mut latest = [0.; 2];
        voice.tap().lock().unwrap().copy_latest(&mut latest);
        assert_eq!(latest, [0.5, 0.5]);
    }

    #[test]
    fn stream_underrun_is_silent_but_not_finished() {
        let (tx, rx) = mpsc::sync_channel(4);
        let voice = Voice::new(stereo_output());
        voice.set_stream(MONO_44K, rx);
        voice.play();

        tx.send(DecodedChunk {
            layout: MONO_44K,
            samples: vec![0.25],
        })
        .unwrap();

        let mut out = [0.; 4];
        voice.render(&mut out);
        assert_eq!(out, [0.25, 0.25, 0., 0.]);
        assert_eq!(voice.state(), PlaybackState::Playing);

        drop(tx);
        voice.render(&mut out);
        assert_eq!(voice.state(), PlaybackState::Finished);
    }

    #[test]
    fn zero_channels_are_silent() {
        let no_output_channels = OutputFormat {
            sample_rate: 44_100,
            channels: 0,
        };
        let voice = buffered(vec![0.5; 4], MONO_44K, no_output_channels);
        voice.play();

        let mut out = [1.; 3];
        voice.render(&mut out);
        assert_eq!(out, [0.; 3]);

        let no_source_channels = StreamLayout {
            sample_rate: 44_100,
            channels: 0,
        };
        let voice = buffered(vec![0.5; 4], no_source_channels, stereo_output());
        voice.play();

        let mut out = [1.; 4];
        voice.render(&mut out);
        assert_eq!(out, [0.; 4]);
        assert_eq!(voice.state(), PlaybackState::Finished);
    }

    #[test]
    fn stop_drops_everything() {
        let voice = buffered(vec![0.5; 16], MONO_44K, stereo_output());
        voice.play();
        voice.stop();

        let mut out = [1.; 4];
        voice.render(&mut out);

        assert_eq!(out, [0.; 4]);
        assert_eq!(voice.state(), PlaybackState::Finished);

        voice.play();
        assert_eq!(voice.state(), PlaybackState::Finished);
    }
}
