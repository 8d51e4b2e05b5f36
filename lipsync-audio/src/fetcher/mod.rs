//! Each struct here can be used to feed the [Analyser](crate::Analyser) with samples.
mod dummy;

use cpal::SampleRate;
pub use dummy::DummyFetcher;

pub use crate::graph::TapFetcher;

/// Interface for all structs (fetchers) which provide the latest audible samples.
pub trait Fetcher {
    /// **Replaces** the content of `buf` with the newest mono samples of the fetcher.
    ///
    /// The oldest sample lands at index `0`. If there are less samples than `buf.len()`,
    /// the front of `buf` is filled with silence.
    fn fetch_samples(&mut self, buf: &mut [f32]);

    fn sample_rate(&self) -> SampleRate;
}
