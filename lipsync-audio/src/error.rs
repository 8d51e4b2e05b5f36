use crate::config::ConfigError;

/// Everything which can go wrong while loading or playing an audio file.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The container or codec couldn't be handled by symphonia.
    #[error("Couldn't decode audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("The file doesn't contain any decodable audio track")]
    NoAudioTrack,

    /// The stream doesn't tell its sample rate and channel count before decoding.
    #[error("The sample rate or channel layout of the audio stream is unknown")]
    UnknownStreamLayout,

    #[error("Couldn't retrieve the default output device")]
    NoOutputDevice,

    #[error("Couldn't find any f32 output config of the output device")]
    NoOutputConfig,

    #[error(transparent)]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error(transparent)]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}
