use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use lipsync_audio::PlaybackMode;
use ratatui::style::Color;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Path to the audio file which should be played.
    pub audio_path: PathBuf,

    /// How the audio file should be played.
    ///
    /// `buffered` decodes the whole file before playing it, `streaming` plays it while decoding
    /// and `auto` streams whenever the file and the output allow it.
    #[arg(short, long, value_enum, default_value_t = Mode::Auto)]
    pub mode: Mode,

    /// Pick the playback mode a browser with this user agent would need. Overrides `--mode`.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// How often the mouth should be updated per second.
    #[arg(long, default_value_t = 60)]
    pub fps: u16,

    /// `auto` to follow the terminal size or `WIDTHxHEIGHT` for a fixed canvas.
    #[arg(long, default_value_t = CanvasSize::Auto)]
    pub canvas_size: CanvasSize,

    /// Don't open an audio device. The mouth will stay closed.
    #[arg(long)]
    pub mute: bool,

    /// The mouth color. For a full list of possible colors: https://docs.rs/ratatui/latest/ratatui/style/enum.Color.html
    #[arg(short, long, default_value_t = Color::LightRed)]
    pub color: Color,

    /// Where the logs should be written to.
    #[arg(long, default_value = "/tmp/lipsync.log")]
    pub log_file: PathBuf,
}

impl Args {
    pub fn playback_mode(&self) -> PlaybackMode {
        match &self.user_agent {
            Some(user_agent) => PlaybackMode::from_user_agent(user_agent),
            None => self.mode.into(),
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Buffered,
    Streaming,
}

impl From<Mode> for PlaybackMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => PlaybackMode::Auto,
            Mode::Buffered => PlaybackMode::Buffered,
            Mode::Streaming => PlaybackMode::Streaming,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasSize {
    Auto,
    Fixed { width: u16, height: u16 },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Expected `auto` or `WIDTHxHEIGHT` (for example `40x12`) but got \"{0}\"")]
pub struct InvalidCanvasSize(String);

impl FromStr for CanvasSize {
    type Err = InvalidCanvasSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }

        let invalid = || InvalidCanvasSize(s.to_string());
        let (width, height) = s.split_once('x').ok_or_else(invalid)?;
        let width: u16 = width.trim().parse().map_err(|_| invalid())?;
        let height: u16 = height.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self::Fixed { width, height })
    }
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
