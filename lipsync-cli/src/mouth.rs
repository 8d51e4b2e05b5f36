use std::{collections::VecDeque, io, time::Duration};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use lipsync_audio::{
    AudioFileHandler, CpalOutput, CurrentAudio, HandlerConfig, NullOutput, OutputDevice,
    PlaybackState,
};
use ratatui::{
    layout::{Constraint, Layout, Rect, Size},
    style::Style,
    text::Line,
    widgets::{Block, Gauge, Paragraph, Sparkline},
    DefaultTerminal, Frame,
};
use tracing::{debug, error, info, warn};

use crate::{
    cli::{Args, CanvasSize},
    delegate::Delegate,
};

const MAX_HEIGHT: u64 = 100;

/// Draws a mouth which opens and closes with the played audio file.
pub struct MouthDelegate {
    args: Args,

    handler: Option<AudioFileHandler>,
    current_audio: CurrentAudio,

    terminal: Option<DefaultTerminal>,
    canvas: Size,
    history: VecDeque<u64>,
}

impl MouthDelegate {
    pub fn new(args: Args) -> Self {
        Self {
            args,
            handler: None,
            current_audio: CurrentAudio::default(),
            terminal: None,
            canvas: Size::default(),
            history: VecDeque::new(),
        }
    }

    fn output(&self) -> Result<Box<dyn OutputDevice>, lipsync_audio::Error> {
        if self.args.mute {
            return Ok(Box::new(NullOutput::default()));
        }

        Ok(Box::new(CpalOutput::default_device()?))
    }

    fn frame_time(&self) -> Duration {
        Duration::from_secs(1) / u32::from(self.args.fps.max(1))
    }

    /// Returns `false` if the user wants to quit.
    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Char(' ') => self.toggle_pause(),
                _ => {}
            },
            Event::Resize(..) => {
                if self.args.canvas_size == CanvasSize::Auto {
                    self.on_resize();
                }
            }
            _ => {}
        }

        true
    }

    fn toggle_pause(&self) {
        let Some(playback) = self.current_audio.get() else {
            return;
        };

        match playback.state() {
            PlaybackState::Playing => playback.pause(),
            PlaybackState::Paused => playback.play(),
            _ => {}
        }
    }

    fn is_finished(&self) -> bool {
        self.current_audio
            .get()
            .map(|playback| playback.is_finished())
            .unwrap_or(false)
    }

    fn tick(&mut self) -> io::Result<bool> {
        if event::poll(self.frame_time())? && !self.handle_event(event::read()?) {
            return Ok(false);
        }

        let mouth_open = match self.handler.as_mut() {
            Some(handler) => {
                handler.update();
                handler.normalized_average_frequency()
            }
            None => 0.,
        };

        self.history
            .push_back((mouth_open.clamp(0., 1.) * MAX_HEIGHT as f32) as u64);
        while self.history.len() > usize::from(self.canvas.width.max(1)) {
            self.history.pop_front();
        }

        let canvas = self.canvas;
        let color = self.args.color;
        let history = self.history.make_contiguous().to_vec();
        let state = self.current_audio.get().map(|playback| playback.state());

        if let Some(terminal) = self.terminal.as_mut() {
            terminal.draw(|frame| draw(frame, canvas, color, mouth_open, &history, state))?;
        }

        Ok(!self.is_finished())
    }
}

impl Delegate for MouthDelegate {
    fn initialize(&mut self) -> bool {
        let output = match self.output() {
            Ok(output) => output,
            Err(err) => {
                error!("Couldn't open the audio output: {}", err);
                eprintln!("Couldn't open the audio output: {}", err);
                return false;
            }
        };

        let config = HandlerConfig {
            playback: self.args.playback_mode(),
            ..Default::default()
        };
        debug!("Config: {:?}", config);

        let mut handler = match AudioFileHandler::from_config(
            output,
            Some(self.current_audio.publisher()),
            config,
        ) {
            Ok(handler) => handler,
            Err(err) => {
                error!("Invalid config: {}", err);
                return false;
            }
        };

        if let Err(err) = handler.start(&self.args.audio_path) {
            error!("Couldn't play {}: {}", self.args.audio_path.display(), err);
            eprintln!("Couldn't play {}: {}", self.args.audio_path.display(), err);
            return false;
        }
        self.handler = Some(handler);

        self.terminal = Some(ratatui::init());
        self.canvas = match self.args.canvas_size {
            CanvasSize::Fixed { width, height } => Size::new(width, height),
            CanvasSize::Auto => Size::default(),
        };
        if self.args.canvas_size == CanvasSize::Auto {
            self.on_resize();
        }

        info!("Playing {}", self.args.audio_path.display());
        true
    }

    fn run(&mut self) {
        loop {
            match self.tick() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    error!("Couldn't render the mouth: {}", err);
                    break;
                }
            }
        }
    }

    fn on_resize(&mut self) {
        let Some(terminal) = self.terminal.as_ref() else {
            return;
        };

        match terminal.size() {
            Ok(size) => {
                debug!("New canvas size: {:?}", size);
                self.canvas = size;
            }
            Err(err) => warn!("Couldn't retrieve the terminal size: {}", err),
        }
    }

    fn release(&mut self) {
        if let Some(playback) = self.current_audio.get() {
            playback.stop();
        }
        self.handler = None;

        if self.terminal.take().is_some() {
            ratatui::restore();
        }
    }
}

fn draw(
    frame: &mut Frame,
    canvas: Size,
    color: ratatui::style::Color,
    mouth_open: f32,
    history: &[u64],
    state: Option<PlaybackState>,
) {
    let area = canvas_area(frame.area(), canvas);

    let [gauge_area, history_area, help_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let status = match state {
        None | Some(PlaybackState::Loading) => "loading",
        Some(PlaybackState::Playing) => "playing",
        Some(PlaybackState::Paused) => "paused",
        Some(PlaybackState::Finished) => "finished",
    };

    let gauge = Gauge::default()
        .block(Block::bordered().title(format!(" Mouth ({}) ", status)))
        .gauge_style(Style::new().fg(color))
        .ratio(f64::from(mouth_open.clamp(0., 1.)))
        .label(format!("{:.3}", mouth_open));

    let sparkline = Sparkline::default()
        .block(Block::bordered().title(" History "))
        .data(history)
        .max(MAX_HEIGHT)
        .style(Style::new().fg(color));

    let help = Paragraph::new(Line::from("space: pause/resume, q: quit"));

    frame.render_widget(gauge, gauge_area);
    frame.render_widget(sparkline, history_area);
    frame.render_widget(help, help_area);
}

/// A fixed canvas never grows beyond the terminal.
fn canvas_area(frame_area: Rect, canvas: Size) -> Rect {
    Rect {
        x: frame_area.x,
        y: frame_area.y,
        width: canvas.width.min(frame_area.width),
        height: canvas.height.min(frame_area.height),
    }
}
