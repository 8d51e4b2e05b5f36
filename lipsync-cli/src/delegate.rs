use tracing::{debug, instrument};

/// The lifecycle of the rendering context.
pub trait Delegate {
    /// Prepares everything which is needed for rendering.
    ///
    /// Returns `false` if that's not possible.
    fn initialize(&mut self) -> bool;

    /// Renders until the user (or the content) wants to stop.
    fn run(&mut self);

    /// Called whenever the canvas should follow a new window size.
    fn on_resize(&mut self);

    /// Frees everything which has been prepared by [Delegate::initialize].
    fn release(&mut self);
}

/// Owns the one and only [Delegate] of the application.
pub struct App<D: Delegate> {
    delegate: D,
}

impl<D: Delegate> App<D> {
    pub fn new(delegate: D) -> Self {
        Self { delegate }
    }

    /// Runs the delegate if it could be initialised and releases it afterwards.
    ///
    /// Returns whether the delegate was able to run.
    #[instrument(name = "App::launch", skip_all)]
    pub fn launch(mut self) -> bool {
        let initialized = self.delegate.initialize();
        if initialized {
            self.delegate.run();
        } else {
            debug!("Delegate couldn't be initialised");
        }

        self.delegate.release();
        initialized
    }
}
