mod cli;
mod delegate;
mod logger;
mod mouth;

use anyhow::{Context, Result};
use delegate::App;
use mouth::MouthDelegate;

fn main() -> Result<()> {
    let args = cli::parse();
    logger::init(&args.log_file).context("Create log file")?;

    if !args.audio_path.exists() {
        eprintln!(
            "The given audio path does not exist: \"{}\"",
            args.audio_path.to_string_lossy()
        );
        std::process::exit(1);
    }

    if !App::new(MouthDelegate::new(args)).launch() {
        std::process::exit(1);
    }

    Ok(())
}
