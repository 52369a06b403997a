//! Binary entry point: load the records file from the working directory, run
//! the terminal shell, then write everything back.
use anyhow::Context;
use library_desk::{logging, run_app, App, Config, Desk, SystemClock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let config = Config::from_current_dir()?;
    logging::init(&config.log_path())?;

    let db_path = config.db_path();
    let desk = Desk::open(&db_path, SystemClock)
        .inspect_err(|err| error!(error = %err, path = %db_path.display(), "failed to load records"))
        .with_context(|| format!("failed to load {}", db_path.display()))?;
    info!(path = %db_path.display(), "records loaded");

    let mut app = App::new(desk, StdRng::from_entropy());
    let outcome = run_app(&mut app);

    let desk = app.into_desk();
    let saved = desk.export(&db_path);
    if let Err(err) = &saved {
        error!(error = %err, path = %db_path.display(), "failed to save records");
    }
    desk.close();

    outcome?;
    saved.with_context(|| format!("failed to save {}", db_path.display()))
}
