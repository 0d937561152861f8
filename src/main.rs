use std::process::ExitCode;

use eyre::{Context, Result, eyre};
use hey::app::App;
use hey::backend::new_backend;
use hey::cli::Command;
use hey::config::init_logger;
use hey::storage::new_storage;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cmd = Command::new();
    if cmd.version() {
        cmd.print_version();
        return ExitCode::SUCCESS;
    }

    better_panic::install();

    if let Err(err) = run(cmd).await {
        log::error!("{:?}", err);
        eprintln!("{:#}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cmd: Command) -> Result<()> {
    let config = cmd.get_config()?;
    init_logger(&config.log)?;

    let profile = config
        .profile(cmd.profile())
        .cloned()
        .ok_or_else(|| eyre!("Profile {} not found.", cmd.profile()))?;

    let storage = new_storage(&config)
        .await
        .wrap_err("initializing storage")?;
    let backend = new_backend(&profile);

    let app = App::new(storage, backend, profile);
    cmd.run(&app, &mut std::io::stdout()).await
}
