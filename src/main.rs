use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

mod cli;
mod client;
mod controller;
mod debounce;
mod domain;
mod inputter;
mod logging;
mod model;
mod records;
mod sanitize;
mod table;
mod ui;

use cli::Args;
use client::{DataClient, HttpSource};
use controller::Controller;
use domain::ViewerError;
use model::{Model, Status};
use ui::TableUI;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            ratatui::restore();
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run(args: &Args) -> Result<(), ViewerError> {
    let config = args.config()?;
    logging::init(&args.log_path()?, &args.log_level)?;
    info!("Starting msgtv against {}", config.api_url);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("msgtv-io")
        .enable_all()
        .build()?;

    let source = Arc::new(HttpSource::new(&config.api_url, config.request_timeout)?);
    let client = DataClient::new(source, runtime.handle().clone(), &config);
    let mut model = Model::init(&config, client);
    let ui = TableUI::new(&config);
    let controller = Controller::new(&config);

    let mut terminal = ratatui::init();
    model.mount();

    while model.status != Status::Quitting {
        model.poll(Instant::now());
        terminal.draw(|f| ui.draw(&model.uidata(), f))?;

        let message = controller.handle_event(&model)?;
        model.update(message);
    }

    info!("Bye");
    Ok(())
}
