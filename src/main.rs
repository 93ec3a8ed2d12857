mod args;
mod flashcards;

use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

use crate::args::{Args, Command};
use crate::flashcards::{datawrapper, vantage6};

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let res = match &args.command {
        Command::Construct {
            aggregated_data,
            plotting_info,
            repository_path,
            reference,
        } => flashcards::run_construct(
            aggregated_data,
            plotting_info,
            repository_path,
            reference.as_deref(),
        ),
        Command::Publish {
            api_token,
            plotting_info,
        } => datawrapper::run_publish(api_token, plotting_info),
        Command::Retrieve {
            config,
            plotting_info,
        } => vantage6::run_retrieve(config, plotting_info),
        Command::InspectChart { api_token, chart_id } => {
            datawrapper::run_inspect(api_token, chart_id)
        }
        Command::RemoveCharts {
            api_token,
            chart_ids,
        } => datawrapper::run_remove(api_token, chart_ids),
    };

    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
