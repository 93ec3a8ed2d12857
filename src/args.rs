use clap::{Parser, Subcommand};

/// This program builds and publishes icon-array flashcards for the
/// non-expert information portal.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, global = true, takes_value = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Builds the flashcard CSV files from an aggregated-data file and records
    /// their locations in the plotting-information file.
    Construct {
        /// (file path) The JSON file with the aggregated categorical counts.
        /// Both the legacy flat layout and the descriptives layout are accepted.
        #[clap(value_parser)]
        aggregated_data: String,
        /// (file path) The plotting-information JSON file. It is rewritten in place.
        #[clap(value_parser)]
        plotting_info: String,
        /// (URL) The base location of the public repository hosting the data
        /// files and the icon assets.
        #[clap(value_parser)]
        repository_path: String,
        /// (file path) A reference flashcard CSV. If provided, the program checks
        /// that the generated flashcard for the matching variable is identical.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Creates, publishes and retrieves the embedding code of a chart for every
    /// variable that does not have a chart yet.
    Publish {
        /// The Datawrapper API token.
        #[clap(value_parser)]
        api_token: String,
        /// (file path) The plotting-information JSON file. It is rewritten in place.
        #[clap(value_parser)]
        plotting_info: String,
    },
    /// Authenticates against the federated-computation server, runs the
    /// descriptive-statistics task and stores its result.
    Retrieve {
        /// (file path) The JSON file with the server and credential configuration.
        #[clap(value_parser)]
        config: String,
        /// (file path) The plotting-information JSON file, listing the variables
        /// to describe.
        #[clap(value_parser)]
        plotting_info: String,
    },
    /// Prints the full metadata of a chart.
    InspectChart {
        /// The Datawrapper API token.
        #[clap(value_parser)]
        api_token: String,
        /// The ID of the chart to inspect.
        #[clap(value_parser)]
        chart_id: String,
    },
    /// Deletes the given charts.
    RemoveCharts {
        /// The Datawrapper API token.
        #[clap(value_parser)]
        api_token: String,
        /// The IDs of the charts to delete.
        #[clap(value_parser, required = true)]
        chart_ids: Vec<String>,
    },
}
