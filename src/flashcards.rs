use log::{debug, info, warn};

use icon_array::*;
use snafu::{prelude::*, Snafu};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use text_diff::print_diff;

pub mod datawrapper;
pub mod io_aggregated;
pub mod plotting_info;
pub mod vantage6;

use crate::flashcards::plotting_info::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FlashcardError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Could not read a number from the configuration"))]
    ParsingJsonNumber {},
    #[snafu(display("Unrecognised aggregated-data layout: {details}"))]
    UnrecognizedSchema { details: String },
    #[snafu(display("Error writing flashcard file {path}"))]
    WritingFlashcard {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error serializing the flashcard CSV"))]
    SerializingCsv { source: csv::Error },
    #[snafu(display("No usable counts for variable {variable}"))]
    Allocation {
        source: AllocationErrors,
        variable: String,
    },
    #[snafu(display("HTTP {status}: {body}"))]
    HttpStatus { status: u16, body: String },
    #[snafu(display("HTTP transport error: {details}"))]
    HttpTransport { details: String },
    #[snafu(display("Authentication with the federated server failed (HTTP {status}): {body}"))]
    AuthenticationFailed { status: u16, body: String },
    #[snafu(display("Unexpected response shape: {details}"))]
    UnexpectedResponse { details: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type FcResult<T> = Result<T, FlashcardError>;

/// Maps a non-success HTTP outcome onto the pipeline error type.
///
/// Every remote call is attempted exactly once; a non-2xx status terminates
/// the running stage.
pub fn check_http(result: Result<ureq::Response, ureq::Error>) -> FcResult<ureq::Response> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            HttpStatusSnafu { status, body }.fail()
        }
        Err(ureq::Error::Transport(t)) => HttpTransportSnafu {
            details: t.to_string(),
        }
        .fail(),
    }
}

/// A flashcard ready to be written out: the target file name, the serialized
/// CSV text and the positive icon count recorded in the plotting information.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Flashcard {
    pub file_name: String,
    pub csv_data: String,
    pub positive_icons: i64,
}

/// The icon glyphs used by the information portal: markdown image links into
/// the public repository's asset directory.
pub fn portal_glyphs(repository_path: &str) -> IconGlyphs {
    IconGlyphs {
        positive: format!(
            "![person]({}/web/images/Datawrapper_assests/person-orange.svg) ",
            repository_path
        ),
        negative: format!(
            "![person]({}/web/images/Datawrapper_assests/person-grey.svg) ",
            repository_path
        ),
    }
}

/// Builds the flashcard for one variable from the aggregated counts.
///
/// The CSV has two lines: a header equal to the variable name and a single
/// data cell with the rendered icon string. Every space is stripped from the
/// serialized text, the separator between the icon groups included. This
/// keeps the hosted file compact and is relied upon by the published charts.
pub fn construct_flashcard(
    rows: &[CategoricalCount],
    variable: &str,
    selector: &StrataSelector,
    glyphs: &IconGlyphs,
) -> FcResult<Flashcard> {
    let (positive_count, negative_count) = selector.split_counts(rows, variable);
    debug!(
        "construct_flashcard: variable {}: positive {} negative {}",
        variable, positive_count, negative_count
    );

    let allocation =
        allocate(positive_count, negative_count, MAX_ICONS - 1).context(AllocationSnafu {
            variable: variable.to_string(),
        })?;
    let rendered = render(&allocation, glyphs);

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([variable]).context(SerializingCsvSnafu {})?;
    wtr.write_record([rendered.as_str()])
        .context(SerializingCsvSnafu {})?;
    let bytes = match wtr.into_inner() {
        Ok(b) => b,
        Err(e) => whatever!("Could not flush the CSV writer: {}", e),
    };
    let serialized = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => whatever!("The serialized CSV is not valid UTF-8: {}", e),
    };

    Ok(Flashcard {
        file_name: format!("{}_flashcard.csv", variable),
        csv_data: serialized.replace(' ', ""),
        positive_icons: allocation.positive_icons,
    })
}

/// Writes a flashcard under `out_dir`, creating the directory if needed.
pub fn write_flashcard(out_dir: &Path, flashcard: &Flashcard) -> FcResult<PathBuf> {
    fs::create_dir_all(out_dir).context(WritingFlashcardSnafu {
        path: out_dir.display().to_string(),
    })?;
    let target = out_dir.join(&flashcard.file_name);
    fs::write(&target, &flashcard.csv_data).context(WritingFlashcardSnafu {
        path: target.display().to_string(),
    })?;
    Ok(target)
}

/// Runs the flashcard-construction stage: one CSV per variable in the
/// plotting information, plus the updated plotting-information file.
pub fn run_construct(
    aggregated_data_path: &str,
    plotting_info_path: &str,
    repository_path: &str,
    reference_path: Option<&str>,
) -> FcResult<()> {
    let rows = io_aggregated::read_aggregated(aggregated_data_path)?;
    let mut info = read_plotting_info(plotting_info_path)?;
    info!(
        "run_construct: {} aggregated rows, {} variables",
        rows.len(),
        info.len()
    );

    let glyphs = portal_glyphs(repository_path);
    let out_dir: PathBuf = ["data", "flashcards"].iter().collect();
    let mut produced: HashMap<String, String> = HashMap::new();

    for (variable, entry) in info.iter_mut() {
        let flashcard = construct_flashcard(&rows, variable, &entry.selector(), &glyphs)?;
        let target = write_flashcard(&out_dir, &flashcard)?;
        info!("Wrote flashcard {}", target.display());

        entry.data_location = Some(format!(
            "{}/data/flashcards/{}",
            repository_path, flashcard.file_name
        ));
        entry.positive_count = Some(flashcard.positive_icons);
        produced.insert(flashcard.file_name.clone(), flashcard.csv_data.clone());
    }

    write_plotting_info(plotting_info_path, &info)?;

    // The reference flashcard, if provided for comparison.
    if let Some(ref_path) = reference_path {
        check_reference(ref_path, &produced)?;
    }

    Ok(())
}

fn check_reference(ref_path: &str, produced: &HashMap<String, String>) -> FcResult<()> {
    let expected = fs::read_to_string(ref_path).context(OpeningFileSnafu {
        path: ref_path.to_string(),
    })?;
    let file_name = Path::new(ref_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match produced.get(&file_name) {
        Some(actual) if *actual == expected => {
            info!("Reference check passed for {}", file_name);
            Ok(())
        }
        Some(actual) => {
            warn!("Found differences with the reference flashcard");
            print_diff(expected.as_str(), actual.as_str(), "\n");
            whatever!(
                "Difference detected between generated flashcard and reference {}",
                file_name
            )
        }
        None => whatever!(
            "The reference file {} does not match any generated flashcard",
            file_name
        ),
    }
}
