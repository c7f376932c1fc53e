/**
 * CoRate
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::evaluate::Evaluation;
use crate::io;
use crate::predict::PredictionConfig;
use crate::Session;

pub const RESULTS_FILE: &str = "results.txt";
pub const ERRORS_FILE: &str = "error_results.txt";
pub const EXTRA_CREDIT_RESULTS_FILE: &str = "results_extraCredit.txt";
pub const EXTRA_CREDIT_ERRORS_FILE: &str = "error_results_extraCredit.txt";

/// Ratings of one additional user and the queries to evaluate once they are part of the
/// training data.
#[derive(Clone, Debug)]
pub struct ExtraCredit {
    pub training: PathBuf,
    pub test: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub training: PathBuf,
    pub test: PathBuf,
    pub extra_credit: Option<ExtraCredit>,
    pub output_dir: PathBuf,
    pub delimiter: u8,
    pub prediction: PredictionConfig,
}

impl RunConfig {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(training: P, test: Q) -> Self {
        RunConfig {
            training: training.into(),
            test: test.into(),
            extra_credit: None,
            output_dir: PathBuf::from("."),
            delimiter: io::DEFAULT_DELIMITER,
            prediction: PredictionConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub evaluation: Evaluation,
    pub extra_credit: Option<Evaluation>,
    pub written: Vec<PathBuf>,
}

/// Runs both passes and only then writes the outputs, a failing run leaves no files behind.
pub fn run(config: &RunConfig) -> Result<RunReport> {

    let start = Instant::now();

    let training = io::read_facts(&config.training, config.delimiter)?;
    let test = io::read_facts(&config.test, config.delimiter)?;

    let extra_credit_inputs = match config.extra_credit {
        Some(ref extra_credit) => Some((
            io::read_facts(&extra_credit.training, config.delimiter)?,
            io::read_facts(&extra_credit.test, config.delimiter)?,
        )),
        None => None,
    };

    let mut session = Session::train(&training, config.prediction.clone())?;

    let evaluation = session.evaluate(&test, false)?;

    let extra_credit = match extra_credit_inputs {
        Some((facts, queries)) => {
            session.augment(&facts)?;
            Some(session.evaluate(&queries, true)?)
        },
        None => None,
    };

    let mut written = Vec::new();

    write_pass(&config.output_dir, RESULTS_FILE, ERRORS_FILE, &evaluation, &mut written)?;

    if let Some(ref extra_credit) = extra_credit {
        write_pass(
            &config.output_dir,
            EXTRA_CREDIT_RESULTS_FILE,
            EXTRA_CREDIT_ERRORS_FILE,
            extra_credit,
            &mut written,
        )?;
    }

    info!(
        mae = evaluation.mae,
        rmse = evaluation.rmse,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Predictions complete"
    );

    Ok(RunReport { evaluation, extra_credit, written })
}

fn write_pass(
    output_dir: &Path,
    results_file: &str,
    errors_file: &str,
    evaluation: &Evaluation,
    written: &mut Vec<PathBuf>,
) -> Result<()> {

    let results_path = output_dir.join(results_file);
    io::write_results(io::create_file(&results_path)?, &evaluation.results)?;

    let errors_path = output_dir.join(errors_file);
    io::write_error_summary(io::create_file(&errors_path)?, evaluation.mae, evaluation.rmse)?;

    info!(results = %results_path.display(), errors = %errors_path.display(), "Wrote outputs");

    written.push(results_path);
    written.push(errors_path);

    Ok(())
}
