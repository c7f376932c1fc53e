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

use std::env;
use std::path::PathBuf;
use std::process;

use getopts::{Matches, Options};
use tracing::error;
use tracing_subscriber::EnvFilter;

use corate::pipeline::{self, ExtraCredit, RunConfig};
use corate::{CachePolicy, Centering, NeighborSource};

fn main() {

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("t", "training", "Training ratings (required). The input must contain an item, \
        a user and a rating per line, separated by the delimiter.", "PATH");
    opts.optopt("s", "test", "Test ratings to predict (required), in the same format as the \
        training ratings. The rating is the true value used for the error metrics.", "PATH");
    opts.optopt("", "extra-training", "Ratings of one additional user, added to the training \
        ratings for a second pass (optional, requires --extra-test).", "PATH");
    opts.optopt("", "extra-test", "Test ratings for the second pass (optional, requires \
        --extra-training).", "PATH");
    opts.optopt("o", "output-dir", "Directory to write results and error metrics to \
        (optional, defaults to the current directory).", "PATH");
    opts.optopt("d", "delimiter", "Field delimiter of the input files (optional, defaults \
        to ',').", "CHAR");
    opts.optopt("w", "workers", "Number of threads to compute predictions with (optional, \
        defaults to the number of CPUs).", "NUMBER");
    opts.optflag("", "no-cache", "Recompute correlations instead of remembering them");
    opts.optflag("", "scan", "Find the raters of an item by scanning all ratings instead of \
        using the item index");
    opts.optflag("", "center-on-target", "Center neighbor ratings on the mean of the target \
        user instead of their own mean");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint), 2)
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None, 0);
    }

    let config = match run_config(&matches) {
        Ok(config) => config,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint), 2),
    };

    if let Err(failure) = pipeline::run(&config) {
        error!(error = %failure, "Run failed, no outputs written");
        process::exit(1);
    }
}

fn run_config(matches: &Matches) -> Result<RunConfig, String> {

    let training = matches.opt_str("t")
        .ok_or_else(|| "Please specify training ratings via --training.".to_owned())?;
    let test = matches.opt_str("s")
        .ok_or_else(|| "Please specify test ratings via --test.".to_owned())?;

    let mut config = RunConfig::new(training, test);

    config.extra_credit = match (matches.opt_str("extra-training"), matches.opt_str("extra-test")) {
        (Some(training), Some(test)) => Some(ExtraCredit {
            training: PathBuf::from(training),
            test: PathBuf::from(test),
        }),
        (None, None) => None,
        _ => return Err("Options --extra-training and --extra-test go together.".to_owned()),
    };

    if let Some(output_dir) = matches.opt_str("o") {
        config.output_dir = PathBuf::from(output_dir);
    }

    if let Some(delimiter) = matches.opt_str("d") {
        let bytes = delimiter.as_bytes();
        if bytes.len() != 1 {
            return Err(format!("Delimiter must be a single byte, got '{}'.", delimiter));
        }
        config.delimiter = bytes[0];
    }

    config.prediction.workers = matches.opt_get_default("w", num_cpus::get())
        .map_err(|failure| format!("Problem with option 'w': {}", failure))?
        .max(1);

    if matches.opt_present("no-cache") {
        config.prediction.correlations = CachePolicy::Recompute;
    }

    if matches.opt_present("scan") {
        config.prediction.neighbors = NeighborSource::FactScan;
    }

    if matches.opt_present("center-on-target") {
        config.prediction.centering = Centering::TargetMean;
    }

    Ok(config)
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>,
    code: i32,
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
    process::exit(code);
}
