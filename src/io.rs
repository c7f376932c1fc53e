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

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::evaluate::PredictionResult;
use crate::types::{Rating, RatingFact};

pub const DEFAULT_DELIMITER: u8 = b',';

/// Reads delimited rating data. We expect NO headers, and an item, user, rating triple per
/// line. The number of fields is checked when parsing, so that we can report the line.
pub fn csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

fn malformed(line: u64, reason: String) -> Error {
    Error::MalformedRecord { line, reason }
}

/// Parses a single record. The rating is read as a floating point number and truncated
/// towards zero, so `3.9` becomes a rating of `3`.
pub fn parse_record(record: &csv::StringRecord, line: u64) -> Result<RatingFact> {

    if record.len() != 3 {
        return Err(malformed(line, format!("expected 3 fields, found {}", record.len())));
    }

    let raw_value = &record[2];

    let value: f64 = raw_value.parse()
        .map_err(|_| malformed(line, format!("rating '{}' is not a number", raw_value)))?;

    if !value.is_finite() {
        return Err(malformed(line, format!("rating '{}' is not finite", raw_value)));
    }

    let truncated = value.trunc();

    if truncated < Rating::MIN as f64 || truncated > Rating::MAX as f64 {
        return Err(malformed(line, format!("rating '{}' is out of range", raw_value)));
    }

    Ok(RatingFact::new(&record[0], &record[1], truncated as Rating))
}

/// Parses all records, the first malformed one aborts the whole read.
pub fn facts_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RatingFact>> {

    let mut reader = csv_reader(reader, delimiter);
    let mut facts = Vec::new();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);

        facts.push(parse_record(&record, line)?);
    }

    Ok(facts)
}

pub fn read_facts(path: &Path, delimiter: u8) -> Result<Vec<RatingFact>> {

    let file = File::open(path)?;
    let facts = facts_from_reader(file, delimiter)?;

    debug!(path = %path.display(), facts = facts.len(), "Read rating facts");

    Ok(facts)
}

pub fn create_file(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Writes the results as a JSON array of records.
pub fn write_results<W: Write>(mut out: W, results: &[PredictionResult]) -> Result<()> {
    serde_json::to_writer(&mut out, results)?;
    out.flush()?;

    Ok(())
}

pub fn write_error_summary<W: Write>(mut out: W, mae: f64, rmse: f64) -> io::Result<()> {
    // Debug formatting keeps the fraction of whole numbers, 1.0 is written as `1.0`
    writeln!(out, "Mean Absolute Error: {:?}", mae)?;
    writeln!(out, "Root Mean Square Error: {:?}", rmse)?;
    out.flush()
}
