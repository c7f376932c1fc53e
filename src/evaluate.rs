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

use std::time::Instant;

use scoped_pool::Pool;
use serde_derive::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::predict::Predictor;
use crate::types::{Rating, TestQuery};

/// A prediction next to the held-out rating. Field names will be used in JSON.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "itemId", skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    pub prediction: f64,
    #[serde(rename = "trueValue")]
    pub true_value: Rating,
}

impl PredictionResult {
    fn error(&self) -> f64 {
        self.prediction - self.true_value as f64
    }
}

#[derive(Clone, Debug)]
pub struct Evaluation {
    /// One result per query, in query order.
    pub results: Vec<PredictionResult>,
    pub mae: f64,
    pub rmse: f64,
}

/// Predicts every query and computes the error metrics. With more than one worker the queries
/// are split into contiguous chunks, each worker writes to its own part of the output, so the
/// results do not depend on the order in which workers finish.
pub fn evaluate(
    predictor: &Predictor,
    queries: &[TestQuery],
    workers: usize,
    tag_items: bool,
) -> Result<Evaluation> {

    if queries.is_empty() {
        return Err(Error::EmptyResultSet);
    }

    let start = Instant::now();

    let predictions = predict_all(predictor, queries, workers);

    let results: Vec<PredictionResult> = queries.iter()
        .zip(predictions.into_iter())
        .map(|(query, prediction)| {
            PredictionResult {
                item: if tag_items { Some(query.item.clone()) } else { None },
                prediction,
                true_value: query.value,
            }
        })
        .collect();

    let mae = mean_absolute_error(&results)?;
    let rmse = root_mean_square_error(&results)?;

    info!(
        queries = results.len(),
        workers,
        mae,
        rmse,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Evaluated predictions"
    );

    Ok(Evaluation { results, mae, rmse })
}

fn predict_all(predictor: &Predictor, queries: &[TestQuery], workers: usize) -> Vec<f64> {

    let mut predictions = vec![0.0; queries.len()];

    if workers <= 1 {
        for (query, prediction) in queries.iter().zip(predictions.iter_mut()) {
            *prediction = predictor.predict(&query.user, &query.item);
        }

        return predictions;
    }

    // A few chunks per worker to even out the load
    let num_chunks = workers * 4;
    let chunk_size = ((queries.len() + num_chunks - 1) / num_chunks).max(1);

    let pool = Pool::new(workers);

    pool.scoped(|scope| {
        for (query_chunk, prediction_chunk) in
            queries.chunks(chunk_size).zip(predictions.chunks_mut(chunk_size)) {

            scope.execute(move || {
                for (query, prediction) in query_chunk.iter().zip(prediction_chunk.iter_mut()) {
                    *prediction = predictor.predict(&query.user, &query.item);
                }
            });
        }
    });

    pool.shutdown();

    predictions
}

pub fn mean_absolute_error(results: &[PredictionResult]) -> Result<f64> {

    if results.is_empty() {
        return Err(Error::EmptyResultSet);
    }

    let sum: f64 = results.iter().map(|result| result.error().abs()).sum();

    Ok(sum / results.len() as f64)
}

pub fn root_mean_square_error(results: &[PredictionResult]) -> Result<f64> {

    if results.is_empty() {
        return Err(Error::EmptyResultSet);
    }

    let sum: f64 = results.iter().map(|result| result.error() * result.error()).sum();

    Ok((sum / results.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {

    use super::{evaluate, mean_absolute_error, root_mean_square_error, PredictionResult};
    use crate::error::Error;
    use crate::mean::MeanRatingTable;
    use crate::predict::{PredictionConfig, Predictor};
    use crate::similarity::SimilarityEngine;
    use crate::store::RatingStore;
    use crate::testing::{example_facts, random_facts};
    use crate::types::{RatingFact, TestQuery};

    fn result(prediction: f64, true_value: i32) -> PredictionResult {
        PredictionResult { item: None, prediction, true_value }
    }

    #[test]
    fn error_metrics() {
        let results = vec![result(4.0, 5), result(2.0, 2)];

        assert_eq!(mean_absolute_error(&results).unwrap(), 0.5);
        assert!((root_mean_square_error(&results).unwrap() - 0.5_f64.sqrt()).abs() < 1e-12);
        assert!((root_mean_square_error(&results).unwrap() - 0.7071).abs() < 1e-4);
    }

    #[test]
    fn error_metrics_need_results() {
        match mean_absolute_error(&[]) {
            Err(Error::EmptyResultSet) => {},
            other => panic!("expected an empty result set error, got {:?}", other),
        }

        match root_mean_square_error(&[]) {
            Err(Error::EmptyResultSet) => {},
            other => panic!("expected an empty result set error, got {:?}", other),
        }
    }

    #[test]
    fn evaluation_of_example_queries() {
        let store = RatingStore::load(&example_facts()).unwrap();
        let means = MeanRatingTable::build(&store).unwrap();
        let config = PredictionConfig::default();
        let similarity = SimilarityEngine::new(&store, &means, config.correlations);
        let predictor = Predictor::new(&store, &means, &similarity, &config);

        let queries = vec![
            RatingFact::new("m2", "C", 5),
            RatingFact::new("m1", "nobody", 3),
            RatingFact::new("m42", "A", 3),
        ];

        let evaluation = evaluate(&predictor, &queries, 1, true).unwrap();

        assert_eq!(evaluation.results, vec![
            PredictionResult { item: Some("m2".to_owned()), prediction: 4.0, true_value: 5 },
            PredictionResult { item: Some("m1".to_owned()), prediction: 0.0, true_value: 3 },
            PredictionResult { item: Some("m42".to_owned()), prediction: 3.0, true_value: 3 },
        ]);

        assert!((evaluation.mae - 4.0 / 3.0).abs() < 1e-12);
        assert!((evaluation.rmse - (10.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn evaluation_needs_queries() {
        let store = RatingStore::load(&example_facts()).unwrap();
        let means = MeanRatingTable::build(&store).unwrap();
        let config = PredictionConfig::default();
        let similarity = SimilarityEngine::new(&store, &means, config.correlations);
        let predictor = Predictor::new(&store, &means, &similarity, &config);

        match evaluate(&predictor, &[], 4, false) {
            Err(Error::EmptyResultSet) => {},
            other => panic!("expected an empty result set error, got {:?}", other),
        }
    }

    #[test]
    fn parallel_evaluation_matches_sequential() {
        let facts = random_facts(60, 30);
        let (queries, training): (Vec<TestQuery>, Vec<RatingFact>) = facts.into_iter()
            .enumerate()
            .fold((Vec::new(), Vec::new()), |(mut queries, mut training), (index, fact)| {
                if index % 5 == 0 {
                    queries.push(fact);
                } else {
                    training.push(fact);
                }
                (queries, training)
            });

        let store = RatingStore::load(&training).unwrap();
        let means = MeanRatingTable::build(&store).unwrap();
        let config = PredictionConfig::default();

        let sequential_similarity = SimilarityEngine::new(&store, &means, config.correlations);
        let sequential_predictor = Predictor::new(&store, &means, &sequential_similarity, &config);
        let sequential = evaluate(&sequential_predictor, &queries, 1, false).unwrap();

        let parallel_similarity = SimilarityEngine::new(&store, &means, config.correlations);
        let parallel_predictor = Predictor::new(&store, &means, &parallel_similarity, &config);
        let parallel = evaluate(&parallel_predictor, &queries, 4, false).unwrap();

        assert_eq!(sequential.results.len(), queries.len());

        for (left, right) in sequential.results.iter().zip(parallel.results.iter()) {
            assert_eq!(left.prediction.to_bits(), right.prediction.to_bits());
            assert_eq!(left.true_value, right.true_value);
        }

        assert_eq!(sequential.mae.to_bits(), parallel.mae.to_bits());
        assert_eq!(sequential.rmse.to_bits(), parallel.rmse.to_bits());
        assert_eq!(
            sequential_similarity.cache().computations(),
            parallel_similarity.cache().computations()
        );
    }
}
