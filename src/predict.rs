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

use crate::mean::MeanRatingTable;
use crate::similarity::{CachePolicy, SimilarityEngine};
use crate::store::RatingStore;
use crate::types::Rating;

/// Where the neighbors of a prediction come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborSource {
    /// Look up the raters of the item in the by-item view.
    ByItemIndex,
    /// Scan the complete fact log for ratings of the item.
    FactScan,
}

/// Which mean a neighbor's rating is centered on before it is weighted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Centering {
    NeighborMean,
    TargetMean,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredictionConfig {
    pub neighbors: NeighborSource,
    pub correlations: CachePolicy,
    pub centering: Centering,
    /// Number of workers the evaluator spreads the test queries over.
    pub workers: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            neighbors: NeighborSource::ByItemIndex,
            correlations: CachePolicy::Memoize,
            centering: Centering::NeighborMean,
            workers: 1,
        }
    }
}

/// Predicts ratings as the user's mean plus the correlation-weighted, mean-centered ratings of
/// everybody who rated the item, normalized by the sum of the absolute weights.
pub struct Predictor<'a> {
    store: &'a RatingStore,
    means: &'a MeanRatingTable,
    similarity: &'a SimilarityEngine<'a>,
    neighbors: NeighborSource,
    centering: Centering,
}

impl<'a> Predictor<'a> {

    pub fn new(
        store: &'a RatingStore,
        means: &'a MeanRatingTable,
        similarity: &'a SimilarityEngine<'a>,
        config: &PredictionConfig,
    ) -> Self {
        Predictor {
            store,
            means,
            similarity,
            neighbors: config.neighbors,
            centering: config.centering,
        }
    }

    pub fn similarity(&self) -> &SimilarityEngine<'a> {
        self.similarity
    }

    pub fn predict(&self, user: &str, item: &str) -> f64 {

        let user = match self.store.user_index(user) {
            Some(user) => user,
            // A cold user has neither a mean nor any correlation
            None => return 0.0,
        };

        match self.store.item_index(item) {
            Some(item) => self.predict_by_index(user, item),
            None => self.means.get_or_zero(Some(user)),
        }
    }

    /// Note that the user is among the neighbors if they rated the item themselves.
    pub fn predict_by_index(&self, user: u32, item: u32) -> f64 {

        let user_mean = self.means.get(user).unwrap_or(0.0);

        let mut weighted_sum = 0.0;
        let mut sum_of_weights = 0.0;

        let mut accumulate = |neighbor: u32, rating: Rating| {
            let weight = self.similarity.correlation_by_index(user, neighbor);

            let baseline = match self.centering {
                Centering::NeighborMean => self.means.get(neighbor).unwrap_or(0.0),
                Centering::TargetMean => user_mean,
            };

            sum_of_weights += weight.abs();
            weighted_sum += weight * (rating as f64 - baseline);
        };

        match self.neighbors {
            NeighborSource::ByItemIndex => {
                for (neighbor, rating) in self.store.item_raters(item).iter() {
                    accumulate(*neighbor, *rating);
                }
            },
            NeighborSource::FactScan => {
                for fact in self.store.facts().iter().filter(|fact| fact.item == item) {
                    accumulate(fact.user, fact.value);
                }
            },
        }

        let k = if sum_of_weights > 0.0 { 1.0 / sum_of_weights } else { 0.0 };

        user_mean + k * weighted_sum
    }
}
