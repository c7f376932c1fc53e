use std::mem;

use fnv::FnvHashSet;
use tracing::{debug, info};

pub mod dictionary;
pub mod error;
pub mod evaluate;
pub mod io;
pub mod mean;
pub mod pipeline;
pub mod predict;
pub mod similarity;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod usage_tests;

pub use error::{Error, Result};
pub use evaluate::{Evaluation, PredictionResult};
pub use predict::{Centering, NeighborSource, PredictionConfig};
pub use similarity::CachePolicy;
pub use types::{Rating, RatingFact, TestQuery};

use mean::MeanRatingTable;
use predict::Predictor;
use similarity::{CorrelationCache, SimilarityEngine};
use store::RatingStore;

/// Everything a run keeps between its passes: the rating store, the mean ratings and the
/// correlations computed so far.
pub struct Session {
    store: RatingStore,
    means: MeanRatingTable,
    cache: CorrelationCache,
    config: PredictionConfig,
}

impl Session {

    pub fn train(facts: &[RatingFact], config: PredictionConfig) -> Result<Self> {

        let store = RatingStore::load(facts)?;
        let means = MeanRatingTable::build(&store)?;

        Ok(Session { store, means, cache: CorrelationCache::default(), config })
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn means(&self) -> &MeanRatingTable {
        &self.means
    }

    pub fn cache(&self) -> &CorrelationCache {
        &self.cache
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    pub fn predict(&mut self, user: &str, item: &str) -> f64 {
        self.with_predictor(|predictor| predictor.predict(user, item))
    }

    pub fn correlation(&mut self, user_a: &str, user_i: &str) -> f64 {
        self.with_predictor(|predictor| predictor.similarity().correlation(user_a, user_i))
    }

    pub fn evaluate(&mut self, queries: &[TestQuery], tag_items: bool) -> Result<Evaluation> {

        let workers = self.config.workers;

        let evaluation = self.with_predictor(|predictor| {
            evaluate::evaluate(predictor, queries, workers, tag_items)
        });

        debug!(
            entries = self.cache.len(),
            computations = self.cache.computations(),
            hits = self.cache.hits(),
            "Correlation cache"
        );

        evaluation
    }

    /// Splices the ratings of exactly one previously unknown user into the training data. Only
    /// the mean of that user is computed, the means and correlations of everybody else stay
    /// valid as their ratings did not change. Returns the id of the added user.
    pub fn augment(&mut self, facts: &[RatingFact]) -> Result<String> {

        let user = match facts.first() {
            Some(fact) => fact.user.clone(),
            None => return Err(Error::InvalidAugmentation("no ratings to add".to_owned())),
        };

        if let Some(other) = facts.iter().find(|fact| fact.user != user) {
            return Err(Error::InvalidAugmentation(
                format!("ratings of more than one user, found {} and {}", user, other.user)));
        }

        if self.store.user_index(&user).is_some() {
            return Err(Error::InvalidAugmentation(format!("user {} is already known", user)));
        }

        // Check before appending anything, so that a rejected augmentation leaves no trace
        let mut items = FnvHashSet::with_capacity_and_hasher(facts.len(), Default::default());
        for fact in facts {
            if !items.insert(fact.item.as_str()) {
                return Err(Error::DuplicateRating { user, item: fact.item.clone() });
            }
        }

        for fact in facts {
            self.store.append(fact)?;
        }

        if let Some(index) = self.store.user_index(&user) {
            self.means.refresh(&self.store, index)?;
            self.cache.forget_user(index);
        }

        info!(user = %user, ratings = facts.len(), "Augmented training data");

        Ok(user)
    }

    /// The correlation cache is moved into a similarity engine for the duration of `f` and
    /// handed back afterwards, so it survives across calls.
    fn with_predictor<T, F>(&mut self, f: F) -> T
        where F: FnOnce(&Predictor) -> T {

        let cache = mem::take(&mut self.cache);
        let similarity = SimilarityEngine::with_cache(
            &self.store, &self.means, cache, self.config.correlations);

        let outcome = {
            let predictor = Predictor::new(&self.store, &self.means, &similarity, &self.config);
            f(&predictor)
        };

        self.cache = similarity.into_cache();

        outcome
    }
}

#[cfg(test)]
mod tests {

    use super::{PredictionConfig, Session};
    use crate::error::Error;
    use crate::testing::example_facts;
    use crate::types::RatingFact;

    #[test]
    fn example_scenario() {
        let mut session = Session::train(&example_facts(), PredictionConfig::default()).unwrap();

        assert_eq!(session.correlation("A", "B"), -1.0);
        assert_eq!(session.predict("C", "m2"), 4.0);
    }

    #[test]
    fn cache_survives_between_calls() {
        let mut session = Session::train(&example_facts(), PredictionConfig::default()).unwrap();

        session.correlation("A", "B");
        session.correlation("B", "A");

        assert_eq!(session.cache().len(), 1);
        assert_eq!(session.cache().computations(), 1);
        assert_eq!(session.cache().hits(), 1);
    }

    #[test]
    fn augmentation_adds_one_new_user() {
        let mut session = Session::train(&example_facts(), PredictionConfig::default()).unwrap();

        // Cold before the augmentation
        assert_eq!(session.predict("E", "m2"), 0.0);
        assert_eq!(session.correlation("E", "A"), 0.0);

        let user = session.augment(&[
            RatingFact::new("m1", "E", 4),
            RatingFact::new("m2", "E", 2),
        ]).unwrap();

        assert_eq!(user, "E");
        assert_eq!(session.means().get(session.store().user_index("E").unwrap()), Some(3.0));
        assert_eq!(session.means().get(session.store().user_index("A").unwrap()), Some(3.0));
        assert_eq!(session.correlation("E", "A"), 1.0);
        assert_eq!(session.correlation("E", "B"), -1.0);

        // Neighbors of m2 are A, B and E itself, each pulling one point below the mean
        assert_eq!(session.predict("E", "m2"), 2.0);
    }

    fn expect_invalid_augmentation(facts: &[RatingFact]) {
        let mut session = Session::train(&example_facts(), PredictionConfig::default()).unwrap();
        let num_ratings = session.store().num_ratings();

        match session.augment(facts) {
            Err(Error::InvalidAugmentation(_)) | Err(Error::DuplicateRating { .. }) => {},
            other => panic!("expected the augmentation to be rejected, got {:?}", other),
        }

        assert_eq!(session.store().num_ratings(), num_ratings);
    }

    #[test]
    fn rejected_augmentations() {
        expect_invalid_augmentation(&[]);
        expect_invalid_augmentation(&[RatingFact::new("m3", "A", 1)]);
        expect_invalid_augmentation(&[
            RatingFact::new("m1", "E", 4),
            RatingFact::new("m1", "F", 2),
        ]);
        expect_invalid_augmentation(&[
            RatingFact::new("m1", "E", 4),
            RatingFact::new("m1", "E", 2),
        ]);
    }
}
