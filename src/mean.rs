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

use tracing::debug;

use crate::error::{Error, Result};
use crate::store::RatingStore;
use crate::types::SparseRatings;

/// Arithmetic mean of the given ratings of a user.
pub fn mean_of(user: &str, ratings: &SparseRatings) -> Result<f64> {

    if ratings.is_empty() {
        return Err(Error::EmptyRatingSet(user.to_owned()));
    }

    let sum: i64 = ratings.values().map(|value| *value as i64).sum();

    Ok(sum as f64 / ratings.len() as f64)
}

/// Mean rating per user, indexed like the users of the store it was built from.
#[derive(Debug, Default)]
pub struct MeanRatingTable {
    means: Vec<Option<f64>>,
}

impl MeanRatingTable {

    pub fn build(store: &RatingStore) -> Result<Self> {

        let mut means = Vec::with_capacity(store.num_users());

        for user in 0..store.num_users() as u32 {
            let mean = mean_of(store.user_name(user), store.user_ratings(user))?;
            means.push(Some(mean));
        }

        debug!(users = means.len(), "Computed mean ratings");

        Ok(MeanRatingTable { means })
    }

    /// Recomputes the mean of a single user whose ratings changed, leaving all others as they
    /// are.
    pub fn refresh(&mut self, store: &RatingStore, user: u32) -> Result<()> {

        if self.means.len() < store.num_users() {
            self.means.resize(store.num_users(), None);
        }

        let mean = mean_of(store.user_name(user), store.user_ratings(user))?;
        self.means[user as usize] = Some(mean);

        Ok(())
    }

    /// `None` for users without a mean, callers decide what that means for them.
    pub fn get(&self, user: u32) -> Option<f64> {
        self.means.get(user as usize).cloned().unwrap_or(None)
    }

    /// The mean of a user, zero for a cold user.
    pub fn get_or_zero(&self, user: Option<u32>) -> f64 {
        user.and_then(|user| self.get(user)).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.means.iter().filter(|mean| mean.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {

    use super::{mean_of, MeanRatingTable};
    use crate::error::Error;
    use crate::store::RatingStore;
    use crate::types::{self, RatingFact};

    fn example_store() -> RatingStore {
        RatingStore::load(&[
            RatingFact::new("m1", "A", 4),
            RatingFact::new("m2", "A", 2),
            RatingFact::new("m1", "B", 3),
            RatingFact::new("m2", "B", 5),
            RatingFact::new("m1", "C", 4),
        ]).unwrap()
    }

    #[test]
    fn means_of_example_users() {
        let store = example_store();
        let means = MeanRatingTable::build(&store).unwrap();

        assert_eq!(means.get(store.user_index("A").unwrap()), Some(3.0));
        assert_eq!(means.get(store.user_index("B").unwrap()), Some(4.0));
        assert_eq!(means.get(store.user_index("C").unwrap()), Some(4.0));
        assert_eq!(means.len(), 3);
    }

    #[test]
    fn unknown_user_has_no_mean() {
        let store = example_store();
        let means = MeanRatingTable::build(&store).unwrap();

        assert_eq!(means.get(42), None);
        assert_eq!(means.get_or_zero(store.user_index("nobody")), 0.0);
    }

    #[test]
    fn empty_rating_set() {
        match mean_of("ghost", &types::new_sparse_ratings(0)) {
            Err(Error::EmptyRatingSet(user)) => assert_eq!(user, "ghost"),
            other => panic!("expected an empty rating set error, got {:?}", other),
        }
    }

    #[test]
    fn mean_is_not_rounded() {
        let store = RatingStore::load(&[
            RatingFact::new("m1", "A", 1),
            RatingFact::new("m2", "A", 2),
            RatingFact::new("m3", "A", 2),
        ]).unwrap();

        let mean = mean_of("A", store.ratings_of("A")).unwrap();
        assert!((mean - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn refresh_follows_appended_ratings() {
        let mut store = example_store();
        let mut means = MeanRatingTable::build(&store).unwrap();

        store.append(&RatingFact::new("m2", "C", 1)).unwrap();
        let c = store.user_index("C").unwrap();

        assert_eq!(means.get(c), Some(4.0));
        means.refresh(&store, c).unwrap();
        assert_eq!(means.get(c), Some(2.5));

        store.append(&RatingFact::new("m1", "D", 2)).unwrap();
        let d = store.user_index("D").unwrap();

        assert_eq!(means.get(d), None);
        means.refresh(&store, d).unwrap();
        assert_eq!(means.get(d), Some(2.0));
        assert_eq!(means.get(store.user_index("A").unwrap()), Some(3.0));
    }
}
