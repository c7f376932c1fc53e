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

use tracing::info;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::types::{self, IndexedFact, Rating, RatingFact, SparseRatingMatrix, SparseRatings};

/// Indexed view of all observed ratings. Each fact is held in the by-user view, the by-item
/// view and the fact log, all three are only ever extended together.
#[derive(Debug, Default)]
pub struct RatingStore {
    users: Dictionary,
    items: Dictionary,
    by_user: SparseRatingMatrix,
    by_item: SparseRatingMatrix,
    facts: Vec<IndexedFact>,
    empty: SparseRatings,
}

impl RatingStore {

    /// Builds the store from parsed facts. A repeated (user, item) pair aborts the load.
    pub fn load<'a, I>(facts: I) -> Result<Self>
        where I: IntoIterator<Item=&'a RatingFact> {

        let mut store = RatingStore::default();

        for fact in facts {
            store.append(fact)?;
        }

        info!(
            ratings = store.num_ratings(),
            users = store.num_users(),
            items = store.num_items(),
            "Loaded rating store"
        );

        Ok(store)
    }

    pub fn append(&mut self, fact: &RatingFact) -> Result<()> {

        if let (Some(user), Some(item)) = (self.user_index(&fact.user), self.item_index(&fact.item)) {
            if self.by_user[user as usize].contains_key(&item) {
                return Err(Error::DuplicateRating {
                    user: fact.user.clone(),
                    item: fact.item.clone(),
                });
            }
        }

        let user = self.users.get_or_insert(&fact.user);
        if user as usize == self.by_user.len() {
            self.by_user.push(types::new_sparse_ratings(10));
        }

        let item = self.items.get_or_insert(&fact.item);
        if item as usize == self.by_item.len() {
            self.by_item.push(types::new_sparse_ratings(10));
        }

        self.by_user[user as usize].insert(item, fact.value);
        self.by_item[item as usize].insert(user, fact.value);
        self.facts.push(IndexedFact { user, item, value: fact.value });

        Ok(())
    }

    /// Ratings of a user keyed by item index, empty for a user we have never seen.
    pub fn ratings_of(&self, user: &str) -> &SparseRatings {
        match self.user_index(user) {
            Some(index) => self.user_ratings(index),
            None => &self.empty,
        }
    }

    /// Ratings for an item keyed by user index, empty for an item we have never seen.
    pub fn raters_of(&self, item: &str) -> &SparseRatings {
        match self.item_index(item) {
            Some(index) => self.item_raters(index),
            None => &self.empty,
        }
    }

    pub fn user_ratings(&self, user: u32) -> &SparseRatings {
        self.by_user.get(user as usize).unwrap_or(&self.empty)
    }

    pub fn item_raters(&self, item: u32) -> &SparseRatings {
        self.by_item.get(item as usize).unwrap_or(&self.empty)
    }

    /// Items rated by both users, as `(item, rating of a, rating of b)`. We walk the shorter
    /// of both rows and probe the other one.
    pub fn co_rated<'a>(&'a self, a: u32, b: u32) -> impl Iterator<Item=(u32, Rating, Rating)> + 'a {

        let ratings_a = self.user_ratings(a);
        let ratings_b = self.user_ratings(b);

        let swapped = ratings_b.len() < ratings_a.len();
        let (outer, inner) = if swapped { (ratings_b, ratings_a) } else { (ratings_a, ratings_b) };

        outer.iter().filter_map(move |(item, outer_value)| {
            inner.get(item).map(|inner_value| {
                if swapped {
                    (*item, *inner_value, *outer_value)
                } else {
                    (*item, *outer_value, *inner_value)
                }
            })
        })
    }

    pub fn user_index(&self, user: &str) -> Option<u32> {
        self.users.index_of(user)
    }

    pub fn item_index(&self, item: &str) -> Option<u32> {
        self.items.index_of(item)
    }

    pub fn user_name(&self, user: u32) -> &str {
        self.users.name(user)
    }

    pub fn item_name(&self, item: u32) -> &str {
        self.items.name(item)
    }

    /// All facts in the order they were added.
    pub fn facts(&self) -> &[IndexedFact] {
        &self.facts
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn num_ratings(&self) -> usize {
        self.facts.len()
    }
}
