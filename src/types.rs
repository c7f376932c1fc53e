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

use fnv::FnvHashMap;

/// Ratings are small integers in practice, but nothing beyond summing and averaging them is
/// assumed.
pub type Rating = i32;

/// A sparse row of ratings, keyed by the integer index of the item (in the by-user view) or of
/// the user (in the by-item view).
pub type SparseRatings = FnvHashMap<u32, Rating>;
pub type SparseRatingMatrix = Vec<SparseRatings>;

/// A single observed rating, using the original string identifiers from the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatingFact {
    pub item: String,
    pub user: String,
    pub value: Rating,
}

impl RatingFact {
    pub fn new<I: Into<String>, U: Into<String>>(item: I, user: U, value: Rating) -> Self {
        RatingFact { item: item.into(), user: user.into(), value }
    }
}

/// Test queries have the same shape as training facts, their value is the held-out rating.
pub type TestQuery = RatingFact;

/// A rating fact after its identifiers have been mapped to consecutive integer indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedFact {
    pub user: u32,
    pub item: u32,
    pub value: Rating,
}

pub fn new_sparse_ratings(capacity: usize) -> SparseRatings {
    FnvHashMap::with_capacity_and_hasher(capacity, Default::default())
}
