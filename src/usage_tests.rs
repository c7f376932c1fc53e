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

#[cfg(test)]
mod tests {

    use crate::{PredictionConfig, RatingFact, Session};

    #[test]
    fn programmatic_usage() {

        /* Our input data comprises of ratings that users gave to items. The identifiers used
           can be strings of arbitrary length and structure. */
        let ratings = vec![
            RatingFact::new("apple", "alice", 5),
            RatingFact::new("dog", "alice", 1),
            RatingFact::new("pony", "alice", 3),
            RatingFact::new("apple", "bob", 4),
            RatingFact::new("dog", "bob", 2),
            RatingFact::new("pony", "bob", 3),
            RatingFact::new("apple", "charles", 1),
            RatingFact::new("dog", "charles", 5),
            RatingFact::new("bike", "charles", 4),
        ];

        /* The session indexes the ratings by user and by item, and computes the mean rating of
           every user. Correlations between users are computed lazily and remembered. */
        let config = PredictionConfig { workers: 2, ..Default::default() };
        let mut session = Session::train(&ratings, config).unwrap();

        println!(
            "Found {} ratings from {} users for {} items.",
            session.store().num_ratings(),
            session.store().num_users(),
            session.store().num_items(),
        );

        /* Alice and bob agree on apple and dog, charles disagrees with both of them */
        assert!(session.correlation("alice", "bob") > 0.9);
        assert!(session.correlation("alice", "charles") < -0.9);

        /* Bob did not rate the bike, charles who disagrees with him liked it. */
        let prediction = session.predict("bob", "bike");
        println!("Predicted rating of bob for bike: {}", prediction);
        assert!(prediction < 3.0);

        /* For an evaluation, we predict held-out ratings and compare them to the truth. */
        let held_out = vec![
            RatingFact::new("bike", "alice", 2),
            RatingFact::new("pony", "charles", 2),
        ];

        let evaluation = session.evaluate(&held_out, false).unwrap();

        println!("Mean Absolute Error: {}", evaluation.mae);
        println!("Root Mean Square Error: {}", evaluation.rmse);

        assert_eq!(evaluation.results.len(), 2);
        assert!(evaluation.rmse >= evaluation.mae);
    }
}
