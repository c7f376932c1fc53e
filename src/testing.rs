//! Rating fixtures shared by the unit tests.

use rand::{Rng, XorShiftRng};

use crate::types::RatingFact;

/// A rated m1 and m2 with 4 and 2, B with 3 and 5, C only rated m1 with 4 and D only rated m3.
pub fn example_facts() -> Vec<RatingFact> {
    vec![
        RatingFact::new("m1", "A", 4),
        RatingFact::new("m2", "A", 2),
        RatingFact::new("m1", "B", 3),
        RatingFact::new("m2", "B", 5),
        RatingFact::new("m1", "C", 4),
        RatingFact::new("m3", "D", 5),
    ]
}

/// Every user rates roughly a third of the items with values from 1 to 5. The generator is
/// unseeded, so the same arguments always produce the same facts.
pub fn random_facts(num_users: u32, num_items: u32) -> Vec<RatingFact> {
    let mut rng = XorShiftRng::new_unseeded();
    let mut facts = Vec::new();

    for user in 0..num_users {
        for item in 0..num_items {
            if rng.gen_range(0, 3) == 0 {
                let value: i32 = rng.gen_range(1, 6);
                facts.push(RatingFact::new(format!("item{}", item), format!("user{}", user), value));
            }
        }
    }

    facts
}
