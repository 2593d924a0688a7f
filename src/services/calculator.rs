use chrono::Utc;

use crate::models::{ComparisonEntry, ComparisonPair, UserFilmRating};

/// Lowest Elo value a rating can hold; updates never go below it
pub const RATING_FLOOR: f64 = 100.0;

/// Expected score of film A against film B
///
/// Ea = 1 / (1 + 10^((Rb - Ra)/400))
/// Where:
/// Ea is the expected score of film A
/// Ra is the current rating of film A
/// Rb is the current rating of film B
///
/// Rounded to 2 decimal places before use.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    let raw = 1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / 400.0));
    (raw * 100.0).round() / 100.0
}

/// Recalculated Elo rating after one comparison
///
/// R'a = Ra + K(Sa - Ea)
/// Where:
/// R'a is the new rating for film A
/// Ra is the current rating for film A
/// K is the K-factor for this record
/// Sa is the actual result (0 loss, 0.5 draw, 1 win)
/// Ea is the expected score
///
/// A result at or below the floor is replaced by exactly 100; anything above
/// it is rounded to the nearest integer. Stored ratings are whole numbers
/// while expected scores keep 2 decimal places; both precisions are part of
/// the contract.
pub fn update_rating(expected: f64, actual: f64, current: f64, k_constant: f64) -> f64 {
    let raw = current + k_constant * (actual - expected);
    if raw <= RATING_FLOOR {
        return RATING_FLOOR;
    }
    raw.round()
}

/// Step-size coefficient for a record with the given comparison count
///
/// New ratings move fast and settle as they accumulate comparisons.
pub fn k_constant_for(number_of_comparisons: i32) -> f64 {
    match number_of_comparisons {
        n if n < 20 => 40.0,
        n if n < 40 => 20.0,
        _ => 10.0,
    }
}

/// Applies one resolved comparison to both ratings
///
/// Both expected scores are computed from the pre-update ratings; film A's
/// update must not feed into film B's input within the same comparison. Each
/// side's K constant is refreshed from its comparison count first, and both
/// comparison counts advance by exactly one.
pub fn resolve_pair(
    film_a: &UserFilmRating,
    film_b: &UserFilmRating,
    entry: &ComparisonEntry,
) -> ComparisonPair {
    let (actual_a, actual_b) = entry.actual_scores();

    let expected_a = expected_score(film_a.elo_rating, film_b.elo_rating);
    let expected_b = expected_score(film_b.elo_rating, film_a.elo_rating);

    let k_a = k_constant_for(film_a.number_of_comparisons);
    let k_b = k_constant_for(film_b.number_of_comparisons);

    let now = Utc::now();

    let mut updated_a = film_a.clone();
    updated_a.k_constant = k_a;
    updated_a.elo_rating = update_rating(expected_a, actual_a, film_a.elo_rating, k_a);
    updated_a.number_of_comparisons += 1;
    updated_a.last_updated = now;

    let mut updated_b = film_b.clone();
    updated_b.k_constant = k_b;
    updated_b.elo_rating = update_rating(expected_b, actual_b, film_b.elo_rating, k_b);
    updated_b.number_of_comparisons += 1;
    updated_b.last_updated = now;

    ComparisonPair {
        film_a: updated_a,
        film_b: updated_b,
    }
}
