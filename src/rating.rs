//! Glicko-2 rating updates.
//!
//! Glicko-2 math itself is an explicit out-of-scope black box (spec §1);
//! `skillratings` supplies it. `PlayerRating` reproduces the reference
//! implementation's staged `Update`/`Apply` API: `update` buffers one
//! opponent-and-outcome pair, `apply` folds the whole buffered rating
//! period into a new rating in one call.

use std::sync::Mutex;

use skillratings::glicko2::{glicko2_rating_period, Glicko2Config, Glicko2Rating};
use skillratings::Outcomes;

pub struct PlayerRating {
    rating: Mutex<Glicko2Rating>,
    pending: Mutex<Vec<(Glicko2Rating, Outcomes)>>,
}

impl Default for PlayerRating {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerRating {
    pub fn new() -> Self {
        Self {
            rating: Mutex::new(Glicko2Rating::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// A point-in-time snapshot, safe to hand to another thread as an
    /// opponent rating (per spec's "opponent's current rating1 snapshot").
    pub fn snapshot(&self) -> Glicko2Rating {
        *self.rating.lock().unwrap()
    }

    /// Buffer a game outcome against `opponent_snapshot`. `score` is the
    /// Glicko score from this player's perspective: 1.0 win, 0.5 draw, 0.0 loss.
    pub fn update(&self, opponent_snapshot: Glicko2Rating, score: f64) {
        let outcome = if score >= 1.0 {
            Outcomes::WIN
        } else if score <= 0.0 {
            Outcomes::LOSS
        } else {
            Outcomes::DRAW
        };
        self.pending.lock().unwrap().push((opponent_snapshot, outcome));
    }

    /// Fold the buffered rating period into a new rating and clear the buffer.
    pub fn apply(&self) {
        let mut pending = self.pending.lock().unwrap();
        if pending.is_empty() {
            return;
        }

        let mut rating = self.rating.lock().unwrap();
        let results: Vec<(Glicko2Rating, Outcomes)> = pending.drain(..).collect();
        *rating = glicko2_rating_period(&rating, &results, &Glicko2Config::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_is_noop_with_empty_buffer() {
        let rating = PlayerRating::new();
        let before = rating.snapshot();
        rating.apply();
        assert_eq!(rating.snapshot().rating, before.rating);
    }

    #[test]
    fn winning_raises_rating() {
        let rating = PlayerRating::new();
        let opponent = Glicko2Rating::new();
        let before = rating.snapshot().rating;
        rating.update(opponent, 1.0);
        rating.apply();
        assert!(rating.snapshot().rating > before);
    }

    #[test]
    fn apply_clears_pending_buffer() {
        let rating = PlayerRating::new();
        let opponent = Glicko2Rating::new();
        rating.update(opponent, 1.0);
        rating.apply();
        let after_first = rating.snapshot().rating;
        // Applying again with nothing pending must not change the rating.
        rating.apply();
        assert_eq!(rating.snapshot().rating, after_first);
    }
}
