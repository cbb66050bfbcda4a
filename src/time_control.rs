//! Byo-yomi time control tracking.
//!
//! Canadian-style byo-yomi only — the batch supports no other time control
//! mode (see spec §9's canonical choice of a single, unambiguous regime).

/// Phase of a player's clock within one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Main,
    ByoYomi,
}

/// One player's clock state during a game.
#[derive(Debug, Clone, Copy)]
struct PlayerClock {
    phase: Phase,
    remaining_ms: i64,
    stones_to_do: u32,
}

/// Tracks both players' clocks for one game under a fixed byo-yomi spec.
#[derive(Debug)]
pub struct TimeTracker {
    main_time_ms: u64,
    byo_yomi_time_ms: u64,
    byo_yomi_stones: u32,
    black: PlayerClock,
    white: PlayerClock,
}

/// Outcome of ending a player's move: either they remain on the clock, or
/// they flagged (lost on time).
pub enum MoveTiming {
    Ok,
    Flagged,
}

impl TimeTracker {
    pub fn new(main_time_s: u64, byo_yomi_time_s: u64, byo_yomi_stones: u32) -> Self {
        let main_time_ms = main_time_s * 1000;
        let byo_yomi_time_ms = byo_yomi_time_s * 1000;

        let initial = PlayerClock {
            phase: Phase::Main,
            remaining_ms: main_time_ms as i64,
            stones_to_do: 0,
        };

        Self {
            main_time_ms,
            byo_yomi_time_ms,
            byo_yomi_stones,
            black: initial,
            white: initial,
        }
    }

    fn clock(&self, is_black: bool) -> &PlayerClock {
        if is_black { &self.black } else { &self.white }
    }

    fn clock_mut(&mut self, is_black: bool) -> &mut PlayerClock {
        if is_black { &mut self.black } else { &mut self.white }
    }

    /// Remaining time for `time_left`, in seconds (floor).
    pub fn remaining_secs(&self, is_black: bool) -> u64 {
        (self.clock(is_black).remaining_ms.max(0) as u64) / 1000
    }

    /// Stones left in the current byo-yomi period (0 while still in main time).
    pub fn stones_to_do(&self, is_black: bool) -> u32 {
        match self.clock(is_black).phase {
            Phase::Main => 0,
            Phase::ByoYomi => self.clock(is_black).stones_to_do,
        }
    }

    /// Deducts `elapsed_ms` from the mover's clock and rolls the phase
    /// transition / byo-yomi period reset rules in spec §4.3 step 4.
    pub fn account_move(&mut self, is_black: bool, elapsed_ms: u64) -> MoveTiming {
        let byo_yomi_time_ms = self.byo_yomi_time_ms as i64;
        let byo_yomi_stones = self.byo_yomi_stones;
        let clock = self.clock_mut(is_black);

        clock.remaining_ms -= elapsed_ms as i64;
        if clock.phase == Phase::ByoYomi {
            clock.stones_to_do = clock.stones_to_do.saturating_sub(1);
        }

        if clock.remaining_ms < 0 {
            match clock.phase {
                Phase::Main if byo_yomi_time_ms == 0 || byo_yomi_stones == 0 => MoveTiming::Flagged,
                Phase::Main => {
                    clock.phase = Phase::ByoYomi;
                    clock.remaining_ms = byo_yomi_time_ms;
                    clock.stones_to_do = byo_yomi_stones;
                    MoveTiming::Ok
                }
                Phase::ByoYomi => {
                    if clock.stones_to_do != 0 {
                        MoveTiming::Flagged
                    } else {
                        // Period elapsed cleanly; start a fresh one.
                        clock.remaining_ms = byo_yomi_time_ms;
                        clock.stones_to_do = byo_yomi_stones;
                        MoveTiming::Ok
                    }
                }
            }
        } else {
            MoveTiming::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_time_transitions_to_byo_yomi_on_underflow() {
        let mut tt = TimeTracker::new(1, 5, 3);
        // First move takes longer than the main budget.
        let timing = tt.account_move(true, 1500);
        assert!(matches!(timing, MoveTiming::Ok));
        assert_eq!(tt.remaining_secs(true), 5);
        assert_eq!(tt.stones_to_do(true), 3);
    }

    #[test]
    fn byo_yomi_legal_period_end_resets_without_flagging() {
        let mut tt = TimeTracker::new(0, 5, 1);
        // main_time == 0 triggers an immediate MAIN -> BYO_YOMI transition.
        let timing = tt.account_move(true, 100);
        assert!(matches!(timing, MoveTiming::Ok));
        // Using the whole period for its single required stone is a legal
        // period end, not a loss on time.
        let timing = tt.account_move(true, 6000);
        assert!(matches!(timing, MoveTiming::Ok));
    }

    #[test]
    fn byo_yomi_flags_when_stones_still_owed() {
        let mut tt = TimeTracker::new(0, 5, 2);
        let timing = tt.account_move(true, 100);
        assert!(matches!(timing, MoveTiming::Ok));
        // Still owes one more stone in this period, but blows the whole
        // clock on a single move.
        let timing = tt.account_move(true, 6000);
        assert!(matches!(timing, MoveTiming::Flagged));
    }

    #[test]
    fn main_time_expiry_flags_immediately_when_byo_yomi_disabled() {
        let mut tt = TimeTracker::new(1, 0, 0);
        let timing = tt.account_move(true, 2000);
        assert!(matches!(timing, MoveTiming::Flagged));
    }

    #[test]
    fn main_time_expiry_flags_immediately_when_byo_yomi_stones_zero() {
        let mut tt = TimeTracker::new(1, 5, 0);
        let timing = tt.account_move(true, 2000);
        assert!(matches!(timing, MoveTiming::Flagged));
    }
}
