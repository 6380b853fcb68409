// storefront/src/outcome.rs
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Decides whether a simulated payment goes through.
///
/// Stands in for a payment gateway so tests can force either branch.
pub trait PaymentOutcome: Send {
    fn settle(&mut self) -> bool;
}

/// Succeeds with a fixed probability
pub struct RandomOutcome {
    rng: StdRng,
    success_rate: f64,
}

impl RandomOutcome {
    pub fn new(success_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        // gen_bool panics outside [0, 1]
        let success_rate = if success_rate.is_nan() { 0.0 } else { success_rate.clamp(0.0, 1.0) };
        Self { rng, success_rate }
    }
}

impl PaymentOutcome for RandomOutcome {
    fn settle(&mut self) -> bool {
        self.rng.gen_bool(self.success_rate)
    }
}

/// Always yields the same result
pub struct FixedOutcome(pub bool);

impl PaymentOutcome for FixedOutcome {
    fn settle(&mut self) -> bool {
        self.0
    }
}

/// Replays a script of results, then repeats the last one
pub struct ScriptedOutcome {
    script: VecDeque<bool>,
    last: bool,
}

impl ScriptedOutcome {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: true,
        }
    }
}

impl PaymentOutcome for ScriptedOutcome {
    fn settle(&mut self) -> bool {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_outcome_reaches_both_branches() {
        let mut outcome = RandomOutcome::new(0.9, Some(42));
        let results: Vec<bool> = (0..200).map(|_| outcome.settle()).collect();
        assert!(results.iter().any(|ok| *ok));
        assert!(results.iter().any(|ok| !*ok));
    }

    #[test]
    fn test_seeded_outcomes_repeat() {
        let mut a = RandomOutcome::new(0.5, Some(7));
        let mut b = RandomOutcome::new(0.5, Some(7));
        for _ in 0..50 {
            assert_eq!(a.settle(), b.settle());
        }
    }

    #[test]
    fn test_rate_is_clamped() {
        let mut always = RandomOutcome::new(3.0, None);
        let mut never = RandomOutcome::new(-1.0, None);
        for _ in 0..20 {
            assert!(always.settle());
            assert!(!never.settle());
        }
    }

    #[test]
    fn test_scripted_outcome() {
        let mut outcome = ScriptedOutcome::new([false, true]);
        assert!(!outcome.settle());
        assert!(outcome.settle());
        assert!(outcome.settle());
    }
}
