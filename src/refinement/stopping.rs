use crate::config::FmConfig;
use crate::hypergraph::Gain;

/// Decides when an FM pass should give up on finding a better prefix.
///
/// The refiner feeds every accepted move's gain into `update_statistics` and
/// calls `reset` whenever a new best solution is recorded; `should_stop` is
/// consulted before each further move.
pub trait StoppingPolicy: Default {
    fn reset(&mut self);

    fn update_statistics(&mut self, gain: Gain);

    /// `fruitless_moves` counts the moves performed since the last best
    /// solution.
    fn should_stop(&self, fruitless_moves: usize, config: &FmConfig) -> bool;
}

/// Threshold rule: stop after i fruitless moves.
#[derive(Debug, Default)]
pub struct NumberOfFruitlessMovesStopsSearch;

impl StoppingPolicy for NumberOfFruitlessMovesStopsSearch {
    fn reset(&mut self) {}

    fn update_statistics(&mut self, _gain: Gain) {}

    fn should_stop(&self, fruitless_moves: usize, config: &FmConfig) -> bool {
        fruitless_moves >= config.max_number_of_fruitless_moves
    }
}

/// Random-walk model: the gains observed since the last improvement form a
/// random walk with mean μ and variance σ²; once
/// steps > β and steps ≥ α·σ²/μ², further improvement is unlikely.
/// Statistics use Welford's online update.
#[derive(Debug, Default)]
pub struct RandomWalkModelStopsSearch {
    num_steps: usize,
    mean: f64,
    m2: f64,
}

impl StoppingPolicy for RandomWalkModelStopsSearch {
    fn reset(&mut self) {
        self.num_steps = 0;
        self.mean = 0.0;
        self.m2 = 0.0;
    }

    fn update_statistics(&mut self, gain: Gain) {
        self.num_steps += 1;
        let delta = gain as f64 - self.mean;
        self.mean += delta / self.num_steps as f64;
        self.m2 += delta * (gain as f64 - self.mean);
    }

    fn should_stop(&self, _fruitless_moves: usize, config: &FmConfig) -> bool {
        if (self.num_steps as f64) <= config.beta {
            return false;
        }
        let variance = if self.num_steps > 1 {
            self.m2 / (self.num_steps - 1) as f64
        } else {
            0.0
        };
        self.mean == 0.0 || self.num_steps as f64 >= config.alpha * variance / (self.mean * self.mean)
    }
}

/// The original formulation of the random-walk rule: population statistics
/// over the same window and the criterion steps·μ² > α·σ² + β.
#[derive(Debug, Default)]
pub struct NGpRandomWalkStopsSearch {
    num_steps: usize,
    sum_gains: f64,
    sum_squared_gains: f64,
}

impl StoppingPolicy for NGpRandomWalkStopsSearch {
    fn reset(&mut self) {
        self.num_steps = 0;
        self.sum_gains = 0.0;
        self.sum_squared_gains = 0.0;
    }

    fn update_statistics(&mut self, gain: Gain) {
        self.num_steps += 1;
        self.sum_gains += gain as f64;
        self.sum_squared_gains += (gain as f64) * (gain as f64);
    }

    fn should_stop(&self, _fruitless_moves: usize, config: &FmConfig) -> bool {
        if self.num_steps == 0 {
            return false;
        }
        let n = self.num_steps as f64;
        let mean = self.sum_gains / n;
        let variance = self.sum_squared_gains / n - mean * mean;
        n * mean * mean > config.alpha * variance + config.beta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoppingRule;

    fn fm_config(max_fruitless: usize, alpha: f64, beta: f64) -> FmConfig {
        FmConfig {
            stopping_rule: StoppingRule::Simple,
            num_repetitions: usize::MAX,
            max_number_of_fruitless_moves: max_fruitless,
            alpha,
            beta,
        }
    }

    #[test]
    fn test_simple_rule_counts_fruitless_moves() {
        let policy = NumberOfFruitlessMovesStopsSearch;
        let config = fm_config(3, 8.0, 0.0);

        assert!(!policy.should_stop(0, &config));
        assert!(!policy.should_stop(2, &config));
        assert!(policy.should_stop(3, &config));
    }

    #[test]
    fn test_random_walk_waits_for_beta_steps() {
        let mut policy = RandomWalkModelStopsSearch::default();
        let config = fm_config(150, 8.0, 5.0);

        for _ in 0..5 {
            policy.update_statistics(-1);
        }
        assert!(!policy.should_stop(5, &config));

        // Constant negative gains have zero variance: stop immediately after
        // the warm-up window.
        policy.update_statistics(-1);
        assert!(policy.should_stop(6, &config));
    }

    #[test]
    fn test_random_walk_resets() {
        let mut policy = RandomWalkModelStopsSearch::default();
        let config = fm_config(150, 8.0, 2.0);
        for _ in 0..10 {
            policy.update_statistics(-2);
        }
        assert!(policy.should_stop(10, &config));

        policy.reset();
        assert!(!policy.should_stop(0, &config));
    }

    #[test]
    fn test_ngp_rule_stops_on_steady_loss() {
        let mut policy = NGpRandomWalkStopsSearch::default();
        let config = fm_config(150, 8.0, 4.0);

        policy.update_statistics(-3);
        // One step: 1·9 > 8·0 + 4 holds already with zero variance.
        assert!(policy.should_stop(1, &config));

        policy.reset();
        // Alternating gains keep the variance high enough to continue.
        for gain in [3, -3, 3, -3] {
            policy.update_statistics(gain);
        }
        assert!(!policy.should_stop(4, &config));
    }

    #[test]
    fn test_short_windows_never_stop() {
        let mut adaptive1 = RandomWalkModelStopsSearch::default();
        let mut adaptive2 = NGpRandomWalkStopsSearch::default();
        let config = fm_config(150, 8.0, 6.0);
        for gain in [-1, -1, -1] {
            adaptive1.update_statistics(gain);
            adaptive2.update_statistics(gain);
        }

        // Three steps of steady loss sit below the β window of both rules.
        assert!(!adaptive1.should_stop(3, &config));
        assert!(!adaptive2.should_stop(3, &config));
    }
}
