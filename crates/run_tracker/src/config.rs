use serde::Deserialize;
use shared::domain::{MatchResult, RunTally};

/// Thresholds at which a run is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunBoundaryConfig {
    pub max_wins: u32,
    pub max_losses: u32,
}

impl Default for RunBoundaryConfig {
    fn default() -> Self {
        Self {
            max_wins: 12,
            max_losses: 3,
        }
    }
}

impl RunBoundaryConfig {
    /// Whether a match played from `entering` with `result` ends the run.
    pub fn is_terminal(&self, entering: RunTally, result: MatchResult) -> bool {
        let after = entering.after(result);
        match result {
            MatchResult::Won => after.wins >= self.max_wins,
            MatchResult::Lost => after.losses >= self.max_losses,
            MatchResult::Tied => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_win_and_last_loss_are_terminal() {
        let config = RunBoundaryConfig::default();
        assert!(config.is_terminal(RunTally::new(11, 1), MatchResult::Won));
        assert!(!config.is_terminal(RunTally::new(11, 1), MatchResult::Lost));
        assert!(config.is_terminal(RunTally::new(4, 2), MatchResult::Lost));
        assert!(!config.is_terminal(RunTally::new(4, 1), MatchResult::Won));
        assert!(!config.is_terminal(RunTally::new(11, 2), MatchResult::Tied));
    }
}
