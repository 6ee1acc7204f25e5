//! Configuration for network contraction.

use serde::{Deserialize, Serialize};

use crate::optimization::{ContractionStrategy, CostModel};

/// Configuration options for launching a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Strategy for finding contraction paths.
    pub strategy: ContractionStrategy,
    /// Whether to check bond dimensions against the description before
    /// planning.
    pub validate_bonds: bool,
    /// Memory penalty of the cost model.
    pub cost_alpha: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            strategy: ContractionStrategy::Auto,
            validate_bonds: true,
            cost_alpha: CostModel::default().alpha,
        }
    }
}

impl NetworkConfig {
    /// Creates a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the contraction strategy.
    pub fn with_strategy(mut self, strategy: ContractionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables bond validation.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_bonds = enabled;
        self
    }

    pub fn with_cost_alpha(mut self, alpha: u64) -> Self {
        self.cost_alpha = alpha;
        self
    }

    /// Creates a config optimized for speed (minimal validation).
    pub fn fast() -> Self {
        Self {
            strategy: ContractionStrategy::Greedy,
            validate_bonds: false,
            ..Self::default()
        }
    }

    /// Creates a config optimized for correctness (full validation).
    pub fn safe() -> Self {
        Self {
            strategy: ContractionStrategy::Optimal,
            validate_bonds: true,
            ..Self::default()
        }
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.cost_alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(NetworkConfig::fast().strategy, ContractionStrategy::Greedy);
        assert!(!NetworkConfig::fast().validate_bonds);
        assert_eq!(NetworkConfig::safe().strategy, ContractionStrategy::Optimal);
        let custom = NetworkConfig::new()
            .with_strategy(ContractionStrategy::Sequential)
            .with_validation(false)
            .with_cost_alpha(0);
        assert_eq!(custom.cost_model().alpha, 0);
        assert_eq!(custom.strategy, ContractionStrategy::Sequential);
    }

    #[test]
    fn test_serde_fills_defaults() {
        let config: NetworkConfig = serde_json::from_str(r#"{"strategy":"Greedy"}"#).unwrap();
        assert_eq!(config, NetworkConfig::default().with_strategy(ContractionStrategy::Greedy));
        let json = serde_json::to_string(&NetworkConfig::safe()).unwrap();
        assert_eq!(serde_json::from_str::<NetworkConfig>(&json).unwrap(), NetworkConfig::safe());
    }
}
