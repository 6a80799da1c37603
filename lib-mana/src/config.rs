//! Genesis configuration: the constructor arguments of both contracts.
//!
//! Loaded once by the deployment driver, from TOML or JSON:
//!
//! ```toml
//! deployer = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
//! operators = ["0xbcdc0883787ba970d450917724ceb73059720265"]
//! partitions = ["collateralized", "uncollateralized"]
//! initial_supply = "1000000000000000000000000"
//! ```

use lib_types::{Address, Amount, PartitionId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::errors::{ManaError, ManaResult};
use crate::partitions::{COLLATERALIZED_LABEL, UNCOLLATERALIZED_LABEL};

/// One whole token in base units (18 decimals)
pub const UNIT: Amount = 1_000_000_000_000_000_000;

fn default_partition_labels() -> Vec<String> {
    vec![
        COLLATERALIZED_LABEL.to_string(),
        UNCOLLATERALIZED_LABEL.to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisConfig {
    /// Account deploying both contracts; owns the ManaToken
    pub deployer: Address,
    /// Trusted MANA operators
    #[serde(default)]
    pub operators: Vec<Address>,
    /// Partition labels, hashed with keccak256 at deployment
    #[serde(default = "default_partition_labels")]
    pub partitions: Vec<String>,
    /// ManaToken supply credited to the deployer, in base units
    #[serde(with = "amount_format")]
    pub initial_supply: Amount,
}

impl GenesisConfig {
    /// Configuration with the standard partitions
    pub fn new(deployer: Address, operators: Vec<Address>, initial_supply: Amount) -> Self {
        Self {
            deployer,
            operators,
            partitions: default_partition_labels(),
            initial_supply,
        }
    }

    pub fn from_toml_str(content: &str) -> ManaResult<Self> {
        toml::from_str(content)
            .map_err(|e| ManaError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    pub fn from_json_str(content: &str) -> ManaResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ManaError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Load from a `.toml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> ManaResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ManaError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            Some("toml") => Self::from_toml_str(&content)?,
            other => {
                return Err(ManaError::InvalidConfig(format!(
                    "Unsupported configuration format: {:?}",
                    other
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ManaResult<String> {
        toml::to_string(self)
            .map_err(|e| ManaError::InvalidConfig(format!("Failed to encode TOML: {}", e)))
    }

    /// Partition identifiers in configuration order
    pub fn partition_ids(&self) -> Vec<PartitionId> {
        self.partitions
            .iter()
            .map(|label| PartitionId::from_label(label))
            .collect()
    }

    pub fn validate(&self) -> ManaResult<()> {
        if self.deployer.is_zero() {
            return Err(ManaError::InvalidConfig(
                "deployer cannot be the zero address".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for operator in &self.operators {
            if operator.is_zero() {
                return Err(ManaError::InvalidConfig(
                    "operator cannot be the zero address".to_string(),
                ));
            }
            if !seen.insert(operator) {
                return Err(ManaError::InvalidConfig(format!(
                    "duplicate operator {}",
                    operator
                )));
            }
        }

        if self.partitions.is_empty() {
            return Err(ManaError::InvalidConfig(
                "at least one partition is required".to_string(),
            ));
        }
        let labels: HashSet<&str> = self.partitions.iter().map(String::as_str).collect();
        if labels.len() != self.partitions.len() {
            return Err(ManaError::InvalidConfig(
                "duplicate partition label".to_string(),
            ));
        }
        for required in [COLLATERALIZED_LABEL, UNCOLLATERALIZED_LABEL] {
            if !labels.contains(required) {
                return Err(ManaError::InvalidConfig(format!(
                    "partition \"{}\" is required by the conversion engine",
                    required
                )));
            }
        }

        if self.initial_supply == 0 {
            return Err(ManaError::InvalidConfig(
                "initial supply must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Amounts exceed the integer range of TOML, so they travel as decimal
/// strings. Native integers are accepted up to whatever width the format
/// reports; JSON numbers beyond `u64` reach serde as floats and are rejected
/// instead of being rounded.
mod amount_format {
    use lib_types::Amount;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Amount, E> {
            Ok(Amount::from(value))
        }

        fn visit_u128<E: de::Error>(self, value: u128) -> Result<Amount, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Amount, E> {
            Amount::try_from(value)
                .map_err(|_| E::custom(format!("amount cannot be negative: {}", value)))
        }

        fn visit_i128<E: de::Error>(self, value: i128) -> Result<Amount, E> {
            Amount::try_from(value)
                .map_err(|_| E::custom(format!("amount cannot be negative: {}", value)))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Amount, E> {
            Err(E::custom(format!(
                "amount {} is not an exact integer; write large amounts as decimal strings",
                value
            )))
        }

        fn visit_str<E: de::Error>(self, text: &str) -> Result<Amount, E> {
            text.trim()
                .replace('_', "")
                .parse::<Amount>()
                .map_err(|e| E::custom(format!("invalid amount {:?}: {}", text, e)))
        }
    }
}
