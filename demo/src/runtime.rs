//! Wiring shared by every demo command.

use std::{path::Path, sync::Arc};

use tracing::info;

use atrian_adapter::{AdapterConfig, OperationAdapter};
use atrian_compass::{EthicalCompass, RuleStore};
use atrian_contracts::error::AtrianResult;
use atrian_weaver::{InMemoryTrustLedger, LedgerConfig};

const DEFAULT_RULES: &str = include_str!("../rules/ethics_rules.yaml");
const DEFAULT_ADAPTER_CONFIG: &str = include_str!("../config/adapter.toml");

pub struct Runtime {
    pub rules: RuleStore,
    pub compass: Arc<EthicalCompass>,
    pub ledger: Arc<InMemoryTrustLedger>,
    pub adapter: OperationAdapter,
}

impl Runtime {
    /// Build the runtime from the bundled rules and config, or from the
    /// given files when present.
    pub fn new(rules_path: Option<&Path>, config_path: Option<&Path>) -> AtrianResult<Self> {
        let rules = match rules_path {
            Some(path) => RuleStore::load(path),
            None => RuleStore::from_yaml_str("rules/ethics_rules.yaml", DEFAULT_RULES),
        };
        let config = match config_path {
            Some(path) => AdapterConfig::load_or_default(path),
            None => AdapterConfig::from_toml_str(DEFAULT_ADAPTER_CONFIG)?,
        };

        let compass = Arc::new(EthicalCompass::from_store(&rules));
        let ledger = Arc::new(
            InMemoryTrustLedger::new(LedgerConfig::default())
                .with_baselines(rules.rules().trust_baselines.clone()),
        );
        let adapter = OperationAdapter::new(config, compass.clone(), ledger.clone());

        info!(
            ethics_rules = compass.rule_count(),
            trust_baselines = rules.rules().trust_baselines.len(),
            "runtime ready"
        );

        Ok(Self {
            rules,
            compass,
            ledger,
            adapter,
        })
    }
}
