use std::collections::HashMap;
use std::sync::LazyLock;

/// Etherscan v2 multichain endpoint; the chain is picked with `chainid`
pub const DEFAULT_EXPLORER_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Configuration for a supported chain
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: &'static str,
    /// Infura network slug, for chains Infura serves
    pub infura_network: Option<&'static str>,
    pub rpcs: Vec<&'static str>,
    pub block_explorer: &'static str,
}

impl ChainConfig {
    /// Get the first available RPC URL
    pub fn primary_rpc(&self) -> Option<&str> {
        self.rpcs.first().copied()
    }

    fn rpc_env_key(&self) -> String {
        format!("RPC_URL_{}", self.name.to_uppercase().replace('-', "_"))
    }
}

/// Static registry of all supported chains
pub static CHAINS: LazyLock<HashMap<u64, ChainConfig>> = LazyLock::new(|| {
    let chains = vec![
        // ===== MAINNETS =====
        ChainConfig {
            chain_id: 1,
            name: "ethereum",
            infura_network: Some("mainnet"),
            rpcs: vec![
                "https://eth.llamarpc.com",
                "https://ethereum.publicnode.com",
                "https://rpc.ankr.com/eth",
                "https://eth.drpc.org",
            ],
            block_explorer: "https://etherscan.io",
        },
        ChainConfig {
            chain_id: 8453,
            name: "base",
            infura_network: Some("base-mainnet"),
            rpcs: vec![
                "https://mainnet.base.org",
                "https://base.llamarpc.com",
                "https://base.drpc.org",
            ],
            block_explorer: "https://basescan.org",
        },
        ChainConfig {
            chain_id: 56,
            name: "bsc",
            infura_network: None,
            rpcs: vec![
                "https://bsc-dataseed.bnbchain.org",
                "https://bsc.publicnode.com",
                "https://bsc.drpc.org",
            ],
            block_explorer: "https://bscscan.com",
        },
        ChainConfig {
            chain_id: 42161,
            name: "arbitrum",
            infura_network: Some("arbitrum-mainnet"),
            rpcs: vec![
                "https://arb1.arbitrum.io/rpc",
                "https://arbitrum.publicnode.com",
            ],
            block_explorer: "https://arbiscan.io",
        },
        ChainConfig {
            chain_id: 137,
            name: "polygon",
            infura_network: Some("polygon-mainnet"),
            rpcs: vec![
                "https://polygon-rpc.com",
                "https://polygon-bor.publicnode.com",
            ],
            block_explorer: "https://polygonscan.com",
        },
        // ===== TESTNETS =====
        ChainConfig {
            chain_id: 11155111,
            name: "sepolia",
            infura_network: Some("sepolia"),
            rpcs: vec![
                "https://sepolia.drpc.org",
                "https://ethereum-sepolia.publicnode.com",
                "https://rpc.ankr.com/eth_sepolia",
            ],
            block_explorer: "https://sepolia.etherscan.io",
        },
        ChainConfig {
            chain_id: 84532,
            name: "base-sepolia",
            infura_network: Some("base-sepolia"),
            rpcs: vec![
                "https://sepolia.base.org",
                "https://base-sepolia.drpc.org",
            ],
            block_explorer: "https://sepolia.basescan.org",
        },
    ];

    chains.into_iter().map(|c| (c.chain_id, c)).collect()
});

/// Get chain config by chain ID
pub fn get_chain(chain_id: u64) -> Option<&'static ChainConfig> {
    CHAINS.get(&chain_id)
}

/// List all supported chain IDs
pub fn supported_chain_ids() -> Vec<u64> {
    let mut ids: Vec<u64> = CHAINS.keys().copied().collect();
    ids.sort_unstable();
    ids
}

/// All RPC URLs for a chain, in failover order.
///
/// `RPC_URL_{CHAIN_NAME}` comes first when set, then Infura when a project id
/// is given and the chain is on Infura, then the public defaults.
pub fn get_all_rpcs(chain_id: u64, infura_project_id: Option<&str>) -> Vec<String> {
    let Some(chain) = get_chain(chain_id) else {
        return vec![];
    };

    let mut rpcs = Vec::new();

    if let Ok(url) = std::env::var(chain.rpc_env_key()) {
        rpcs.push(url);
    }

    if let (Some(network), Some(project_id)) = (chain.infura_network, infura_project_id) {
        rpcs.push(format!("https://{}.infura.io/v3/{}", network, project_id));
    }

    rpcs.extend(chain.rpcs.iter().map(|s| s.to_string()));

    rpcs
}
