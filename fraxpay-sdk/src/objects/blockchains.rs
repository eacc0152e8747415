use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// EVM chains the checkout knows contract addresses for.
pub enum Blockchain {
    #[serde(rename = "eth")]
    Ethereum,
    #[serde(rename = "op")]
    Optimism,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "arb")]
    ArbitrumOne,
    #[serde(rename = "polygon")]
    Polygon,
}

impl Blockchain {
    /// EIP-155 chain id.
    pub fn chain_id(self) -> u64 {
        match self {
            Blockchain::Ethereum => 1,
            Blockchain::Optimism => 10,
            Blockchain::Base => 8453,
            Blockchain::ArbitrumOne => 42161,
            Blockchain::Polygon => 137,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        [
            Blockchain::Ethereum,
            Blockchain::Optimism,
            Blockchain::Base,
            Blockchain::ArbitrumOne,
            Blockchain::Polygon,
        ]
        .into_iter()
        .find(|chain| chain.chain_id() == chain_id)
    }
}

impl std::fmt::Display for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Blockchain::Ethereum => write!(f, "Ethereum"),
            Blockchain::Optimism => write!(f, "Optimism"),
            Blockchain::Base => write!(f, "Base"),
            Blockchain::ArbitrumOne => write!(f, "Arbitrum One"),
            Blockchain::Polygon => write!(f, "Polygon"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Stablecoins accepted by the payment contract.
#[serde(rename_all = "UPPERCASE")]
pub enum Stablecoin {
    Frax,
}

impl Stablecoin {
    /// Token decimals as declared by the contract.
    pub fn decimals(self) -> u32 {
        match self {
            Stablecoin::Frax => 18,
        }
    }

    /// Canonical token contract on `chain`, if deployed there.
    pub fn contract_address(self, chain: Blockchain) -> Option<Address> {
        match (self, chain) {
            (Stablecoin::Frax, Blockchain::Ethereum) => {
                Some(address!("0x853d955aCEf822Db058eb8505911ED77F175b99e"))
            }
            (Stablecoin::Frax, Blockchain::Optimism) => {
                Some(address!("0x2E3D870790dC77A83DD1d18184Acc7439A53f475"))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_lookup() {
        assert_eq!(Blockchain::from_chain_id(10), Some(Blockchain::Optimism));
        assert_eq!(Blockchain::from_chain_id(31337), None);
        assert!(Stablecoin::Frax.contract_address(Blockchain::Optimism).is_some());
        assert!(Stablecoin::Frax.contract_address(Blockchain::Base).is_none());
    }
}
