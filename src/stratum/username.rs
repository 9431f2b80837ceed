use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.trim_matches('"')
    }

    pub fn workername(&self) -> &str {
        self.as_str().split('.').nth(1).unwrap_or("")
    }

    fn address_str(&self) -> Option<&str> {
        self.as_str().split('.').next()
    }

    pub fn parse_address(&self) -> std::result::Result<Address<NetworkUnchecked>, InternalError> {
        let address_str = self.address_str().ok_or(InternalError::EmptyUsername)?;
        Address::from_str(address_str).map_err(|source| InternalError::InvalidAddress { source })
    }

    pub fn parse_with_network(&self, network: Network) -> Result<Address, InternalError> {
        self.parse_address()?
            .require_network(network)
            .map_err(|_| InternalError::NetworkMismatch {
                expected: network,
                address: self.parse_address().unwrap().assume_checked().to_string(),
            })
    }

    pub fn infer_network(&self) -> Result<Network, InternalError> {
        let unchecked = self.parse_address()?;

        const NETWORKS: &[Network] = &[
            Network::Bitcoin,
            Network::Testnet4,
            Network::Testnet,
            Network::Signet,
            Network::Regtest,
        ];

        for &network in NETWORKS {
            if unchecked.clone().require_network(network).is_ok() {
                return Ok(network);
            }
        }

        Err(InternalError::UnknownNetwork)
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for Username {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
