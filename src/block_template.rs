use super::*;

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub(crate) struct BlockTemplate {
    pub(crate) bits: Nbits,
    #[serde(rename = "previousblockhash")]
    pub(crate) previous_block_hash: BlockHash,
    #[serde(rename = "curtime", deserialize_with = "ntime_from_u64")]
    pub(crate) current_time: Ntime,
    pub(crate) height: u64,
    #[serde(deserialize_with = "version_from_i32")]
    pub(crate) version: Version,
    pub(crate) transactions: Vec<TemplateTransaction>,
    #[serde(with = "bitcoin::script::ScriptBuf", default)]
    pub(crate) default_witness_commitment: ScriptBuf,
    pub(crate) coinbaseaux: BTreeMap<String, String>,
    #[serde(
        rename = "coinbasevalue",
        with = "bitcoin::amount::serde::as_sat",
        default
    )]
    pub(crate) coinbase_value: Amount,
    /// Left-leaf-only merkle branches computed once from `transactions`,
    /// reused on every `create_job` call instead of recomputed per miner.
    #[serde(skip)]
    pub(crate) merkle_branches: Vec<MerkleNode>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub(crate) struct TemplateTransaction {
    pub(crate) txid: Txid,
    #[serde(rename = "data", deserialize_with = "tx_from_hex")]
    pub(crate) transaction: Transaction,
}

impl BlockTemplate {
    pub(crate) fn with_merkle_branches(mut self) -> Self {
        let txids = self.transactions.iter().map(|tx| tx.txid).collect();
        self.merkle_branches = stratum::merkle_branches(txids);
        self
    }
}

impl Default for BlockTemplate {
    fn default() -> Self {
        Self {
            bits: Nbits::from(CompactTarget::from_consensus(0x1d00ffff)),
            previous_block_hash: BlockHash::all_zeros(),
            current_time: Ntime(0),
            height: 0,
            version: Version(block::Version::TWO),
            transactions: Vec::new(),
            default_witness_commitment: ScriptBuf::new(),
            coinbaseaux: BTreeMap::new(),
            coinbase_value: Amount::ZERO,
            merkle_branches: Vec::new(),
        }
    }
}

fn version_from_i32<'de, D>(d: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let x = i32::deserialize(d)?;
    Ok(Version::from(x))
}

fn tx_from_hex<'de, D>(d: D) -> Result<Transaction, D::Error>
where
    D: Deserializer<'de>,
{
    let s = <&str>::deserialize(d)?;
    consensus::encode::deserialize_hex(s).map_err(de::Error::custom)
}

fn ntime_from_u64<'de, D>(d: D) -> Result<Ntime, D::Error>
where
    D: Deserializer<'de>,
{
    let v = u64::deserialize(d)?;
    Ntime::try_from(v).map_err(de::Error::custom)
}
