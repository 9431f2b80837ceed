#![allow(clippy::too_many_arguments)]
use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::Arguments,
    bitcoin::{
        Address, Amount, Block, BlockHash, CompactTarget, Network, OutPoint, ScriptBuf, Sequence,
        Target, Transaction, TxIn, TxMerkleNode, TxOut, Txid, VarInt, Witness,
        address::NetworkUnchecked,
        block::{self, Header},
        consensus::{self, Decodable, Encodable},
        hashes::{Hash, sha256d},
        locktime::absolute::LockTime,
        script::write_scriptint,
    },
    bitcoind_async_client::{Auth, Client as BitcoinRpcClient, traits::Reader},
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    chain::Chain,
    clap::{Args, Parser},
    coinbase_builder::CoinbaseBuilder,
    dashmap::DashMap,
    decay::DecayingAverage,
    derive_more::Display,
    extranonces::Extranonces,
    futures::stream::StreamExt,
    generator::Generator,
    hash_rate::HashRate,
    hex::FromHex,
    job::Job,
    jobs::Jobs,
    lru::LruCache,
    metatron::Metatron,
    parking_lot::Mutex,
    rand::Rng,
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::{Value, json},
    serde_with::{DeserializeFromStr, SerializeDisplay},
    settings::{PoolOptions, Settings},
    std::{
        collections::{BTreeMap, HashMap, VecDeque},
        convert::Infallible,
        env,
        fmt::{self, Display, Formatter},
        io,
        net::SocketAddr,
        num::NonZeroUsize,
        ops::{Add, AddAssign, BitAnd, BitOr, BitXor, Div, Mul, Not, Sub, SubAssign},
        path::PathBuf,
        process,
        str::FromStr,
        sync::{
            Arc, LazyLock,
            atomic::{AtomicU64, Ordering},
        },
        time::{Duration, Instant, SystemTime, UNIX_EPOCH},
    },
    stratifier::{SessionSnapshot, Stratifier},
    stratum::{
        Authorize, Configure, Extranonce, Id, InternalError, JobId, JsonRpcError, MerkleNode,
        Message, Nbits, Notify, Ntime, PrevHash, SetDifficulty, StratumErrorCode, Submit, Subscribe,
        SubscribeResult, SuggestDifficulty, Username, Version, merkle_branches, merkle_root,
    },
    tokio::{
        net::{TcpListener, TcpStream, tcp::{OwnedReadHalf, OwnedWriteHalf}},
        signal::ctrl_c,
        sync::watch,
        task::JoinSet,
        time::{sleep, timeout},
    },
    tokio_util::{
        codec::{FramedRead, FramedWrite, LinesCodec},
        sync::CancellationToken,
    },
    tracing::{debug, error, info, warn},
    tracing_subscriber::EnvFilter,
    block_template::BlockTemplate,
    vardiff::Vardiff,
    zeromq::{Endpoint, SubSocket},
};

mod arguments;
mod block_template;
mod chain;
pub mod coinbase_builder;
mod decay;
mod extranonces;
mod generator;
mod hash_rate;
mod job;
mod jobs;
mod metatron;
mod settings;
pub mod stratifier;
pub mod stratum;
pub mod subcommand;
mod vardiff;
mod workbase;
mod zmq;

use difficulty::Difficulty;
pub use stratum::difficulty;

/// Bounds every `enonce1`/`enonce2` configuration: below 2 bytes the search
/// space is too small to be useful, above 8 it no longer fits a `u64`
/// counter.
pub(crate) const MIN_ENONCE_SIZE: usize = 2;
pub(crate) const MAX_ENONCE_SIZE: usize = 8;
pub(crate) const ENONCE1_SIZE: usize = 4;

/// How many recently-seen block hashes `Jobs` remembers, to recognize a
/// `clean_jobs` boundary even across a brief reordering of template updates.
pub(crate) const LRU_CACHE_SIZE: usize = 32;

/// Maximum length of a single Stratum line, generous enough for a `notify`
/// carrying a coinbase transaction plus merkle branches.
pub(crate) const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// A share's `ntime` may drift this far from the job's `ntime` before it's
/// rejected as out of range.
pub(crate) const MAX_NTIME_OFFSET: u32 = 7200;

/// Subscription id returned in `mining.subscribe`'s first extranonce1
/// subscription tuple entry.
pub(crate) const SUBSCRIPTION_ID: &str = "ae6812eb4cd7735a302a8a9dd95cf71f";

/// How long an allocated `enonce1` stays reclaimable after a disconnect, so
/// a miner that reconnects quickly can resume its session via
/// `mining.subscribe`'s extranonce1 argument.
pub(crate) const SESSION_TTL: Duration = Duration::from_secs(600);

pub const COIN_VALUE: u64 = 100_000_000;
pub const USER_AGENT: &str = "paraminer/0.0.1";

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Arguments::parse();
    let cancel_token = CancellationToken::new();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err}");
            process::exit(1);
        }
    };

    let result = runtime.block_on(async move {
        let run_cancel_token = cancel_token.clone();

        tokio::spawn(async move {
            let _ = ctrl_c().await;
            info!("Received shutdown signal");
            cancel_token.cancel();
        });

        args.run(run_cancel_token).await
    });

    match result {
        Err(err) => {
            error!("error: {err}");

            if env::var_os("RUST_BACKTRACE")
                .map(|val| val == "1")
                .unwrap_or_default()
            {
                error!("{}", err.backtrace());
            }
            process::exit(1);
        }
        Ok(_) => {
            process::exit(0);
        }
    }
}
