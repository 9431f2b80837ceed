use {
    super::*,
    stats::Stats,
    worker::Worker,
};

pub(crate) mod stats;
pub(crate) mod worker;

/// Per-pool registry: connection count, the per-worker hashrate/share
/// accounting, and the enonce1 allocator shared by every `Stratifier`.
pub(crate) struct Metatron {
    extranonces: Extranonces,
    enonce1_counter: AtomicU64,
    connections: AtomicU64,
    blocks: AtomicU64,
    workers: DashMap<(Address, String), Arc<Worker>>,
    sessions: DashMap<Extranonce, SessionSnapshot>,
    session_ttl: Duration,
    started: Instant,
}

impl Metatron {
    pub(crate) fn new(extranonces: Extranonces, session_ttl: Duration) -> Self {
        Self {
            extranonces,
            enonce1_counter: AtomicU64::new(0),
            connections: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            workers: DashMap::new(),
            sessions: DashMap::new(),
            session_ttl,
            started: Instant::now(),
        }
    }

    pub(crate) fn extranonces(&self) -> &Extranonces {
        &self.extranonces
    }

    pub(crate) fn enonce2_size(&self) -> usize {
        self.extranonces.enonce2_size()
    }

    /// Allocates a fresh, never-reused enonce1 by extending a monotonic
    /// counter into the pool's enonce1 space.
    pub(crate) fn next_enonce1(&self) -> Extranonce {
        let id = self.enonce1_counter.fetch_add(1, Ordering::Relaxed);
        Extranonce::from_bytes(&counter_bytes(id, self.extranonces.enonce1_size()))
    }

    pub(crate) fn take_session(&self, enonce1: &Extranonce) -> Option<SessionSnapshot> {
        let (_, snapshot) = self.sessions.remove(enonce1)?;
        if snapshot.is_expired(self.session_ttl) {
            None
        } else {
            Some(snapshot)
        }
    }

    pub(crate) fn store_session(&self, snapshot: SessionSnapshot) {
        self.sessions.insert(snapshot.enonce1.clone(), snapshot);
    }

    pub(crate) fn get_or_create_worker(&self, address: Address, workername: &str) -> Arc<Worker> {
        self.workers
            .entry((address, workername.to_string()))
            .or_insert_with(|| Arc::new(Worker::new(workername.to_string())))
            .clone()
    }

    pub(crate) fn add_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sub_connection(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn total_connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub(crate) fn add_block(&self) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn total_blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub(crate) fn total_workers(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn hash_rate_5m(&self) -> HashRate {
        self.workers
            .iter()
            .map(|w| w.hashrate_5m())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Truncates a counter to its low `size` bytes (big-endian), the smallest
/// slice that still grows monotonically as the counter increments.
fn counter_bytes(id: u64, size: usize) -> Vec<u8> {
    let full = id.to_be_bytes();
    full[full.len().saturating_sub(size)..].to_vec()
}
