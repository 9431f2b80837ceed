use super::*;

#[derive(Debug)]
pub(crate) struct Jobs {
    latest: Option<Arc<Job>>,
    next_id: JobId,
    seen: LruCache<BlockHash, ()>,
    valid: HashMap<JobId, Arc<Job>>,
}

impl Jobs {
    pub(crate) fn new() -> Self {
        Self {
            next_id: JobId::new(0),
            valid: HashMap::new(),
            latest: None,
            seen: LruCache::new(NonZeroUsize::new(LRU_CACHE_SIZE).expect("should be non-zero")),
        }
    }

    pub(crate) fn next_id(&mut self) -> JobId {
        let id = self.next_id;
        self.next_id = self.next_id.next();
        id
    }

    pub(crate) fn get(&self, id: &JobId) -> Option<Arc<Job>> {
        self.valid.get(id).cloned()
    }

    pub(crate) fn insert(&mut self, job: Arc<Job>) -> bool {
        let prev = self.latest.as_ref().map(|j| j.workbase.as_ref());
        let clean = job.workbase.clean_jobs(prev);

        self.latest = Some(job.clone());

        if clean {
            self.seen.clear();
            self.valid.clear();
        }

        self.valid.insert(job.job_id, job);
        clean
    }

    /// Inserts `job` as a `clean_jobs = true` job regardless of whether its
    /// workbase actually changed, discarding the duplicate-share cache and
    /// every previously-valid job id. Used when a difficulty change forces
    /// every miner to restart on a fresh job even though the template is
    /// unchanged.
    pub(crate) fn insert_forcing_clean(&mut self, job: Arc<Job>) {
        self.seen.clear();
        self.valid.clear();

        self.latest = Some(job.clone());
        self.valid.insert(job.job_id, job);
    }

    pub(crate) fn is_duplicate(&mut self, block_hash: BlockHash) -> bool {
        self.seen.put(block_hash, ()).is_some()
    }
}
