use super::*;

/// A job is a block template plus the per-connection coinbase split built
/// from it: a specific `enonce1`, extension bits, and the id a miner will
/// echo back in `mining.submit`.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) job_id: JobId,
    pub(crate) coinb1: String,
    pub(crate) coinb2: String,
    pub(crate) enonce1: Extranonce,
    pub(crate) version_mask: Option<Version>,
    pub(crate) workbase: Arc<BlockTemplate>,
}

impl Job {
    pub(crate) fn prevhash(&self) -> PrevHash {
        self.workbase.prevhash()
    }

    pub(crate) fn merkle_branches(&self) -> &[MerkleNode] {
        self.workbase.merkle_branches()
    }

    pub(crate) fn version(&self) -> Version {
        self.workbase.version()
    }

    pub(crate) fn nbits(&self) -> Nbits {
        self.workbase.nbits()
    }

    pub(crate) fn ntime(&self) -> Ntime {
        self.workbase.ntime()
    }

    pub(crate) fn notify(&self, clean_jobs: bool) -> Result<Notify> {
        Ok(Notify {
            job_id: self.job_id,
            prevhash: self.prevhash(),
            coinb1: self.coinb1.clone(),
            coinb2: self.coinb2.clone(),
            merkle_branches: self.merkle_branches().to_vec(),
            version: self.version(),
            nbits: self.nbits(),
            ntime: self.ntime(),
            clean_jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_workbase(job_id: JobId) -> Arc<BlockTemplate> {
        Arc::new(BlockTemplate {
            bits: "1c2ac4af".parse().unwrap(),
            previous_block_hash: "4d16b6f85af6e2198f44ae2a6de67f78487ae5611b77c6c0440b921e00000000"
                .parse::<PrevHash>()
                .unwrap()
                .into(),
            current_time: "504e86b9".parse().unwrap(),
            height: job_id.into(),
            ..Default::default()
        })
    }

    fn sample_job(job_id: JobId) -> Job {
        let workbase = sample_workbase(job_id);
        Job {
            job_id,
            coinb1: "coinb1prefix".into(),
            coinb2: "coinb2suffix".into(),
            enonce1: Extranonce::generate(4),
            version_mask: None,
            workbase,
        }
    }

    #[test]
    fn accessors_delegate_to_workbase() {
        let job = sample_job(JobId::new(7));
        assert_eq!(job.prevhash(), job.workbase.prevhash());
        assert_eq!(job.version(), job.workbase.version());
        assert_eq!(job.nbits(), job.workbase.nbits());
        assert_eq!(job.ntime(), job.workbase.ntime());
        assert_eq!(job.merkle_branches(), job.workbase.merkle_branches());
    }

    #[test]
    fn notify_carries_job_identity_and_clean_flag() {
        let job = sample_job(JobId::new(9));

        let built = job.notify(false).unwrap();
        assert_eq!(built.job_id, job.job_id);
        assert_eq!(built.clean_jobs, false);
        assert_eq!(built.coinb1, job.coinb1);
        assert_eq!(built.coinb2, job.coinb2);
    }
}
