use super::*;

#[derive(Clone, Debug, Parser)]
pub(crate) struct PoolOptions {
    #[command(flatten)]
    pub(crate) common: CommonOptions,

    #[arg(long, help = "Block template update interval in seconds.", default_value_t = 10)]
    pub(crate) update_interval: u64,

    #[arg(long, help = "Use version rolling with <VERSION_MASK>.", default_value = "1fffe000")]
    pub(crate) version_mask: Version,

    #[arg(
        long,
        default_value = "tcp://127.0.0.1:28332",
        help = "Subscribe to <ZMQ_BLOCK_NOTIFICATIONS>."
    )]
    pub(crate) zmq_block_notifications: Endpoint,

    #[arg(
        long,
        default_value_t = ENONCE1_SIZE,
        help = "Set enonce1 size in bytes (2-8)."
    )]
    pub(crate) enonce1_size: usize,

    #[arg(
        long,
        default_value_t = MAX_ENONCE_SIZE,
        help = "Set enonce2 size in bytes (2-8)."
    )]
    pub(crate) enonce2_size: usize,

    #[arg(long, help = "Disable bouncer.")]
    pub(crate) disable_bouncer: bool,
}
