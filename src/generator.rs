use super::*;

/// How long a single `getblocktemplate` RPC is allowed to take before the
/// caller gives up and falls back to whatever template it already has.
const TEMPLATE_RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls Bitcoin Core for a fresh block template on a fixed interval, and
/// immediately on a ZMQ `hashblock` notification, publishing each template
/// to every `Stratifier` via a `watch` channel.
pub(crate) struct Generator {
    bitcoin_rpc_client: Arc<BitcoinRpcClient>,
    settings: Arc<Settings>,
    cancel_token: CancellationToken,
}

impl Generator {
    pub(crate) async fn new(settings: Arc<Settings>) -> Result<Self> {
        let bitcoin_rpc_client = Arc::new(settings.bitcoin_rpc_client().await?);

        Ok(Self {
            bitcoin_rpc_client,
            settings,
            cancel_token: CancellationToken::new(),
        })
    }

    pub(crate) fn bitcoin_rpc_client(&self) -> Arc<BitcoinRpcClient> {
        self.bitcoin_rpc_client.clone()
    }

    pub(crate) async fn spawn(
        self,
        cancel_token: CancellationToken,
        tasks: &mut JoinSet<()>,
    ) -> Result<watch::Receiver<Arc<BlockTemplate>>> {
        let initial = get_block_template(&self.bitcoin_rpc_client, &self.settings).await?;

        let (sender, receiver) = watch::channel(Arc::new(initial));

        let bitcoin_rpc_client = self.bitcoin_rpc_client.clone();
        let settings = self.settings.clone();
        let update_interval = settings.update_interval();

        let mut zmq = Zmq::connect(settings.clone()).await.ok();

        tasks.spawn(async move {
            let mut interval = tokio::time::interval(update_interval);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        info!("Shutting down block template generator");
                        break;
                    }
                    _ = interval.tick() => {}
                    blockhash = async {
                        match &mut zmq {
                            Some(zmq) => zmq.recv_blockhash().await,
                            None => std::future::pending().await,
                        }
                    } => {
                        match blockhash {
                            Ok(blockhash) => info!("New block {blockhash} via ZMQ, refreshing template"),
                            Err(err) => {
                                warn!("ZMQ hashblock stream failed, disabling fast refresh: {err}");
                                zmq = None;
                                continue;
                            }
                        }
                    }
                }

                apply_template_update(
                    &sender,
                    get_block_template(&bitcoin_rpc_client, &settings).await,
                );
            }
        });

        Ok(receiver)
    }
}

/// Publishes a freshly fetched template to `sender`, or leaves the
/// previously published template in place if the fetch failed. Returns
/// whether the template was replaced, so a failed Bitcoin Core RPC (a
/// timeout, a dropped connection, Core still warming up) never tears down
/// the broadcaster or starves connected clients of their current job.
fn apply_template_update(
    sender: &watch::Sender<Arc<BlockTemplate>>,
    result: Result<BlockTemplate>,
) -> bool {
    match result {
        Ok(template) => {
            sender.send_replace(Arc::new(template));
            true
        }
        Err(err) => {
            warn!("Failed to fetch block template: {err}");
            false
        }
    }
}

async fn get_block_template(
    bitcoin_rpc_client: &BitcoinRpcClient,
    settings: &Settings,
) -> Result<BlockTemplate> {
    debug!("Fetching new block template");

    let mut rules = vec!["segwit"];
    if settings.chain().network() == Network::Signet {
        rules.push("signet");
    }

    let params = json!({
        "capabilities": ["coinbasetxn", "workid", "coinbase/append"],
        "rules": rules,
    });

    let template = timeout(
        TEMPLATE_RPC_TIMEOUT,
        bitcoin_rpc_client.call::<BlockTemplate>("getblocktemplate", &[params]),
    )
    .await
    .context("timed out waiting for block template from Bitcoin Core")?
    .context("failed to fetch block template")?;

    Ok(template.with_merkle_branches())
}
