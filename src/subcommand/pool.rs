use super::*;

#[derive(Parser, Debug)]
pub(crate) struct Pool {
    #[command(flatten)]
    pub(crate) options: PoolOptions,
}

impl Pool {
    pub(crate) async fn run(self, cancel_token: CancellationToken) -> Result {
        let mut tasks = JoinSet::new();

        let settings = Arc::new(
            Settings::from_pool_options(self.options).context("failed to create settings")?,
        );

        let generator = Generator::new(settings.clone())
            .await
            .context("failed to connect to Bitcoin Core")?;

        let bitcoin_rpc = generator.bitcoin_rpc_client();

        let workbase_rx = generator
            .spawn(cancel_token.clone(), &mut tasks)
            .await
            .context("failed to fetch initial block template")?;

        let extranonces = Extranonces::new(settings.enonce1_size(), settings.enonce2_size())
            .context("invalid extranonce configuration")?;

        let metatron = Arc::new(Metatron::new(extranonces, SESSION_TTL));

        let address = settings.address().to_string();
        let port = settings.port();

        let listener = TcpListener::bind((address.as_str(), port))
            .await
            .with_context(|| format!("failed to bind to {address}:{port}"))?;

        info!("Stratum server listening on {address}:{port}");

        if let Some(high_diff_port) = settings.high_diff_port() {
            let high_diff_settings = Arc::new(settings.for_high_diff_port());
            let high_diff_listener = TcpListener::bind((address.as_str(), high_diff_port))
                .await
                .with_context(|| format!("failed to bind high-diff port {address}:{high_diff_port}"))?;

            info!("High-difficulty Stratum port listening on {address}:{high_diff_port}");

            spawn_accept_loop(
                high_diff_listener,
                high_diff_settings,
                metatron.clone(),
                workbase_rx.clone(),
                bitcoin_rpc.clone(),
                cancel_token.clone(),
                &mut tasks,
            );
        }

        spawn_accept_loop(
            listener,
            settings,
            metatron,
            workbase_rx,
            bitcoin_rpc,
            cancel_token.clone(),
            &mut tasks,
        );

        cancel_token.cancelled().await;
        info!("Shutting down stratum server");

        info!("Waiting for {} tasks to complete...", tasks.len());
        while tasks.join_next().await.is_some() {}
        info!("All pool tasks stopped");

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_accept_loop(
    listener: TcpListener,
    settings: Arc<Settings>,
    metatron: Arc<Metatron>,
    workbase_rx: watch::Receiver<Arc<BlockTemplate>>,
    bitcoin_rpc: Arc<BitcoinRpcClient>,
    cancel_token: CancellationToken,
    tasks: &mut JoinSet<()>,
) {
    tasks.spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let Ok((stream, addr)) = accepted else {
                        warn!("Failed to accept connection: {:?}", accepted.err());
                        continue;
                    };

                    info!("Spawning stratifier task for {addr}");

                    let settings = settings.clone();
                    let metatron = metatron.clone();
                    let workbase_rx = workbase_rx.clone();
                    let bitcoin_rpc = bitcoin_rpc.clone();
                    let conn_cancel_token = cancel_token.child_token();

                    tokio::spawn(async move {
                        let mut stratifier = Stratifier::new(
                            addr,
                            settings,
                            metatron,
                            stream,
                            workbase_rx,
                            conn_cancel_token,
                            Some(bitcoin_rpc),
                        );

                        if let Err(err) = stratifier.serve().await {
                            error!("Stratifier error for {addr}: {err}");
                        }
                    });
                }
                _ = cancel_token.cancelled() => {
                    info!("Shutting down accept loop on {}", listener.local_addr().map(|a| a.to_string()).unwrap_or_default());
                    break;
                }
            }
        }
    });
}
