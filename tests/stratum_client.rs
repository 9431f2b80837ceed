use super::*;

pub(crate) enum Event {
    SetDifficulty(stratum::Difficulty),
    Notify(stratum::Notify),
}

/// Hand-rolled line-based JSON-RPC client for driving the pool's Stratum
/// socket directly in tests, without going through a miner implementation.
pub(crate) struct StratumTestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u64,
    pending: VecDeque<Event>,
}

impl StratumTestClient {
    pub(crate) async fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();

        Self {
            reader: BufReader::new(reader),
            writer,
            next_id: 0,
            pending: VecDeque::new(),
        }
    }

    async fn read_message(&mut self) -> stratum::Message {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line).await.unwrap();
        assert!(bytes > 0, "pool closed the connection unexpectedly");
        serde_json::from_str(&line).unwrap_or_else(|err| panic!("invalid message {line:?}: {err}"))
    }

    fn queue_notification(&mut self, method: String, params: serde_json::Value) {
        match method.as_str() {
            "mining.set_difficulty" => {
                let set_difficulty: stratum::SetDifficulty = serde_json::from_value(params)
                    .expect("malformed mining.set_difficulty params");
                self.pending
                    .push_back(Event::SetDifficulty(set_difficulty.difficulty()));
            }
            "mining.notify" => {
                let notify: stratum::Notify =
                    serde_json::from_value(params).expect("malformed mining.notify params");
                self.pending.push_back(Event::Notify(notify));
            }
            other => panic!("unexpected notification: {other}"),
        }
    }

    pub(crate) async fn recv_event(&mut self) -> Event {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }

        loop {
            if let stratum::Message::Notification { method, params } = self.read_message().await {
                self.queue_notification(method, params);
            }

            if let Some(event) = self.pending.pop_front() {
                return event;
            }
        }
    }

    async fn call(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, stratum::JsonRpcError> {
        let id = stratum::Id::Number(self.next_id);
        self.next_id += 1;

        let mut line = serde_json::to_string(&stratum::Message::Request {
            id: id.clone(),
            method: method.to_string(),
            params,
        })
        .unwrap();
        line.push('\n');

        self.writer.write_all(line.as_bytes()).await.unwrap();

        loop {
            match self.read_message().await {
                stratum::Message::Response {
                    id: response_id,
                    result,
                    error,
                    ..
                } if response_id == id => {
                    return match error {
                        Some(err) => Err(err),
                        None => Ok(result.unwrap_or(serde_json::Value::Null)),
                    };
                }
                stratum::Message::Notification { method, params } => {
                    self.queue_notification(method, params);
                }
                other => panic!("unexpected message while awaiting response: {other:?}"),
            }
        }
    }

    pub(crate) async fn subscribe(&mut self) -> stratum::SubscribeResult {
        let result = self
            .call(
                "mining.subscribe",
                serde_json::to_value(stratum::Subscribe {
                    user_agent: para::USER_AGENT.into(),
                    enonce1: None,
                })
                .unwrap(),
            )
            .await
            .expect("mining.subscribe was rejected");

        serde_json::from_value(result).expect("malformed mining.subscribe result")
    }

    pub(crate) async fn authorize(
        &mut self,
        username: &str,
        password: Option<&str>,
    ) -> Result<(), stratum::JsonRpcError> {
        self.call(
            "mining.authorize",
            serde_json::to_value(stratum::Authorize {
                username: username.into(),
                password: password.map(str::to_string),
            })
            .unwrap(),
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn submit(
        &mut self,
        username: &str,
        job_id: stratum::JobId,
        enonce2: stratum::Extranonce,
        ntime: stratum::Ntime,
        nonce: stratum::Nonce,
    ) -> Result<(), stratum::JsonRpcError> {
        self.call(
            "mining.submit",
            serde_json::to_value(stratum::Submit {
                username: username.into(),
                job_id,
                enonce2,
                ntime,
                nonce,
                version_bits: None,
            })
            .unwrap(),
        )
        .await
        .map(|_| ())
    }
}
