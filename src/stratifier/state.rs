use super::*;

/// Everything known about an authorized worker, shared out to callers as
/// an `Arc` since a template refresh and a share submission may both need
/// it concurrently.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) enonce1: Extranonce,
    pub(crate) address: Address,
    pub(crate) workername: String,
    pub(crate) username: Username,
}

/// Returned by `State::subscribed` to hand the allocated `enonce1` on to
/// `mining.authorize` without exposing the rest of the state machine.
pub(crate) struct Subscription {
    pub(crate) enonce1: Extranonce,
}

#[derive(Debug, Clone)]
pub(crate) enum State {
    Fresh {
        version_mask: Option<Version>,
    },

    Subscribed {
        enonce1: Extranonce,
        user_agent: String,
        version_mask: Option<Version>,
    },

    Working {
        session: Arc<Session>,
        user_agent: String,
        version_mask: Option<Version>,
    },
}

impl State {
    pub(crate) fn new() -> Self {
        State::Fresh { version_mask: None }
    }

    pub(crate) fn not_subscribed(&self) -> bool {
        matches!(self, State::Fresh { .. })
    }

    pub(crate) fn subscribed(&self) -> Option<Subscription> {
        match self {
            State::Subscribed { enonce1, .. } => Some(Subscription {
                enonce1: enonce1.clone(),
            }),
            _ => None,
        }
    }

    pub(crate) fn working(&self) -> Option<Arc<Session>> {
        match self {
            State::Working { session, .. } => Some(session.clone()),
            _ => None,
        }
    }

    /// Always succeeds: version rolling may be (re-)negotiated from any state.
    pub(crate) fn configure(&mut self, version_mask: Version) -> bool {
        match self {
            State::Fresh {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
            State::Subscribed {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
            State::Working {
                version_mask: vm, ..
            } => *vm = Some(version_mask),
        }

        true
    }

    pub(crate) fn subscribe(&mut self, enonce1: Extranonce, user_agent: String) {
        let version_mask = self.version_mask();
        *self = State::Subscribed {
            enonce1,
            user_agent,
            version_mask,
        };
    }

    /// Succeeds only from `Subscribed`; `mining.authorize` is rejected from
    /// `Fresh` (never subscribed) and from `Working` (already authorized).
    pub(crate) fn authorize(
        &mut self,
        address: Address,
        workername: String,
        username: Username,
    ) -> bool {
        match self {
            State::Subscribed {
                enonce1,
                user_agent,
                version_mask,
            } => {
                *self = State::Working {
                    session: Arc::new(Session {
                        enonce1: enonce1.clone(),
                        address,
                        workername,
                        username,
                    }),
                    user_agent: user_agent.clone(),
                    version_mask: *version_mask,
                };
                true
            }
            _ => false,
        }
    }

    pub(crate) fn version_mask(&self) -> Option<Version> {
        match self {
            State::Fresh { version_mask } => *version_mask,
            State::Subscribed { version_mask, .. } => *version_mask,
            State::Working { version_mask, .. } => *version_mask,
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            State::Fresh { version_mask: None } => write!(f, "Init"),
            State::Fresh {
                version_mask: Some(_),
            } => write!(f, "Configured"),
            State::Subscribed { .. } => write!(f, "Subscribed"),
            State::Working { .. } => write!(f, "Working"),
        }
    }
}
