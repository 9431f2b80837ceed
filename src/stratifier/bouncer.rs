use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub(crate) enum Consequence {
    #[default]
    None,
    Warn,
    Reconnect,
    Drop,
}

const WARN_THRESHOLD: Duration = Duration::from_secs(30);
const RECONNECT_THRESHOLD: Duration = Duration::from_secs(90);
const DROP_THRESHOLD: Duration = Duration::from_secs(180);
pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

pub(crate) struct Bouncer {
    disabled: bool,
    idle_timeout: Duration,
    first_reject: Option<Instant>,
    consecutive_rejects: u32,
    current_consequence: Consequence,
    last_interaction: Instant,
}

impl Bouncer {
    pub(crate) fn new(disabled: bool, idle_timeout: Duration) -> Self {
        Self {
            disabled,
            idle_timeout,
            first_reject: None,
            consecutive_rejects: 0,
            current_consequence: Consequence::None,
            last_interaction: Instant::now(),
        }
    }

    pub(crate) fn check_interval(&self) -> Duration {
        IDLE_CHECK_INTERVAL
    }

    pub(crate) fn idle_check(&self) -> Consequence {
        if self.disabled {
            return Consequence::None;
        }

        if self.last_interaction.elapsed() >= self.idle_timeout {
            Consequence::Drop
        } else {
            Consequence::None
        }
    }

    /// Marks activity on a successful `mining.authorize`, resetting the idle
    /// clock without disturbing the reject-streak bookkeeping.
    pub(crate) fn authorize(&mut self) {
        self.last_interaction = Instant::now();
    }

    pub(crate) fn last_interaction_since(&self) -> Duration {
        self.last_interaction.elapsed()
    }

    pub(crate) fn reject(&mut self) -> Consequence {
        self.last_interaction = Instant::now();

        if self.disabled {
            return Consequence::None;
        }

        self.consecutive_rejects += 1;

        let elapsed = self.first_reject.get_or_insert_with(Instant::now).elapsed();

        let new_consequence = [
            (DROP_THRESHOLD, Consequence::Drop),
            (RECONNECT_THRESHOLD, Consequence::Reconnect),
            (WARN_THRESHOLD, Consequence::Warn),
        ]
        .into_iter()
        .find(|(threshold, _)| elapsed >= *threshold)
        .map(|(_, consequence)| consequence)
        .unwrap_or(Consequence::None);

        if new_consequence > self.current_consequence {
            self.current_consequence = new_consequence;
            new_consequence
        } else {
            Consequence::None
        }
    }

    pub(crate) fn accept(&mut self) {
        *self = Self::new(self.disabled, self.idle_timeout);
    }

    pub(crate) fn consecutive_rejects(&self) -> u32 {
        self.consecutive_rejects
    }

    pub(crate) fn reject_duration(&self) -> Option<Duration> {
        self.first_reject.map(|t| t.elapsed())
    }
}
