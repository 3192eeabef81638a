use crate::CommandSpec;

/// Lifecycle of a single request/reply exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    AwaitingReply { attempt: u32 },
    /// Timer fired, the resend for `attempt` is pending.
    Retrying { attempt: u32 },
    Succeeded,
    Failed(Failure),
}

impl ExchangeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangeState::Succeeded | ExchangeState::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Every timer-driven attempt ran out without a length-valid reply.
    Exhausted { attempts: u32, malformed: u32 },
    /// The endpoint reported an error or went away before a result.
    Closed,
    Cancelled,
}

/// What the socket owner has to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Transmit the request. `rearm_timer` is false for resends caused by a malformed reply.
    Send { rearm_timer: bool },
    Complete(Vec<u8>),
    Fail(Failure),
    /// Input ignored, keep waiting.
    Wait,
}

/// Retry bookkeeping for one exchange, free of any I/O.
///
/// The timer-driven attempt counter starts at 1 and is capped by `max_attempts`.
/// Replies of the wrong length trigger an immediate resend that neither rearms the
/// timer nor advances the attempt counter; they are tallied in `malformed`.
#[derive(Debug)]
pub struct Exchange<'a> {
    spec: &'a CommandSpec,
    max_attempts: u32,
    state: ExchangeState,
    attempt: u32,
    malformed: u32,
}

impl<'a> Exchange<'a> {
    pub fn new(spec: &'a CommandSpec, max_attempts: u32) -> Self {
        Self {
            spec,
            max_attempts: max_attempts.max(1),
            state: ExchangeState::Idle,
            attempt: 0,
            malformed: 0,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn malformed(&self) -> u32 {
        self.malformed
    }

    pub fn start(&mut self) -> Step {
        if self.state != ExchangeState::Idle {
            return Step::Wait;
        }
        self.attempt = 1;
        self.state = ExchangeState::AwaitingReply { attempt: 1 };
        Step::Send { rearm_timer: true }
    }

    /// Acknowledges that a requested send went out.
    pub fn on_sent(&mut self) {
        if let ExchangeState::Retrying { attempt } = self.state {
            self.state = ExchangeState::AwaitingReply { attempt };
        }
    }

    pub fn on_reply(&mut self, data: &[u8]) -> Step {
        match self.state {
            ExchangeState::AwaitingReply { .. } | ExchangeState::Retrying { .. } => {
                if self.spec.accepts(data.len()) {
                    self.state = ExchangeState::Succeeded;
                    Step::Complete(data.to_vec())
                } else {
                    self.malformed += 1;
                    Step::Send { rearm_timer: false }
                }
            }
            _ => Step::Wait,
        }
    }

    pub fn on_timeout(&mut self) -> Step {
        match self.state {
            ExchangeState::AwaitingReply { attempt } | ExchangeState::Retrying { attempt } => {
                if attempt < self.max_attempts {
                    self.attempt = attempt + 1;
                    self.state = ExchangeState::Retrying {
                        attempt: self.attempt,
                    };
                    Step::Send { rearm_timer: true }
                } else {
                    self.fail(Failure::Exhausted {
                        attempts: attempt,
                        malformed: self.malformed,
                    })
                }
            }
            _ => Step::Wait,
        }
    }

    pub fn on_closed(&mut self) -> Step {
        self.fail(Failure::Closed)
    }

    pub fn cancel(&mut self) -> Step {
        self.fail(Failure::Cancelled)
    }

    fn fail(&mut self, failure: Failure) -> Step {
        if self.state.is_terminal() {
            return Step::Wait;
        }
        self.state = ExchangeState::Failed(failure);
        Step::Fail(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: CommandSpec = CommandSpec::new("test", &[0x01, 0x02], &[4, 6]);

    #[test]
    fn succeeds_on_first_valid_reply() {
        let mut exchange = Exchange::new(&SPEC, 4);
        assert_eq!(exchange.start(), Step::Send { rearm_timer: true });
        assert_eq!(exchange.state(), ExchangeState::AwaitingReply { attempt: 1 });
        assert_eq!(
            exchange.on_reply(&[9, 9, 9, 9, 9, 9]),
            Step::Complete(vec![9; 6])
        );
        assert_eq!(exchange.state(), ExchangeState::Succeeded);
    }

    #[test]
    fn retrying_becomes_awaiting_after_send() {
        let mut exchange = Exchange::new(&SPEC, 4);
        exchange.start();
        exchange.on_sent();
        assert_eq!(exchange.on_timeout(), Step::Send { rearm_timer: true });
        assert_eq!(exchange.state(), ExchangeState::Retrying { attempt: 2 });
        exchange.on_sent();
        assert_eq!(exchange.state(), ExchangeState::AwaitingReply { attempt: 2 });
    }

    #[test]
    fn start_twice_is_ignored() {
        let mut exchange = Exchange::new(&SPEC, 4);
        exchange.start();
        assert_eq!(exchange.start(), Step::Wait);
        assert_eq!(exchange.attempt(), 1);
    }

    #[test]
    fn terminal_states_swallow_further_events() {
        let mut exchange = Exchange::new(&SPEC, 4);
        exchange.start();
        exchange.cancel();
        assert_eq!(exchange.on_timeout(), Step::Wait);
        assert_eq!(exchange.on_closed(), Step::Wait);
        assert_eq!(
            exchange.state(),
            ExchangeState::Failed(Failure::Cancelled)
        );
    }

    #[test]
    fn zero_max_attempts_still_sends_once() {
        let mut exchange = Exchange::new(&SPEC, 0);
        exchange.start();
        assert_eq!(
            exchange.on_timeout(),
            Step::Fail(Failure::Exhausted {
                attempts: 1,
                malformed: 0
            })
        );
    }
}
