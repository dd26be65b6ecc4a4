//! Single-flight retry coordinator
//!
//! The coordinator never runs the operation itself. The host builds the
//! operation through [`RetryCoordinator::retry`], which hands the builder a
//! [`FailureSink`] in place of the host's own failure tagger. Failures
//! reported through the sink come back to the coordinator as
//! [`RetryMsg::OperationFailed`], and [`RetryCoordinator::handle_message`]
//! decides whether to schedule a delayed re-run or forward the failure.
//!
//! All transitions are synchronous and take the flight state by value, so the
//! host stays in control of ownership and of its own dispatch loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::observer::{NoOpObserver, RetryObserver};
use super::strategies::{Backoff, DelayPolicy};

/// Unique identifier of one flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightId(Uuid);

impl FlightId {
    /// Generate a fresh flight id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FlightId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Retry configuration for one call site
///
/// `max_retries` counts re-invocations only; the original attempt is never
/// part of the budget.
#[derive(Debug, Clone)]
pub struct RetryConfig<D = Backoff> {
    /// Number of retries allowed after the original attempt
    pub max_retries: u32,

    /// Delay consulted before each retry
    pub delay: D,
}

impl<D: DelayPolicy> RetryConfig<D> {
    /// Create a new configuration
    pub fn new(max_retries: u32, delay: D) -> Self {
        Self { max_retries, delay }
    }
}

/// Lifecycle of a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlightStatus {
    /// Waiting for the operation to succeed or fail
    InFlight,

    /// The host observed success
    Succeeded,

    /// The retry budget ran out and the failure was forwarded
    Exhausted,
}

/// Per-flight state, owned by exactly one flight
#[derive(Debug, Clone)]
pub struct RetryState<Op> {
    flight: FlightId,
    retries: u32,
    pending: Op,
    status: FlightStatus,
}

impl<Op> RetryState<Op> {
    fn start(flight: FlightId, pending: Op) -> Self {
        Self {
            flight,
            retries: 0,
            pending,
            status: FlightStatus::InFlight,
        }
    }

    /// Id of the flight this state belongs to
    pub fn flight(&self) -> FlightId {
        self.flight
    }

    /// Number of the next retry (1-indexed)
    pub fn attempt(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Retries scheduled so far in this flight
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Handle to the operation that will be re-run on retry
    pub fn pending(&self) -> &Op {
        &self.pending
    }

    /// Current lifecycle status
    pub fn status(&self) -> FlightStatus {
        self.status
    }

    /// Whether the flight has succeeded or been forwarded
    pub fn is_concluded(&self) -> bool {
        self.status != FlightStatus::InFlight
    }

    /// Restart the attempt count to run the same operation again
    ///
    /// The flight id is kept because the pending operation's sink is bound
    /// to it. Prefer [`RetryCoordinator::retry`] for unrelated operations.
    pub fn reset(&mut self) {
        self.retries = 0;
        self.status = FlightStatus::InFlight;
    }

    fn accepts(&self, flight: FlightId) -> bool {
        self.flight == flight && self.status == FlightStatus::InFlight
    }
}

/// Messages addressed to the coordinator
///
/// `M` is the host's message type; the host embeds `RetryMsg` in `M` through
/// the `route_back` function it passes to [`RetryCoordinator::new`].
#[derive(Debug, Clone, PartialEq)]
pub enum RetryMsg<E, M> {
    /// Timer fired without a payload
    NoOp,

    /// The operation reported a failure through its [`FailureSink`]
    OperationFailed {
        /// Flight the failing operation belongs to
        flight: FlightId,
        /// Opaque failure value, never inspected
        failure: E,
    },

    /// A scheduled delay elapsed; pass `message` up to the host unchanged
    ReturnMessage {
        /// Flight that scheduled the message
        flight: FlightId,
        /// Host message to emit
        message: Box<M>,
    },
}

/// Request, delivered to the host, to re-run the original operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryRequest<Op, E> {
    /// Flight being retried
    pub flight: FlightId,
    /// Retry number (1 for the first retry)
    pub attempt: u32,
    /// Failure that triggered this retry
    pub failure: E,
    /// Operation to run again
    pub operation: Op,
}

/// A message the host must deliver back to itself after `delay`
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduled<M> {
    /// How long to wait before delivery
    pub delay: Duration,
    /// Host message to deliver
    pub message: M,
}

/// Result of one call to [`RetryCoordinator::handle_message`]
#[derive(Debug)]
pub struct Transition<Op, M> {
    /// State after the transition
    pub state: RetryState<Op>,
    /// Delayed message the host's timer must deliver, if any
    pub schedule: Option<Scheduled<M>>,
    /// Message to hand to the host's own dispatch, if any
    pub emit: Option<M>,
}

impl<Op, M> Transition<Op, M> {
    fn idle(state: RetryState<Op>) -> Self {
        Self {
            state,
            schedule: None,
            emit: None,
        }
    }
}

type RouteBack<E, M> = Arc<dyn Fn(RetryMsg<E, M>) -> M + Send + Sync>;

/// Failure notification sink handed to the operation builder
///
/// Calling [`fail`](FailureSink::fail) produces a host message addressed to
/// the coordinator rather than invoking the host's failure handler.
pub struct FailureSink<E, M> {
    flight: FlightId,
    route_back: RouteBack<E, M>,
}

impl<E, M> FailureSink<E, M> {
    /// Flight this sink reports for
    pub fn flight(&self) -> FlightId {
        self.flight
    }

    /// Build the host message reporting `failure` to the coordinator
    pub fn fail(&self, failure: E) -> M {
        (self.route_back)(RetryMsg::OperationFailed {
            flight: self.flight,
            failure,
        })
    }
}

impl<E, M> Clone for FailureSink<E, M> {
    fn clone(&self) -> Self {
        Self {
            flight: self.flight,
            route_back: Arc::clone(&self.route_back),
        }
    }
}

impl<E, M> fmt::Debug for FailureSink<E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureSink")
            .field("flight", &self.flight)
            .finish_non_exhaustive()
    }
}

/// Retry coordinator for a single call site
///
/// # Type parameters
///
/// * `Op` - opaque handle to the operation; cloned into every retry request
/// * `E` - failure value reported by the operation
/// * `M` - the host's message type
/// * `D` - delay policy
/// * `O` - observer notified of flight events
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{constant_delay, RetryConfig, RetryCoordinator, RetryMsg, RetryRequest};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// enum Msg {
///     Retry(RetryMsg<String, Msg>),
///     Rerun(RetryRequest<&'static str, String>),
///     Failed(String),
/// }
///
/// let config = RetryConfig::new(1, constant_delay(Duration::from_millis(250)));
/// let coordinator = RetryCoordinator::new(config, Msg::Retry, Msg::Failed, Msg::Rerun);
///
/// let mut fail = None;
/// let (state, operation) = coordinator.retry(|sink| {
///     fail = Some(sink);
///     "fetch"
/// });
/// assert_eq!(operation, "fetch");
///
/// // The operation fails: its sink produces a message for the coordinator
/// let Msg::Retry(msg) = fail.unwrap().fail("timeout".to_string()) else { unreachable!() };
/// let transition = coordinator.handle_message(state, msg);
///
/// let scheduled = transition.schedule.expect("retry scheduled");
/// assert_eq!(scheduled.delay, Duration::from_millis(250));
/// assert!(transition.emit.is_none());
/// ```
pub struct RetryCoordinator<Op, E, M, D = Backoff, O = NoOpObserver> {
    config: RetryConfig<D>,
    route_back: RouteBack<E, M>,
    failure_tagger: Arc<dyn Fn(E) -> M + Send + Sync>,
    retry_tagger: Arc<dyn Fn(RetryRequest<Op, E>) -> M + Send + Sync>,
    observer: O,
}

impl<Op, E, M, D> RetryCoordinator<Op, E, M, D, NoOpObserver> {
    /// Create a coordinator for one call site
    ///
    /// # Arguments
    ///
    /// * `config` - retry budget and delay policy
    /// * `route_back` - embeds coordinator messages in the host's message type
    /// * `failure_tagger` - the host's own failure handler, used when forwarding
    /// * `retry_tagger` - builds the host message asking for a re-run
    pub fn new<R, F, T>(config: RetryConfig<D>, route_back: R, failure_tagger: F, retry_tagger: T) -> Self
    where
        R: Fn(RetryMsg<E, M>) -> M + Send + Sync + 'static,
        F: Fn(E) -> M + Send + Sync + 'static,
        T: Fn(RetryRequest<Op, E>) -> M + Send + Sync + 'static,
    {
        Self {
            config,
            route_back: Arc::new(route_back),
            failure_tagger: Arc::new(failure_tagger),
            retry_tagger: Arc::new(retry_tagger),
            observer: NoOpObserver,
        }
    }
}

impl<Op, E, M, D, O> RetryCoordinator<Op, E, M, D, O> {
    /// Set the observer
    pub fn with_observer<O2>(self, observer: O2) -> RetryCoordinator<Op, E, M, D, O2> {
        RetryCoordinator {
            config: self.config,
            route_back: self.route_back,
            failure_tagger: self.failure_tagger,
            retry_tagger: self.retry_tagger,
            observer,
        }
    }

    /// The configuration this coordinator enforces
    pub fn config(&self) -> &RetryConfig<D> {
        &self.config
    }

    /// The observer receiving flight events
    pub fn observer(&self) -> &O {
        &self.observer
    }
}

impl<Op, E, M, D, O> RetryCoordinator<Op, E, M, D, O>
where
    Op: Clone,
    D: DelayPolicy,
    O: RetryObserver,
{
    /// Start a new flight
    ///
    /// `build` receives the sink the operation must report failures through
    /// and returns the operation to launch. The returned state always starts
    /// at attempt 1 with a fresh flight id.
    pub fn retry<B>(&self, build: B) -> (RetryState<Op>, Op)
    where
        B: FnOnce(FailureSink<E, M>) -> Op,
    {
        let flight = FlightId::new();
        let sink = FailureSink {
            flight,
            route_back: Arc::clone(&self.route_back),
        };

        let operation = build(sink);
        let state = RetryState::start(flight, operation.clone());

        self.observer.on_flight_start(flight, self.config.max_retries);

        (state, operation)
    }

    /// Apply one coordinator message to the flight state
    ///
    /// Messages addressed to another flight, or arriving after the flight
    /// concluded, are ignored.
    pub fn handle_message(&self, state: RetryState<Op>, msg: RetryMsg<E, M>) -> Transition<Op, M> {
        match msg {
            RetryMsg::NoOp => Transition::idle(state),

            RetryMsg::OperationFailed { flight, failure } => {
                if !state.accepts(flight) {
                    return self.ignore_stale(state, flight);
                }
                self.on_failure(state, failure)
            }

            RetryMsg::ReturnMessage { flight, message } => {
                if !state.accepts(flight) {
                    return self.ignore_stale(state, flight);
                }
                Transition {
                    state,
                    schedule: None,
                    emit: Some(*message),
                }
            }
        }
    }

    /// Conclude the flight after the host observed success
    pub fn succeed(&self, mut state: RetryState<Op>) -> RetryState<Op> {
        if state.status == FlightStatus::InFlight {
            state.status = FlightStatus::Succeeded;
            self.observer.on_success(state.flight, state.retries());
        }
        state
    }

    fn on_failure(&self, mut state: RetryState<Op>, failure: E) -> Transition<Op, M> {
        let flight = state.flight;
        let max_retries = self.config.max_retries;

        if state.retries >= max_retries {
            state.status = FlightStatus::Exhausted;
            self.observer.on_forwarded(flight, state.retries());
            return Transition {
                state,
                schedule: None,
                emit: Some((self.failure_tagger)(failure)),
            };
        }

        // retries < max_retries here, so this cannot overflow
        let attempt = state.retries + 1;
        let delay = self.config.delay.delay_for_attempt(attempt);

        let request = RetryRequest {
            flight,
            attempt,
            failure,
            operation: state.pending.clone(),
        };
        let message = (self.route_back)(RetryMsg::ReturnMessage {
            flight,
            message: Box::new((self.retry_tagger)(request)),
        });

        state.retries = attempt;
        self.observer
            .on_retry_scheduled(flight, attempt, max_retries, delay);

        Transition {
            state,
            schedule: Some(Scheduled { delay, message }),
            emit: None,
        }
    }

    fn ignore_stale(&self, state: RetryState<Op>, flight: FlightId) -> Transition<Op, M> {
        tracing::debug!(
            flight = %flight,
            current = %state.flight,
            status = ?state.status,
            "ignoring message for concluded or unknown flight"
        );
        self.observer.on_stale_message(flight);
        Transition::idle(state)
    }
}
