//! Scenario tests for the retry module
//!
//! These tests drive the coordinator through a simulated host: a FIFO
//! dispatch queue and a virtual clock that records every scheduled delay.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::retry::coordinator::{
    FailureSink, FlightStatus, RetryConfig, RetryCoordinator, RetryMsg, RetryRequest, RetryState,
};
use crate::retry::observer::StatsObserver;
use crate::retry::strategies::{constant_delay, exponential_delay, from_fn, DelayPolicy};

/// Operation handle in the simulated host
#[derive(Debug, Clone, PartialEq)]
struct Upload {
    sink: FailureSinkHandle,
    name: &'static str,
}

/// Wrapper so the handle can derive PartialEq on the flight id only
#[derive(Debug, Clone)]
struct FailureSinkHandle(FailureSink<String, HostMsg>);

impl PartialEq for FailureSinkHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.flight() == other.0.flight()
    }
}

#[derive(Debug, PartialEq)]
enum HostMsg {
    Retry(RetryMsg<String, HostMsg>),
    Rerun(RetryRequest<Upload, String>),
    GaveUp(String),
}

/// Simulated host: dispatch queue plus a virtual timer
struct Host<D: DelayPolicy> {
    coordinator: RetryCoordinator<Upload, String, HostMsg, D, Arc<StatsObserver>>,
    observer: Arc<StatsObserver>,
    queue: VecDeque<HostMsg>,
    timers: Vec<(Duration, HostMsg)>,
    delays: Vec<Duration>,
    launches: u32,
    gave_up: Option<String>,
}

impl<D: DelayPolicy> Host<D> {
    fn new(config: RetryConfig<D>) -> Self {
        let observer = Arc::new(StatsObserver::new());
        let coordinator =
            RetryCoordinator::new(config, HostMsg::Retry, HostMsg::GaveUp, HostMsg::Rerun)
                .with_observer(observer.clone());

        Self {
            coordinator,
            observer,
            queue: VecDeque::new(),
            timers: Vec::new(),
            delays: Vec::new(),
            launches: 0,
            gave_up: None,
        }
    }

    fn start(&mut self) -> (RetryState<Upload>, Upload) {
        let (state, op) = self.coordinator.retry(|sink| Upload {
            sink: FailureSinkHandle(sink),
            name: "report.csv",
        });
        self.launches += 1;
        (state, op)
    }

    /// Dispatch everything queued; fire timers one at a time when idle
    ///
    /// `outcome` decides whether each launch fails (returns the failure).
    fn run<F>(
        &mut self,
        mut state: RetryState<Upload>,
        op: Upload,
        mut outcome: F,
    ) -> RetryState<Upload>
    where
        F: FnMut(u32) -> Option<String>,
    {
        match outcome(self.launches) {
            Some(failure) => self.queue.push_back(op.sink.0.fail(failure)),
            None => return self.coordinator.succeed(state),
        }

        loop {
            if let Some(msg) = self.queue.pop_front() {
                match msg {
                    HostMsg::Retry(inner) => {
                        let transition = self.coordinator.handle_message(state, inner);
                        state = transition.state;
                        if let Some(scheduled) = transition.schedule {
                            self.delays.push(scheduled.delay);
                            self.timers.push((scheduled.delay, scheduled.message));
                        }
                        if let Some(upward) = transition.emit {
                            self.queue.push_back(upward);
                        }
                    }
                    HostMsg::Rerun(request) => {
                        self.launches += 1;
                        match outcome(self.launches) {
                            Some(failure) => {
                                self.queue.push_back(request.operation.sink.0.fail(failure))
                            }
                            None => return self.coordinator.succeed(state),
                        }
                    }
                    HostMsg::GaveUp(failure) => {
                        self.gave_up = Some(failure);
                        return state;
                    }
                }
            } else if !self.timers.is_empty() {
                let (_, message) = self.timers.remove(0);
                self.queue.push_back(message);
            } else {
                return state;
            }
        }
    }
}

fn always_fail(launch: u32) -> Option<String> {
    Some(format!("failure {}", launch))
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_constant_delay_scenario() {
    let mut host = Host::new(RetryConfig::new(3, constant_delay(Duration::from_millis(1000))));
    let (state, op) = host.start();

    let state = host.run(state, op, always_fail);

    assert_eq!(host.delays, vec![Duration::from_millis(1000); 3]);
    assert_eq!(host.launches, 4);
    assert_eq!(host.gave_up.as_deref(), Some("failure 4"));
    assert_eq!(state.status(), FlightStatus::Exhausted);
    assert_eq!(host.observer.retries(), 3);
    assert_eq!(host.observer.forwards(), 1);
    assert!(host.timers.is_empty());
}

#[test]
fn test_exponential_delay_scenario() {
    let mut host = Host::new(RetryConfig::new(
        2,
        exponential_delay(Duration::from_millis(500), Duration::from_millis(4000)),
    ));
    let (state, op) = host.start();

    host.run(state, op, always_fail);

    assert_eq!(
        host.delays,
        vec![Duration::from_millis(500), Duration::from_millis(1000)]
    );
    assert_eq!(host.launches, 3);
    assert_eq!(host.gave_up.as_deref(), Some("failure 3"));
}

#[test]
fn test_exactly_n_retries_for_any_budget() {
    for max_retries in 0..=8 {
        let mut host = Host::new(RetryConfig::new(
            max_retries,
            constant_delay(Duration::from_millis(5)),
        ));
        let (state, op) = host.start();

        host.run(state, op, always_fail);

        assert_eq!(host.delays.len() as u32, max_retries, "budget {max_retries}");
        assert_eq!(host.launches, max_retries + 1, "budget {max_retries}");
        assert_eq!(
            host.gave_up,
            Some(format!("failure {}", max_retries + 1)),
            "budget {max_retries}"
        );
    }
}

#[test]
fn test_zero_budget_forwards_immediately() {
    let mut host = Host::new(RetryConfig::new(0, constant_delay(Duration::from_secs(30))));
    let (state, op) = host.start();

    let state = host.run(state, op, always_fail);

    assert!(host.delays.is_empty());
    assert_eq!(host.launches, 1);
    assert_eq!(host.gave_up.as_deref(), Some("failure 1"));
    assert_eq!(state.retries(), 0);
}

#[test]
fn test_kth_retry_uses_kth_delay() {
    let consulted = Arc::new(Mutex::new(Vec::new()));
    let consulted_clone = consulted.clone();
    let policy = from_fn(move |attempt| {
        consulted_clone.lock().unwrap().push(attempt);
        Duration::from_millis(u64::from(attempt) * 100)
    });

    let mut host = Host::new(RetryConfig::new(4, policy));
    let (state, op) = host.start();
    host.run(state, op, always_fail);

    assert_eq!(*consulted.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(
        host.delays,
        (1..=4)
            .map(|k| Duration::from_millis(k * 100))
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_success_without_failure_is_silent() {
    let mut host = Host::new(RetryConfig::new(3, constant_delay(Duration::from_millis(10))));
    let (state, op) = host.start();

    let state = host.run(state, op, |_| None);

    assert!(host.delays.is_empty());
    assert!(host.queue.is_empty());
    assert!(host.gave_up.is_none());
    assert_eq!(state.status(), FlightStatus::Succeeded);
    assert_eq!(host.observer.retries(), 0);
    assert_eq!(host.observer.forwards(), 0);
    assert_eq!(host.observer.successes(), 1);
}

#[test]
fn test_success_after_two_failures() {
    let mut host = Host::new(RetryConfig::new(5, constant_delay(Duration::from_millis(10))));
    let (state, op) = host.start();

    let state = host.run(state, op, |launch| {
        if launch < 3 {
            Some(format!("failure {}", launch))
        } else {
            None
        }
    });

    assert_eq!(host.delays.len(), 2);
    assert_eq!(host.launches, 3);
    assert!(host.gave_up.is_none());
    assert_eq!(state.status(), FlightStatus::Succeeded);
    assert_eq!(state.retries(), 2);
}

#[test]
fn test_rerun_request_carries_context() {
    let mut host = Host::new(RetryConfig::new(2, constant_delay(Duration::from_millis(10))));
    let (state, op) = host.start();
    let flight = state.flight();

    let failure = op.sink.0.fail("disk full".to_string());
    let HostMsg::Retry(inner) = failure else {
        panic!("sink must route to the coordinator");
    };
    let transition = host.coordinator.handle_message(state, inner);
    let scheduled = transition.schedule.unwrap();

    // Timer fires: the host routes the message back to the coordinator
    let HostMsg::Retry(fired) = scheduled.message else {
        panic!("scheduled message must address the coordinator");
    };
    let transition = host.coordinator.handle_message(transition.state, fired);

    match transition.emit {
        Some(HostMsg::Rerun(request)) => {
            assert_eq!(request.flight, flight);
            assert_eq!(request.attempt, 1);
            assert_eq!(request.failure, "disk full");
            assert_eq!(request.operation.name, "report.csv");
            assert_eq!(request.operation, op);
        }
        other => panic!("expected rerun request, got {:?}", other),
    }
}

#[test]
fn test_attempt_never_decreases() {
    let mut host = Host::new(RetryConfig::new(6, constant_delay(Duration::from_millis(1))));
    let (mut state, _op) = host.start();
    let flight = state.flight();

    let mut previous = state.attempt();
    for n in 0..10 {
        let transition = host.coordinator.handle_message(
            state,
            RetryMsg::OperationFailed {
                flight,
                failure: format!("failure {}", n),
            },
        );
        state = transition.state;
        assert!(state.attempt() >= previous);
        previous = state.attempt();
    }

    assert_eq!(state.attempt(), 7);
    assert_eq!(state.status(), FlightStatus::Exhausted);
}
