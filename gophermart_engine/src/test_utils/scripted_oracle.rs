use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    accrual_oracle::{AccrualOracle, AccrualVerdict, OracleError},
    db_types::OrderNumber,
};

type Response = Result<AccrualVerdict, OracleError>;

#[derive(Default)]
struct Script {
    responses: HashMap<OrderNumber, VecDeque<Response>>,
    calls: HashMap<OrderNumber, usize>,
}

/// An accrual oracle that replays scripted responses.
///
/// Responses for an order are returned in the order they were added. The last one is sticky: it is repeated for
/// every later query. Orders without a script are reported as [`AccrualVerdict::Unregistered`].
#[derive(Clone, Default)]
pub struct ScriptedOracle {
    script: Arc<Mutex<Script>>,
    latency: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every query sleeps for `latency` before it answers, to widen race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn respond(&self, number: &str, response: Response) -> &Self {
        let mut script = self.script();
        script.responses.entry(OrderNumber::from(number)).or_default().push_back(response);
        self
    }

    pub fn respond_with(&self, number: &str, verdict: AccrualVerdict) -> &Self {
        self.respond(number, Ok(verdict))
    }

    /// Discards any script for `number` and answers with `verdict` from now on.
    pub fn set_verdict(&self, number: &str, verdict: AccrualVerdict) {
        let mut script = self.script();
        script.responses.insert(OrderNumber::from(number), VecDeque::from([Ok(verdict)]));
    }

    pub fn calls(&self, number: &str) -> usize {
        let script = self.script();
        script.calls.get(&OrderNumber::from(number)).copied().unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.script().calls.values().sum()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, number: &OrderNumber) -> Response {
        let mut script = self.script();
        *script.calls.entry(number.clone()).or_default() += 1;
        match script.responses.get_mut(number) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Ok(AccrualVerdict::Unregistered)),
            Some(queue) => queue.front().cloned().unwrap_or(Ok(AccrualVerdict::Unregistered)),
            None => Ok(AccrualVerdict::Unregistered),
        }
    }
}

impl AccrualOracle for ScriptedOracle {
    async fn query(&self, number: &OrderNumber) -> Result<AccrualVerdict, OracleError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_response(number)
    }
}
