//! Test doubles shared by the unit tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::compose::{CommandOutput, CommandRunner, Invocation};
use crate::error::Result;
use crate::readiness::Clock;

type Handler = Box<dyn Fn(usize) -> CommandOutput>;

/// Runner answering per compose verb; unscripted verbs exit 0 silently.
///
/// Handlers receive the 1-based number of the call for their verb.
#[derive(Default)]
pub struct ScriptedRunner {
    handlers: HashMap<String, Handler>,
    counts: RefCell<HashMap<String, usize>>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, verb: &str, handler: impl Fn(usize) -> CommandOutput + 'static) -> Self {
        self.handlers.insert(verb.to_string(), Box::new(handler));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn calls_for(&self, verb: &str) -> usize {
        self.counts.borrow().get(verb).copied().unwrap_or(0)
    }

    pub fn last_call(&self) -> Option<Invocation> {
        self.calls.borrow().last().cloned()
    }

    pub fn verbs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(verb_of).collect()
    }
}

/// The compose verb: the token after `--project-name <name>`, else the last token
fn verb_of(invocation: &Invocation) -> String {
    let args = &invocation.args;
    args.iter()
        .position(|a| a == "--project-name")
        .and_then(|pos| args.get(pos + 2))
        .or_else(|| args.last())
        .cloned()
        .unwrap_or_default()
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());

        let verb = verb_of(invocation);
        let n = {
            let mut counts = self.counts.borrow_mut();
            let count = counts.entry(verb.clone()).or_insert(0);
            *count += 1;
            *count
        };

        Ok(self
            .handlers
            .get(&verb)
            .map(|h| h(n))
            .unwrap_or_default())
    }
}

/// Clock whose sleeps advance time instantly
pub struct FakeClock {
    origin: Instant,
    elapsed: Cell<Duration>,
    sleeps: Cell<usize>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            sleeps: Cell::new(0),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.get()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
        self.sleeps.set(self.sleeps.get() + 1);
    }
}
