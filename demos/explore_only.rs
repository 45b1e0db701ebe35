//! Serve and log one epsilon-greedy decision per request, then print the log.
//!
//! `RUST_LOG=propensity=trace cargo run --example explore_only`

use std::fmt;
use std::sync::Arc;

use propensity::{policy_fn, Action, Engine, EpsilonGreedyExplorer, Result, StringRecorder};

struct Request {
    user: u32,
    premium: bool,
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user={} premium={}", self.user, self.premium)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let log = Arc::new(StringRecorder::new());
    let engine: Engine<Request, Action, Action> = Engine::builder("mwt", 10)
        .recorder(Arc::clone(&log))
        .explorer(EpsilonGreedyExplorer::with_epsilon(0.2)?)
        .policy(policy_fn(|r: &Request| if r.premium { 5 } else { 2 }))
        .build()?;

    let requests = [
        ("eventid", Request { user: 100, premium: true }),
        ("evt-2", Request { user: 7, premium: false }),
        ("evt-3", Request { user: 42, premium: true }),
    ];
    for (key, req) in &requests {
        let choice = engine.decide(key, req)?;
        println!(
            "{key}: action {} (p = {:.5}, recorded = {})",
            choice.value,
            choice.probability(),
            choice.recorded
        );
    }

    print!("{}", log.recording(true).unwrap_or_default());
    Ok(())
}
