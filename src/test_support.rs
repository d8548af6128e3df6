//! Fakes shared by unit tests: scripted transport, fake-clock sleeper and a
//! diagnostics sink that records everything it is given.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use governor::clock::FakeRelativeClock;
use log::Level;

use crate::config::CreditsConfig;
use crate::diagnostics::{BoundedContext, DiagnosticsSink};
use crate::http::{HttpFetcher, HttpTransport, RawResponse, Sleeper, SourcePacer};

pub fn json_response(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        body: body.to_string(),
        ..RawResponse::default()
    }
}

pub fn status_response(status: u16) -> RawResponse {
    RawResponse {
        status,
        ..RawResponse::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

type Scripted = (Option<String>, Result<RawResponse, String>);

#[derive(Default)]
struct ScriptState {
    responses: Vec<Scripted>,
    requests: Vec<RecordedRequest>,
}

/// Replays canned responses. Routed entries answer the first request whose
/// URL contains their pattern; unrouted entries answer in order.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<RawResponse, String>>) -> Self {
        let transport = Self::default();
        for response in responses {
            transport.push(None, response);
        }
        transport
    }

    /// Queues `body` as a 200 reply for the next URL containing `pattern`.
    pub fn route_json(self, pattern: &str, body: &str) -> Self {
        self.push(Some(pattern.to_string()), Ok(json_response(body)));
        self
    }

    pub fn route(self, pattern: &str, response: Result<RawResponse, String>) -> Self {
        self.push(Some(pattern.to_string()), response);
        self
    }

    fn push(&self, pattern: Option<String>, response: Result<RawResponse, String>) {
        self.state
            .lock()
            .expect("script lock")
            .responses
            .push((pattern, response));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().expect("script lock").requests.clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.url).collect()
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<RawResponse, String> {
        let mut state = self.state.lock().expect("script lock");
        state.requests.push(RecordedRequest {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        });
        let position = state.responses.iter().position(|(pattern, _)| match pattern {
            Some(pattern) => url.contains(pattern.as_str()),
            None => true,
        });
        match position {
            Some(index) => state.responses.remove(index).1,
            None => Err(format!("no scripted response for {url}")),
        }
    }
}

/// Records requested sleeps and advances the shared fake clock instead.
#[derive(Clone)]
pub struct FakeSleeper {
    clock: FakeRelativeClock,
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl FakeSleeper {
    pub fn new(clock: FakeRelativeClock) -> Self {
        Self {
            clock,
            slept: Arc::default(),
        }
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().expect("sleeper lock").clone()
    }
}

impl Sleeper for FakeSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().expect("sleeper lock").push(duration);
        self.clock.advance(duration);
    }
}

#[derive(Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<(Level, String, BoundedContext)>>,
    api_errors: Mutex<Vec<(String, String)>>,
}

impl RecordingDiagnostics {
    pub fn events(&self) -> Vec<(Level, String, BoundedContext)> {
        self.events.lock().expect("diagnostics lock").clone()
    }

    pub fn api_errors(&self) -> Vec<(String, String)> {
        self.api_errors.lock().expect("diagnostics lock").clone()
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    fn event(&self, level: Level, message: &str, context: &BoundedContext) {
        self.events
            .lock()
            .expect("diagnostics lock")
            .push((level, message.to_string(), context.clone()));
    }

    fn api_error(&self, source: &str, tag: &str) {
        self.api_errors
            .lock()
            .expect("diagnostics lock")
            .push((source.to_string(), tag.to_string()));
    }
}

/// Fetcher wired to fakes, with handles to inspect what happened.
pub struct TestHarness {
    pub fetcher: HttpFetcher,
    pub transport: ScriptedTransport,
    pub sleeper: FakeSleeper,
    pub diagnostics: Arc<RecordingDiagnostics>,
}

impl TestHarness {
    pub fn new(responses: Vec<Result<RawResponse, String>>) -> Self {
        Self::from_transport(&CreditsConfig::default(), ScriptedTransport::new(responses))
    }

    pub fn with_token(token: &str, responses: Vec<Result<RawResponse, String>>) -> Self {
        Self::from_transport(&token_config(token), ScriptedTransport::new(responses))
    }

    pub fn with_diagnostics(
        token: &str,
        diagnostics: Arc<RecordingDiagnostics>,
        responses: Vec<Result<RawResponse, String>>,
    ) -> Self {
        Self::build(
            &token_config(token),
            ScriptedTransport::new(responses),
            diagnostics,
        )
    }

    pub fn from_transport(config: &CreditsConfig, transport: ScriptedTransport) -> Self {
        Self::build(config, transport, Arc::new(RecordingDiagnostics::default()))
    }

    fn build(
        config: &CreditsConfig,
        transport: ScriptedTransport,
        diagnostics: Arc<RecordingDiagnostics>,
    ) -> Self {
        let clock = FakeRelativeClock::default();
        let sleeper = FakeSleeper::new(clock.clone());
        let fetcher = HttpFetcher::from_parts(
            config,
            Box::new(transport.clone()),
            Box::new(SourcePacer::with_clock(clock)),
            Box::new(sleeper.clone()),
            diagnostics.clone(),
        );
        Self {
            fetcher,
            transport,
            sleeper,
            diagnostics,
        }
    }
}

pub fn token_config(token: &str) -> CreditsConfig {
    CreditsConfig {
        discogs_token: token.to_string(),
        ..CreditsConfig::default()
    }
}
