//! Per-provider request pacing.
//!
//! Providers with an etiquette rule (MusicBrainz: one request per second) get
//! a single-cell `governor` limiter. The fetch layer asks for a turn before
//! every network call and sleeps through an injected [`Sleeper`], so tests can
//! run against a fake clock without real delays.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use super::SourceId;

type PacingLimiter<C> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

const MUSICBRAINZ_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Blocking delay primitive used for pacing and retry backoff.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Minimum inter-request interval contract enforced by the fetch layer.
pub trait RequestPacer: Send + Sync {
    /// Blocks until `source` may issue its next request; returns the time waited.
    fn wait_turn(&self, source: SourceId, sleeper: &dyn Sleeper) -> Duration;
}

/// Minimum spacing between two requests to `source`, if the provider asks for one.
pub fn min_request_interval(source: SourceId) -> Option<Duration> {
    match source {
        SourceId::MusicBrainz => Some(MUSICBRAINZ_MIN_INTERVAL),
        SourceId::Discogs | SourceId::Wikidata => None,
    }
}

/// `governor`-backed pacer holding one limiter per paced provider.
pub struct SourcePacer<C = DefaultClock>
where
    C: Clock,
{
    clock: C,
    limiters: Vec<(SourceId, PacingLimiter<C>)>,
}

impl SourcePacer<DefaultClock> {
    pub fn new() -> Self {
        Self::with_clock(DefaultClock::default())
    }
}

impl Default for SourcePacer<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> SourcePacer<C>
where
    C: Clock + Clone,
{
    pub fn with_clock(clock: C) -> Self {
        let limiters = SourceId::ALL
            .iter()
            .filter_map(|source| {
                let interval = min_request_interval(*source)?;
                let quota = Quota::with_period(interval)?.allow_burst(NonZeroU32::MIN);
                Some((
                    *source,
                    RateLimiter::direct_with_clock(quota, clock.clone()),
                ))
            })
            .collect();
        Self { clock, limiters }
    }

    fn limiter_for(&self, source: SourceId) -> Option<&PacingLimiter<C>> {
        self.limiters
            .iter()
            .find(|(paced, _)| *paced == source)
            .map(|(_, limiter)| limiter)
    }
}

impl<C> RequestPacer for SourcePacer<C>
where
    C: Clock + Clone + Send + Sync,
    C::Instant: Send + Sync,
{
    fn wait_turn(&self, source: SourceId, sleeper: &dyn Sleeper) -> Duration {
        let Some(limiter) = self.limiter_for(source) else {
            return Duration::ZERO;
        };

        let mut waited = Duration::ZERO;
        loop {
            match limiter.check() {
                Ok(()) => return waited,
                Err(not_until) => {
                    let wait = not_until
                        .wait_time_from(self.clock.now())
                        .max(Duration::from_millis(1));
                    sleeper.sleep(wait);
                    waited += wait;
                }
            }
        }
    }
}
