use std::sync::Arc;
use std::time::Duration;

use deadman_core::{rate_limit_wait, ActivityRecord, Clock, RateLimitWait, RetryPolicy};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{HttpResponse, Sleeper, Transport};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("handle not found: {0}")]
    NotFound(String),
    #[error("exceeded max retries ({max_retries}) due to rate limiting")]
    RetriesExhausted { max_retries: u32 },
    #[error("rate limit reset in {wait_secs}s, exceeding max wait ({max_wait_secs}s)")]
    WaitTooLong { wait_secs: u64, max_wait_secs: u64 },
    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("decode events: {0}")]
    Decode(String),
}

/// Anything that can report a handle's recent activity.
pub trait ActivitySource {
    fn fetch(&self, handle: &str, handle_missing_as_empty: bool) -> Result<Vec<ActivityRecord>, ActivityError>;
}

/// Fetches `/users/{handle}/events/public`, which only covers the last 90 days.
///
/// Rate limiting (403/429 with `X-RateLimit-Remaining: 0` and a reset time)
/// blocks the calling thread until the reset, bounded by [`RetryPolicy`].
pub struct RateLimitedActivityClient {
    base_url: String,
    retry: RetryPolicy,
    transport: Box<dyn Transport>,
    sleeper: Box<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl RateLimitedActivityClient {
    pub fn new(
        base_url: impl Into<String>,
        retry: RetryPolicy,
        transport: Box<dyn Transport>,
        sleeper: Box<dyn Sleeper>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
            transport,
            sleeper,
            clock,
        }
    }

    pub fn events_url(&self, handle: &str) -> String {
        format!("{}/users/{}/events/public", self.base_url, handle)
    }

    /// Returns `Ok(true)` when the caller should retry the request.
    fn handle_rate_limit(&self, resp: &HttpResponse, retries: &mut u32) -> Result<bool, ActivityError> {
        let reset = resp.header("X-RateLimit-Reset").and_then(|v| v.trim().parse::<i64>().ok());
        let remaining = resp.header("X-RateLimit-Remaining").map(str::trim);
        let Some(reset) = reset else {
            return Ok(false);
        };
        if remaining != Some("0") {
            return Ok(false);
        }

        *retries += 1;
        if *retries > self.retry.max_retries {
            return Err(ActivityError::RetriesExhausted { max_retries: self.retry.max_retries });
        }

        match rate_limit_wait(reset, self.clock.now(), self.retry.max_wait_secs) {
            RateLimitWait::RetryNow => {}
            RateLimitWait::SleepSecs(wait_secs) => {
                info!("rate limited, waiting {wait_secs}s (retry {}/{})", retries, self.retry.max_retries);
                self.sleeper.sleep(Duration::from_secs(wait_secs));
            }
            RateLimitWait::TooLong(wait_secs) => {
                return Err(ActivityError::WaitTooLong { wait_secs, max_wait_secs: self.retry.max_wait_secs });
            }
        }
        Ok(true)
    }
}

impl ActivitySource for RateLimitedActivityClient {
    fn fetch(&self, handle: &str, handle_missing_as_empty: bool) -> Result<Vec<ActivityRecord>, ActivityError> {
        info!("fetching recent activity for {handle}");
        let url = self.events_url(handle);
        let headers = [("Accept", "application/vnd.github+json")];

        let mut retries = 0;
        loop {
            let resp = self.transport.get(&url, &headers)?;

            if resp.status == 404 {
                if handle_missing_as_empty {
                    warn!("handle not found, treating as no activity: {handle}");
                    return Ok(vec![]);
                }
                return Err(ActivityError::NotFound(handle.to_string()));
            }

            if matches!(resp.status, 403 | 429) && self.handle_rate_limit(&resp, &mut retries)? {
                continue;
            }

            if !resp.is_success() {
                return Err(ActivityError::Status { status: resp.status, url });
            }

            return decode_events(&resp.body);
        }
    }
}

fn decode_events(body: &[u8]) -> Result<Vec<ActivityRecord>, ActivityError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| ActivityError::Decode(e.to_string()))?;
    let events = value
        .as_array()
        .ok_or_else(|| ActivityError::Decode("expected a JSON array of events".to_string()))?;

    let records = events
        .iter()
        .map(|event| {
            let record = ActivityRecord::from_json(event);
            let kind = record.kind.as_deref().unwrap_or("unknown");
            match record.created_at {
                Some(at) => debug!("{kind} at {}", at.to_rfc3339()),
                None => match event.get("created_at").filter(|v| !v.is_null()) {
                    Some(raw) => warn!("ignoring {kind} with unparseable created_at: {raw}"),
                    None => debug!("{kind} without created_at"),
                },
            }
            record
        })
        .collect::<Vec<_>>();
    info!("fetched {} events", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use deadman_core::FixedClock;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Transport for ScriptedTransport {
        fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse, ActivityError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ActivityError::Transport("script exhausted".into()))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper(Arc<Mutex<Vec<Duration>>>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    struct Harness {
        client: RateLimitedActivityClient,
        calls: Arc<Mutex<Vec<String>>>,
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap()
    }

    fn harness(responses: Vec<HttpResponse>) -> Harness {
        let calls = Arc::new(Mutex::new(vec![]));
        let sleeps = Arc::new(Mutex::new(vec![]));
        let transport = ScriptedTransport { responses: Mutex::new(responses.into()), calls: calls.clone() };
        let client = RateLimitedActivityClient::new(
            "https://api.example.test/",
            RetryPolicy::default(),
            Box::new(transport),
            Box::new(RecordingSleeper(sleeps.clone())),
            Arc::new(FixedClock(now())),
        );
        Harness { client, calls, sleeps }
    }

    fn events_ok() -> HttpResponse {
        HttpResponse::new(200).with_body(r#"[{"type":"PushEvent","created_at":"2024-03-30T08:00:00Z"}]"#)
    }

    fn rate_limited(status: u16, reset_in_secs: i64) -> HttpResponse {
        HttpResponse::new(status)
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("X-RateLimit-Reset", (now().timestamp() + reset_in_secs).to_string())
    }

    #[test]
    fn fetches_events_from_handle_url() {
        let h = harness(vec![events_ok()]);
        let records = h.client.fetch("octocat", true).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind.as_deref(), Some("PushEvent"));
        assert_eq!(
            h.calls.lock().unwrap().as_slice(),
            ["https://api.example.test/users/octocat/events/public"]
        );
    }

    #[test]
    fn not_found_is_empty_when_configured() {
        let h = harness(vec![HttpResponse::new(404)]);
        assert!(h.client.fetch("ghost", true).unwrap().is_empty());
        assert_eq!(h.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn not_found_is_fatal_otherwise() {
        let h = harness(vec![HttpResponse::new(404)]);
        assert!(matches!(h.client.fetch("ghost", false), Err(ActivityError::NotFound(_))));
    }

    #[test]
    fn waits_for_reset_then_retries_once() {
        let h = harness(vec![rate_limited(429, 5), events_ok()]);
        let records = h.client.fetch("octocat", true).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(h.calls.lock().unwrap().len(), 2);
        assert_eq!(h.sleeps.lock().unwrap().as_slice(), [Duration::from_secs(6)]);
    }

    #[test]
    fn forbidden_with_exhausted_quota_is_rate_limit() {
        let h = harness(vec![rate_limited(403, 10), events_ok()]);
        assert!(h.client.fetch("octocat", true).is_ok());
        assert_eq!(h.sleeps.lock().unwrap().len(), 1);
    }

    #[test]
    fn reset_beyond_ceiling_fails_fast() {
        let h = harness(vec![rate_limited(429, 3600), events_ok()]);
        let err = h.client.fetch("octocat", true).unwrap_err();
        assert!(matches!(err, ActivityError::WaitTooLong { max_wait_secs: 600, .. }));
        assert!(h.sleeps.lock().unwrap().is_empty());
        assert_eq!(h.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn reset_in_the_past_retries_without_sleeping() {
        let h = harness(vec![rate_limited(429, -10), events_ok()]);
        assert!(h.client.fetch("octocat", true).is_ok());
        assert!(h.sleeps.lock().unwrap().is_empty());
        assert_eq!(h.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let h = harness((0..5).map(|_| rate_limited(429, 1)).collect());
        let err = h.client.fetch("octocat", true).unwrap_err();
        assert!(matches!(err, ActivityError::RetriesExhausted { max_retries: 3 }));
        assert_eq!(h.calls.lock().unwrap().len(), 4);
        assert_eq!(h.sleeps.lock().unwrap().len(), 3);
    }

    #[test]
    fn forbidden_without_quota_headers_is_fatal() {
        let h = harness(vec![HttpResponse::new(403)]);
        assert!(matches!(h.client.fetch("octocat", true), Err(ActivityError::Status { status: 403, .. })));
    }

    #[test]
    fn rate_limit_with_quota_left_is_fatal() {
        let resp = HttpResponse::new(429)
            .with_header("X-RateLimit-Remaining", "12")
            .with_header("X-RateLimit-Reset", now().timestamp().to_string());
        let h = harness(vec![resp]);
        assert!(matches!(h.client.fetch("octocat", true), Err(ActivityError::Status { status: 429, .. })));
        assert!(h.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn server_error_is_fatal() {
        let h = harness(vec![HttpResponse::new(502)]);
        assert!(matches!(h.client.fetch("octocat", true), Err(ActivityError::Status { status: 502, .. })));
    }

    #[test]
    fn non_array_body_is_decode_error() {
        let h = harness(vec![HttpResponse::new(200).with_body(r#"{"message":"nope"}"#)]);
        assert!(matches!(h.client.fetch("octocat", true), Err(ActivityError::Decode(_))));
    }

    #[test]
    fn empty_array_is_no_activity() {
        let h = harness(vec![HttpResponse::new(200).with_body("[]")]);
        assert!(h.client.fetch("octocat", false).unwrap().is_empty());
    }
}
