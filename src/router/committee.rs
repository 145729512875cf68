//! Committee aggregation
//!
//! Sends one request to several providers at once and reduces the replies to
//! a single answer. Calls run concurrently but results are kept in member
//! order, so the winner never depends on which reply arrived first.

use crate::error::{AppError, AppResult};
use crate::models::{CompletionRequest, PerformanceTracker, ProviderId, ProviderReply};
use crate::router::ProviderDispatcher;
use futures::future::join_all;
use std::sync::Arc;

/// Status reported for a committee whose winner never got a reply
const NO_REPLY_STATUS: u16 = 502;

/// Outcome of one member call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitteeAttempt {
    pub provider: ProviderId,
    /// `None` when the call failed before any reply
    pub status: Option<u16>,
    pub body: String,
}

impl CommitteeAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(status) if (200..300).contains(&status))
    }

    fn from_result(provider: ProviderId, result: AppResult<ProviderReply>) -> Self {
        match result {
            Ok(reply) => Self {
                provider,
                status: Some(reply.status),
                body: reply.body,
            },
            Err(e) => Self {
                provider,
                status: None,
                body: serde_json::json!({ "error": e.to_string() }).to_string(),
            },
        }
    }
}

/// Reduced committee result
#[derive(Debug, Clone)]
pub struct CommitteeVerdict {
    pub winner: CommitteeAttempt,
    /// Every attempt in invocation order
    pub attempts: Vec<CommitteeAttempt>,
}

impl CommitteeVerdict {
    /// Winner's status, or 502 if it never got a reply
    pub fn status(&self) -> u16 {
        self.winner.status.unwrap_or(NO_REPLY_STATUS)
    }

    pub fn succeeded(&self) -> bool {
        self.winner.is_success()
    }
}

/// Pick the committee winner
///
/// The first successful attempt in invocation order wins. With no success,
/// the longest body (in characters) wins and the earliest attempt breaks ties.
pub fn select_winner(attempts: &[CommitteeAttempt]) -> Option<&CommitteeAttempt> {
    if let Some(first_ok) = attempts.iter().find(|a| a.is_success()) {
        return Some(first_ok);
    }

    // Body length is measured in characters, not bytes
    let mut longest: Option<(&CommitteeAttempt, usize)> = None;
    for attempt in attempts {
        let chars = attempt.body.chars().count();
        match longest {
            Some((_, best)) if chars <= best => {}
            _ => longest = Some((attempt, chars)),
        }
    }
    longest.map(|(attempt, _)| attempt)
}

/// Fans a request out to a set of providers
pub struct CommitteeAggregator {
    dispatcher: Arc<ProviderDispatcher>,
    tracker: Arc<PerformanceTracker>,
}

impl CommitteeAggregator {
    pub fn new(dispatcher: Arc<ProviderDispatcher>, tracker: Arc<PerformanceTracker>) -> Self {
        Self {
            dispatcher,
            tracker,
        }
    }

    /// Run the committee over `members`
    ///
    /// Members in cooldown sit out unless every member is cooling down, in
    /// which case all of them are called.
    pub async fn run(
        &self,
        members: &[ProviderId],
        request: &CompletionRequest,
    ) -> AppResult<CommitteeVerdict> {
        let mut callable = Vec::with_capacity(members.len());
        for member in members {
            if self.tracker.is_available(member).await {
                callable.push(member.clone());
            }
        }
        if callable.is_empty() {
            callable = members.to_vec();
        }
        if callable.is_empty() {
            return Err(AppError::AllProvidersFailed(
                "committee has no members".to_string(),
            ));
        }

        tracing::debug!(
            members = ?callable.iter().map(ProviderId::as_str).collect::<Vec<_>>(),
            "Running committee"
        );

        let calls = callable
            .iter()
            .map(|member| self.dispatcher.call(member, request));
        let results = join_all(calls).await;

        let attempts: Vec<CommitteeAttempt> = callable
            .into_iter()
            .zip(results)
            .map(|(provider, result)| CommitteeAttempt::from_result(provider, result))
            .collect();

        let winner = select_winner(&attempts).cloned().ok_or_else(|| {
            AppError::AllProvidersFailed("committee produced no attempts".to_string())
        })?;

        tracing::info!(
            winner = %winner.provider,
            status = ?winner.status,
            attempts = attempts.len(),
            "Committee resolved"
        );

        Ok(CommitteeVerdict { winner, attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ProviderConfig};
    use crate::metrics::NoopSink;
    use crate::models::{AdapterError, ChatMessage, ProviderAdapter};
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::time::Duration;

    const CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 7010

[routing]
anthropic_provider = "claude"

[[providers]]
id = "llama"
type = "openai-compatible"
base_url = "http://localhost:9001/v1"
model = "llama3"

[[providers]]
id = "openai"
type = "openai"
base_url = "http://localhost:9002/v1"
model = "gpt"

[[providers]]
id = "claude"
type = "anthropic"
base_url = "http://localhost:9003/v1"
model = "claude"
"#;

    /// Answers 200 with the provider id as body and remembers who was called
    #[derive(Default)]
    struct EchoAdapter {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProviderAdapter for EchoAdapter {
        async fn call(
            &self,
            provider: &ProviderConfig,
            _request: &CompletionRequest,
        ) -> Result<ProviderReply, AdapterError> {
            self.calls.lock().unwrap().push(provider.id().to_string());
            Ok(ProviderReply::new(200, provider.id()))
        }
    }

    fn committee() -> (CommitteeAggregator, Arc<EchoAdapter>, Arc<PerformanceTracker>) {
        let config = Arc::new(Config::from_str(CONFIG).unwrap());
        let tracker = Arc::new(PerformanceTracker::new(&config.tracking));
        let adapter = Arc::new(EchoAdapter::default());
        let dispatcher = Arc::new(ProviderDispatcher::new(
            config,
            adapter.clone(),
            tracker.clone(),
            Arc::new(NoopSink),
        ));
        (
            CommitteeAggregator::new(dispatcher, tracker.clone()),
            adapter,
            tracker,
        )
    }

    async fn cool_down(tracker: &PerformanceTracker, provider: &str) {
        let provider = ProviderId::from(provider);
        for _ in 0..3 {
            tracker
                .record_result(&provider, false, Duration::from_millis(10))
                .await;
        }
        assert!(!tracker.is_available(&provider).await);
    }

    fn members() -> Vec<ProviderId> {
        ["llama", "openai", "claude"]
            .into_iter()
            .map(ProviderId::from)
            .collect()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::new("user", "hello")])
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooling_member_sits_out() {
        let (committee, adapter, tracker) = committee();
        cool_down(&tracker, "llama").await;

        let verdict = committee.run(&members(), &request()).await.unwrap();

        assert_eq!(*adapter.calls.lock().unwrap(), vec!["openai", "claude"]);
        assert_eq!(verdict.attempts.len(), 2);
        assert_eq!(verdict.winner.provider.as_str(), "openai");
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_cooling_calls_everyone() {
        let (committee, adapter, tracker) = committee();
        for provider in ["llama", "openai", "claude"] {
            cool_down(&tracker, provider).await;
        }

        let verdict = committee.run(&members(), &request()).await.unwrap();

        assert_eq!(
            *adapter.calls.lock().unwrap(),
            vec!["llama", "openai", "claude"]
        );
        assert_eq!(verdict.winner.provider.as_str(), "llama");
    }

    #[tokio::test]
    async fn test_empty_committee_is_an_error() {
        let (committee, _, _) = committee();
        let err = committee.run(&[], &request()).await.unwrap_err();
        assert!(matches!(err, AppError::AllProvidersFailed(_)));
    }

    fn attempt(provider: &str, status: Option<u16>, body: &str) -> CommitteeAttempt {
        CommitteeAttempt {
            provider: ProviderId::from(provider),
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_first_success_wins() {
        let attempts = vec![
            attempt("a", Some(200), "x"),
            attempt("b", Some(500), ""),
            attempt("c", Some(200), "yy"),
        ];
        assert_eq!(select_winner(&attempts).unwrap().body, "x");
    }

    #[test]
    fn test_success_beats_earlier_failure() {
        let attempts = vec![
            attempt("a", None, r#"{"error":"refused"}"#),
            attempt("b", Some(201), "ok"),
        ];
        assert_eq!(select_winner(&attempts).unwrap().provider.as_str(), "b");
    }

    #[test]
    fn test_all_failed_picks_longest_body() {
        let attempts = vec![
            attempt("a", Some(500), "short"),
            attempt("b", Some(429), "much longer body"),
            attempt("c", None, "mid-length"),
        ];
        assert_eq!(select_winner(&attempts).unwrap().provider.as_str(), "b");
    }

    #[test]
    fn test_longest_body_ties_go_to_earliest() {
        let attempts = vec![
            attempt("a", Some(500), "same"),
            attempt("b", Some(500), "same"),
        ];
        assert_eq!(select_winner(&attempts).unwrap().provider.as_str(), "a");
    }

    #[test]
    fn test_longest_body_counts_characters() {
        // 3 characters in 6 bytes loses to 4 ASCII characters
        let attempts = vec![
            attempt("a", Some(500), "ééé"),
            attempt("b", Some(500), "abcd"),
        ];
        assert_eq!(select_winner(&attempts).unwrap().provider.as_str(), "b");
    }

    #[test]
    fn test_no_attempts_no_winner() {
        assert!(select_winner(&[]).is_none());
    }

    #[test]
    fn test_verdict_status_for_missing_reply() {
        let failed = attempt("a", None, "{}");
        let verdict = CommitteeVerdict {
            winner: failed.clone(),
            attempts: vec![failed],
        };
        assert_eq!(verdict.status(), 502);
        assert!(!verdict.succeeded());
    }

    #[test]
    fn test_synthetic_attempt_carries_error_body() {
        let attempt = CommitteeAttempt::from_result(
            ProviderId::from("openai"),
            Err(AppError::ProviderCallFailed {
                provider: "openai".to_string(),
                reason: "refused".to_string(),
            }),
        );
        assert_eq!(attempt.status, None);
        let body: serde_json::Value = serde_json::from_str(&attempt.body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("refused"));
    }
}
