use crate::{
    fcm_sender::{FcmClient, FcmError},
    models::{DispatchReport, FailedDelivery, FcmPayload},
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Number of characters of a token kept in failure reports.
const TOKEN_REPORT_PREFIX_CHARS: usize = 20;

/// Sends `template` to every token, holding at most `limit` sends in flight.
///
/// Admission is a semaphore window: a permit is acquired before each send is
/// spawned, so a new send is admitted exactly when an in-flight one completes
/// and the outstanding count is below the limit. Per-token failures are
/// recorded and never abort the batch; each token gets exactly one attempt.
///
/// Results are recorded by input index, so the failure list follows the
/// input token order deterministically.
pub async fn dispatch(
    client: Arc<FcmClient>,
    tokens: Vec<String>,
    template: FcmPayload,
    limit: usize,
    has_image: bool,
) -> DispatchReport {
    let total_tokens = tokens.len();
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();
    let mut outcomes: Vec<Option<Result<(), FcmError>>> = vec![None; total_tokens];

    for (index, token) in tokens.into_iter().enumerate() {
        // Blocks admission once `limit` sends are unresolved.
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("dispatch semaphore closed");
        let client = Arc::clone(&client);
        let payload = template.clone();
        join_set.spawn(async move {
            let result = client.send_single(&token, payload).await;
            drop(permit);
            (index, token, result)
        });
    }

    let mut failed_tokens = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, token, result)) => {
                if let Err(e) = &result {
                    warn!(
                        token_prefix = %truncate_token(&token),
                        code = e.error_code(),
                        "Send failed for token"
                    );
                    failed_tokens.push((index, token));
                }
                outcomes[index] = Some(result);
            }
            Err(e) => {
                // A panicked send task; the slot stays empty and is counted
                // as a failure below.
                error!(error = %e, "Send task panicked");
            }
        }
    }

    let success_count = outcomes
        .iter()
        .filter(|o| matches!(o, Some(Ok(()))))
        .count();
    let failure_count = total_tokens - success_count;

    failed_tokens.sort_by_key(|(index, _)| *index);
    let failed_tokens = failed_tokens
        .into_iter()
        .map(|(index, token)| FailedDelivery {
            token: truncate_token(&token),
            error: match &outcomes[index] {
                Some(Err(e)) => e.error_code().to_string(),
                _ => "unknown_error".to_string(),
            },
        })
        .collect();

    debug!(
        total = total_tokens,
        success = success_count,
        failed = failure_count,
        "Dispatch completed"
    );

    DispatchReport {
        total_tokens,
        success_count,
        failure_count,
        failed_tokens,
        has_image,
    }
}

/// First 20 characters of the token plus an ellipsis, so full registration
/// tokens never leave the service.
pub fn truncate_token(token: &str) -> String {
    let prefix: String = token.chars().take(TOKEN_REPORT_PREFIX_CHARS).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcm_sender::{FcmClient, FcmError, MockFcmSender};
    use crate::models::{FcmNotification, FcmPayload};
    use std::time::Duration;

    fn template() -> FcmPayload {
        FcmPayload {
            notification: Some(FcmNotification {
                title: Some("t".to_string()),
                body: Some("b".to_string()),
            }),
            ..Default::default()
        }
    }

    fn client_with(mock: &MockFcmSender) -> Arc<FcmClient> {
        Arc::new(FcmClient::new_with_impl(Box::new(mock.clone())))
    }

    #[tokio::test]
    async fn test_counts_add_up_with_partial_failure() {
        let mock = MockFcmSender::new();
        mock.set_error_for_token("tokB", FcmError::InvalidToken);
        let client = client_with(&mock);

        let tokens = vec!["tokA".to_string(), "tokB".to_string(), "tokC".to_string()];
        let report = dispatch(client, tokens, template(), 20, false).await;

        assert_eq!(report.total_tokens, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.success_count + report.failure_count, report.total_tokens);
        assert_eq!(report.failed_tokens.len(), 1);
        assert_eq!(report.failed_tokens[0].token, "tokB...");
        assert_eq!(
            report.failed_tokens[0].error,
            "messaging/invalid-registration-token"
        );
    }

    #[tokio::test]
    async fn test_all_failures_still_complete() {
        let mock = MockFcmSender::new();
        mock.set_error_for_token("t1", FcmError::Unregistered);
        mock.set_error_for_token("t2", FcmError::QuotaExceeded);
        let client = client_with(&mock);

        let report = dispatch(
            client,
            vec!["t1".to_string(), "t2".to_string()],
            template(),
            20,
            false,
        )
        .await;

        assert_eq!(report.success_count, 0);
        assert_eq!(report.failure_count, 2);
        assert_eq!(report.failed_tokens[0].error, "messaging/registration-token-not-registered");
        assert_eq!(report.failed_tokens[1].error, "messaging/quota-exceeded");
    }

    #[tokio::test]
    async fn test_failure_list_follows_input_order() {
        let mock = MockFcmSender::new();
        mock.set_error_for_token("t0", FcmError::InvalidToken);
        mock.set_error_for_token("t3", FcmError::Unregistered);
        mock.set_send_delay(Duration::from_millis(5));
        let client = client_with(&mock);

        let tokens: Vec<String> = (0..5).map(|i| format!("t{}", i)).collect();
        let report = dispatch(client, tokens, template(), 3, false).await;

        assert_eq!(report.failed_tokens.len(), 2);
        assert_eq!(report.failed_tokens[0].token, "t0...");
        assert_eq!(report.failed_tokens[1].token, "t3...");
    }

    #[tokio::test]
    async fn test_concurrency_bound_enforced() {
        let mock = MockFcmSender::new();
        mock.set_send_delay(Duration::from_millis(20));
        let client = client_with(&mock);

        let tokens: Vec<String> = (0..30).map(|i| format!("token_{}", i)).collect();
        let report = dispatch(client, tokens, template(), 5, false).await;

        assert_eq!(report.success_count, 30);
        assert!(
            mock.max_in_flight() <= 5,
            "observed {} concurrent sends, limit was 5",
            mock.max_in_flight()
        );
    }

    #[tokio::test]
    async fn test_concurrency_does_not_stall_below_limit() {
        // With a limit far above the batch size every send must still go out.
        let mock = MockFcmSender::new();
        let client = client_with(&mock);

        let tokens: Vec<String> = (0..4).map(|i| format!("token_{}", i)).collect();
        let report = dispatch(client, tokens, template(), 100, false).await;

        assert_eq!(report.success_count, 4);
        assert_eq!(mock.get_sent_messages().len(), 4);
    }

    #[tokio::test]
    async fn test_zero_limit_treated_as_one() {
        let mock = MockFcmSender::new();
        let client = client_with(&mock);

        let report = dispatch(
            client,
            vec!["tok".to_string()],
            template(),
            0,
            false,
        )
        .await;
        assert_eq!(report.success_count, 1);
    }

    #[test]
    fn test_truncate_token_short() {
        assert_eq!(truncate_token("tokB"), "tokB...");
    }

    #[test]
    fn test_truncate_token_long() {
        let long = "a".repeat(200);
        let truncated = truncate_token(&long);
        assert_eq!(truncated, format!("{}...", "a".repeat(20)));
        assert_eq!(truncated.chars().count(), 23);
    }
}
