//! Response Synthesizer
//!
//! Pure merge of downstream outcomes into one reply. No I/O; every outcome
//! is reported, successful or not.

use crate::coordinator::dispatcher::{CallStatus, DownstreamOutcome};
use crate::routing::{Classification, Intent, ParameterSet, Priority};
use serde::{Deserialize, Serialize};

pub const NOTHING_CONSULTED: &str = "No downstream service was consulted.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedResponse {
    pub query: String,
    pub intents: Vec<Intent>,
    pub params: ParameterSet,
    pub priority: Priority,
    pub outcomes: Vec<DownstreamOutcome>,
    /// True iff every outcome succeeded. Vacuously true for no outcomes.
    pub overall_success: bool,
    pub text: String,
}

impl SynthesizedResponse {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

pub fn synthesize(
    query: &str,
    classification: &Classification,
    outcomes: Vec<DownstreamOutcome>,
) -> SynthesizedResponse {
    let overall_success = outcomes.iter().all(DownstreamOutcome::succeeded);
    let text = render(query, classification, &outcomes, overall_success);

    SynthesizedResponse {
        query: query.to_string(),
        intents: classification.intents.clone(),
        params: classification.params.clone(),
        priority: classification.priority,
        outcomes,
        overall_success,
        text,
    }
}

fn render(
    query: &str,
    classification: &Classification,
    outcomes: &[DownstreamOutcome],
    overall_success: bool,
) -> String {
    let names: Vec<&str> = classification.intents.iter().map(|i| i.as_str()).collect();
    let mut out = vec![
        format!("Query: {}", query),
        format!(
            "Intents: {} (priority {})",
            names.join(", "),
            classification.priority
        ),
    ];

    if outcomes.is_empty() {
        out.push(NOTHING_CONSULTED.to_string());
        return out.join("\n");
    }

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    if overall_success {
        out.push(format!("Status: all {} service(s) responded", outcomes.len()));
    } else {
        out.push(format!(
            "Status: {} of {} service(s) failed",
            failed,
            outcomes.len()
        ));
    }

    for outcome in outcomes {
        out.push(String::new());
        match &outcome.status {
            CallStatus::Succeeded { fragments, .. } => {
                out.push(format!("[{}]", outcome.service));
                if fragments.is_empty() {
                    out.push("(no content)".to_string());
                }
                out.extend(fragments.iter().cloned());
            }
            _ => {
                out.push(format!("[{}] FAILED", outcome.service));
                if let Some(error) = outcome.error_message() {
                    out.push(format!("ERROR: {}", error));
                }
            }
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TransportError;
    use crate::routing::{classify, ServiceId};

    fn outcome(service: ServiceId, status: CallStatus) -> DownstreamOutcome {
        DownstreamOutcome {
            service,
            address: Some("http://localhost".to_string()),
            intents: vec![],
            request: String::new(),
            elapsed_ms: 1,
            status,
        }
    }

    fn ok(service: ServiceId, text: &str) -> DownstreamOutcome {
        outcome(
            service,
            CallStatus::Succeeded {
                task_id: "t".to_string(),
                fragments: vec![text.to_string()],
            },
        )
    }

    #[test]
    fn test_all_succeeded() {
        let classification = classify("customer 1 wants an upgrade");
        let response = synthesize(
            "customer 1 wants an upgrade",
            &classification,
            vec![
                ok(ServiceId::CustomerData, "Customer: Alice"),
                ok(ServiceId::Support, "Upgrade options"),
            ],
        );

        assert!(response.overall_success);
        assert_eq!(response.failed_count(), 0);
        let data_at = response.text.find("Customer: Alice").unwrap();
        let support_at = response.text.find("Upgrade options").unwrap();
        assert!(data_at < support_at);
    }

    #[test]
    fn test_partial_failure_keeps_every_outcome() {
        let classification = classify("customer 1 wants an upgrade");
        let response = synthesize(
            "customer 1 wants an upgrade",
            &classification,
            vec![
                ok(ServiceId::CustomerData, "Customer: Alice"),
                outcome(
                    ServiceId::Support,
                    CallStatus::TransportFailed {
                        error: TransportError::Connect {
                            message: "connection refused".to_string(),
                        },
                    },
                ),
            ],
        );

        assert!(!response.overall_success);
        assert_eq!(response.outcomes.len(), 2);
        assert!(response.text.contains("Customer: Alice"));
        assert!(response.text.contains("[support_agent] FAILED"));
        assert!(response.text.contains("ERROR: "));
        assert!(response.text.contains("connection refused"));
    }

    #[test]
    fn test_timeout_beside_success() {
        let classification = classify("customer 1 wants an upgrade");
        let response = synthesize(
            "customer 1 wants an upgrade",
            &classification,
            vec![
                ok(ServiceId::CustomerData, "Customer: Alice"),
                outcome(
                    ServiceId::Support,
                    CallStatus::TimedOut {
                        error: "no reply within 1500ms".to_string(),
                    },
                ),
            ],
        );

        assert!(!response.overall_success);
        assert_eq!(response.failed_count(), 1);
        assert!(response.text.contains("Status: 1 of 2 service(s) failed"));
        assert!(response.text.contains("[customer_data_agent]\nCustomer: Alice"));
        assert!(response
            .text
            .contains("[support_agent] FAILED\nERROR: timed out: no reply within 1500ms"));
    }

    #[test]
    fn test_application_error_counts_as_failure() {
        let classification = classify("asdkjh");
        let response = synthesize(
            "asdkjh",
            &classification,
            vec![outcome(
                ServiceId::Support,
                CallStatus::ApplicationError {
                    task_id: "t".to_string(),
                    error: crate::client::RemoteError {
                        code: Some(-32602),
                        message: "bad params".to_string(),
                    },
                },
            )],
        );

        assert!(!response.overall_success);
        assert!(response.text.contains("bad params"));
    }

    #[test]
    fn test_no_outcomes_is_vacuous_success() {
        let classification = classify("asdkjh");
        let response = synthesize("asdkjh", &classification, vec![]);

        assert!(response.overall_success);
        assert!(response.text.contains(NOTHING_CONSULTED));
    }
}
