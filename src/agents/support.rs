//! Support specialist - rule-based responder
//!
//! Reads the router's task brief (or a bare query), analyses it, and
//! answers with one text fragment for the analysis plus one per support
//! intent it handled.

use crate::protocol::Artifact;
use crate::routing::{Intent, Priority, TaskBrief};
use crate::server::TaskHandler;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

const BILLING_WORDS: &[&str] = &["billing", "charge", "invoice", "payment", "refund"];
const CANCELLATION_WORDS: &[&str] = &["cancel", "cancellation", "stop", "terminate"];
const UPGRADE_WORDS: &[&str] = &["upgrade", "premium", "better plan"];
const URGENT_WORDS: &[&str] = &["urgent", "emergency", "asap", "immediately", "down", "broken"];

const HIGH_PRIORITY_WORDS: &[&str] = &["urgent", "immediately", "asap", "emergency", "charged twice", "fraud"];
const MEDIUM_PRIORITY_WORDS: &[&str] = &["broken", "not working", "error", "failed"];
const URGENT_BILLING_WORDS: &[&str] = &["charged twice", "double charge", "refund", "unauthorized", "fraud"];
const REPORTED_KEYWORDS: &[&str] = &["billing", "cancel", "upgrade", "urgent", "refund"];

const SUMMARY_CHARS: usize = 100;

pub const ARTIFACT_NAME: &str = "support_response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Billing,
    Cancellation,
    Upgrade,
    Urgent,
    General,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestType::Billing => "billing",
            RequestType::Cancellation => "cancellation",
            RequestType::Upgrade => "upgrade",
            RequestType::Urgent => "urgent",
            RequestType::General => "general",
        };
        f.write_str(name)
    }
}

/// Support's own three-level urgency scale, finer than the router's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SupportPriority {
    Low,
    Medium,
    High,
}

impl fmt::Display for SupportPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupportPriority::Low => "LOW",
            SupportPriority::Medium => "MEDIUM",
            SupportPriority::High => "HIGH",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportAnalysis {
    pub request_type: RequestType,
    pub priority: SupportPriority,
    pub keywords: Vec<String>,
}

fn mentions(text: &str, words: &[&str]) -> bool {
    words.iter().any(|word| text.contains(word))
}

/// Detect the dominant request type and priority of a support request.
pub fn analyze(request: &str) -> SupportAnalysis {
    let lowered = request.to_lowercase();

    let request_type = if mentions(&lowered, BILLING_WORDS) {
        RequestType::Billing
    } else if mentions(&lowered, CANCELLATION_WORDS) {
        RequestType::Cancellation
    } else if mentions(&lowered, UPGRADE_WORDS) {
        RequestType::Upgrade
    } else if mentions(&lowered, URGENT_WORDS) {
        RequestType::Urgent
    } else {
        RequestType::General
    };

    let priority = if mentions(&lowered, HIGH_PRIORITY_WORDS) {
        SupportPriority::High
    } else if mentions(&lowered, MEDIUM_PRIORITY_WORDS) {
        SupportPriority::Medium
    } else {
        SupportPriority::Low
    };

    let keywords = REPORTED_KEYWORDS
        .iter()
        .filter(|word| lowered.contains(*word))
        .map(|word| word.to_string())
        .collect();

    SupportAnalysis {
        request_type,
        priority,
        keywords,
    }
}

fn bullets(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| format!("  - {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn billing_response(query: &str, escalated: bool) -> String {
    let urgent = escalated || mentions(&query.to_lowercase(), URGENT_BILLING_WORDS);
    let (resolution, priority) = if urgent {
        ("4-8 hours", "HIGH")
    } else {
        ("24-48 hours", "NORMAL")
    };

    format!(
        "Billing: I understand you have a billing concern. Let me help you with that.\n{}\nEscalation required: {}\nEstimated resolution: {}\nPriority: {}",
        bullets(&[
            "Reviewing billing history",
            "Checking for discrepancies",
            "Initiating resolution process if needed",
        ]),
        if urgent { "yes" } else { "no" },
        resolution,
        priority
    )
}

fn cancellation_response() -> String {
    format!(
        "Cancellation: I'm sorry to hear you're considering cancellation.\nBefore you go:\n{}\nNext steps:\n{}",
        bullets(&[
            "Would you like to discuss any concerns before canceling?",
            "We can offer a 30-day pause instead of full cancellation",
            "There may be a plan that better fits your needs",
        ]),
        bullets(&[
            "Please confirm your cancellation request",
            "You'll receive a confirmation email",
            "Any remaining credits will be applied to your final bill",
        ])
    )
}

fn upgrade_response() -> String {
    format!(
        "Upgrade: Great! I can help you upgrade your account.\n{}\nCurrent promotion: Upgrade now and get 20% off your first 3 months!",
        bullets(&[
            "Premium ($19.99/mo): Priority support, Extended storage, Advanced analytics",
            "Enterprise ($49.99/mo): 24/7 support, Unlimited storage, Custom integrations, Dedicated account manager",
        ])
    )
}

fn urgent_response(query: &str, customer_id: Option<i64>) -> String {
    let summary: String = query.chars().take(SUMMARY_CHARS).collect();
    let customer = customer_id
        .map(|id| format!("Customer ID: {}\n", id))
        .unwrap_or_default();

    format!(
        "Urgent: I understand this is urgent. I'm escalating this immediately.\n{}\n{}Issue summary: {}",
        bullets(&[
            "Issue logged as HIGH priority",
            "Escalated to senior support team",
            "You will receive a callback within 2 hours",
        ]),
        customer,
        summary
    )
}

fn general_response(query: &str) -> String {
    format!(
        "General support: Hello! I'm here to help you today.\nI can help with:\n{}\nQuery received: {}\nPlease let me know what specific help you need.",
        bullets(&[
            "View your account information",
            "Check ticket history",
            "Report a new issue",
            "Billing questions",
            "Account upgrades",
            "Technical support",
        ]),
        query
    )
}

#[derive(Debug, Default)]
pub struct SupportAgent;

impl SupportAgent {
    pub fn new() -> Self {
        Self
    }

    /// Fragments for one request: the analysis first, then one per handled intent.
    pub fn respond(&self, text: &str) -> Vec<String> {
        let brief = TaskBrief::parse(text);
        let analysis = analyze(&brief.query);
        let escalated = brief.priority == Priority::High || analysis.priority == SupportPriority::High;

        tracing::info!(
            request_type = %analysis.request_type,
            priority = %analysis.priority,
            "[SupportAgent] Handling {:?}",
            brief.intents
        );

        let keywords = if analysis.keywords.is_empty() {
            "none".to_string()
        } else {
            analysis.keywords.join(", ")
        };
        let mut fragments = vec![format!(
            "Support analysis: type {}, priority {}, keywords: {}",
            analysis.request_type, analysis.priority, keywords
        )];

        for intent in &brief.intents {
            let fragment = match intent {
                Intent::Billing => billing_response(&brief.query, escalated),
                Intent::Cancellation => cancellation_response(),
                Intent::Upgrade => upgrade_response(),
                Intent::Urgent => urgent_response(&brief.query, brief.params.customer_id),
                Intent::General => general_response(&brief.query),
                _ => continue,
            };
            fragments.push(fragment);
        }

        // Only the analysis so far: nothing here was a support intent.
        if fragments.len() == 1 {
            fragments.push(general_response(&brief.query));
        }

        fragments
    }
}

#[async_trait]
impl TaskHandler for SupportAgent {
    async fn handle(&self, text: &str) -> anyhow::Result<Vec<Artifact>> {
        Ok(vec![Artifact::from_fragments(ARTIFACT_NAME, self.respond(text))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ParameterSet;

    #[test]
    fn test_analyze_double_charge() {
        let analysis = analyze("I've been charged twice, please refund immediately!");
        assert_eq!(analysis.request_type, RequestType::Billing);
        assert_eq!(analysis.priority, SupportPriority::High);
        assert_eq!(analysis.keywords, vec!["refund".to_string()]);
    }

    #[test]
    fn test_analyze_medium_and_low() {
        assert_eq!(analyze("the export is not working").priority, SupportPriority::Medium);
        assert_eq!(analyze("hello there").priority, SupportPriority::Low);
        assert_eq!(analyze("hello there").request_type, RequestType::General);
    }

    #[test]
    fn test_one_fragment_per_support_intent() {
        let brief = TaskBrief::new(
            vec![Intent::Billing, Intent::Urgent],
            ParameterSet::default(),
            Priority::High,
            "I've been charged twice, please refund immediately!",
        );

        let fragments = SupportAgent::new().respond(&brief.render());

        assert_eq!(fragments.len(), 3);
        assert!(fragments[0].starts_with("Support analysis"));
        assert!(fragments[1].starts_with("Billing"));
        assert!(fragments[1].contains("4-8 hours"));
        assert!(fragments[2].starts_with("Urgent"));
    }

    #[test]
    fn test_upgrade_with_customer_id() {
        let brief = TaskBrief::new(
            vec![Intent::Upgrade],
            ParameterSet {
                customer_id: Some(1),
                email: None,
            },
            Priority::Normal,
            "I'm customer 1 and need help upgrading my account",
        );

        let fragments = SupportAgent::new().respond(&brief.render());

        assert_eq!(fragments.len(), 2);
        assert!(fragments[1].contains("Premium ($19.99/mo)"));
    }

    #[test]
    fn test_data_only_brief_gets_general_help() {
        let brief = TaskBrief::new(
            vec![Intent::Report],
            ParameterSet::default(),
            Priority::Normal,
            "report",
        );

        let fragments = SupportAgent::new().respond(&brief.render());

        assert_eq!(fragments.len(), 2);
        assert!(fragments[1].starts_with("General support"));
    }

    #[test]
    fn test_bare_query_is_classified_locally() {
        let fragments = SupportAgent::new().respond("Please cancel my subscription");
        assert!(fragments.iter().any(|f| f.starts_with("Cancellation")));
    }

    #[tokio::test]
    async fn test_handler_returns_single_artifact() {
        let artifacts = SupportAgent::new().handle("asdkjh").await.unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name.as_deref(), Some(ARTIFACT_NAME));
        assert_eq!(artifacts[0].parts.len(), 2);
    }
}
