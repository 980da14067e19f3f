//! Intent Classifier - keyword and regex based
//!
//! Information Hiding:
//! - Trigger tables are compiled once and never exposed
//! - Parameter extraction patterns are internal
//! - Exposes a single total function: `classify`

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named category a query can fall into.
///
/// Declaration order is the order intents are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GetCustomer,
    ViewHistory,
    UpdateCustomer,
    CreateTicket,
    Report,
    Billing,
    Cancellation,
    Upgrade,
    Urgent,
    General,
}

impl Intent {
    pub const ALL: [Intent; 10] = [
        Intent::GetCustomer,
        Intent::ViewHistory,
        Intent::UpdateCustomer,
        Intent::CreateTicket,
        Intent::Report,
        Intent::Billing,
        Intent::Cancellation,
        Intent::Upgrade,
        Intent::Urgent,
        Intent::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::GetCustomer => "get_customer",
            Intent::ViewHistory => "view_history",
            Intent::UpdateCustomer => "update_customer",
            Intent::CreateTicket => "create_ticket",
            Intent::Report => "report",
            Intent::Billing => "billing",
            Intent::Cancellation => "cancellation",
            Intent::Upgrade => "upgrade",
            Intent::Urgent => "urgent",
            Intent::General => "general",
        }
    }

    pub fn parse(name: &str) -> Option<Intent> {
        Intent::ALL
            .iter()
            .copied()
            .find(|intent| intent.as_str() == name.trim())
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Normal,
}

impl Priority {
    pub fn for_intents(intents: &[Intent]) -> Self {
        if intents.contains(&Intent::Urgent) || intents.contains(&Intent::Billing) {
            Priority::High
        } else {
            Priority::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Normal => "NORMAL",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured values pulled out of the query text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ParameterSet {
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Never empty; falls back to `[General]`.
    pub intents: Vec<Intent>,
    pub params: ParameterSet,
    pub priority: Priority,
}

impl Classification {
    pub fn is_multi_intent(&self) -> bool {
        self.intents.len() > 1
    }
}

/// Triggers are matched against the lower-cased query.
const TRIGGERS: &[(Intent, &[&str])] = &[
    (
        Intent::GetCustomer,
        &[
            r"get customer",
            r"customer info",
            r"customer\s*(?:id\s*)?#?\s*\d+",
            r"who is customer",
        ],
    ),
    (
        Intent::ViewHistory,
        &[r"ticket history", r"show.*tickets", r"my tickets", r"past.*tickets"],
    ),
    (
        Intent::UpdateCustomer,
        &[r"update.*email", r"change.*email", r"update.*info", r"change.*phone"],
    ),
    (
        Intent::CreateTicket,
        &[r"new ticket", r"create.*ticket", r"report.*issue"],
    ),
    (
        Intent::Report,
        &[r"show.*all", r"active.*customers.*open.*tickets", r"report"],
    ),
    (
        Intent::Billing,
        &[r"billing", r"charge", r"invoice", r"refund", r"charged twice"],
    ),
    (
        Intent::Cancellation,
        &[r"cancel", r"cancellation", r"close.*account"],
    ),
    (Intent::Upgrade, &[r"upgrad", r"premium", r"better plan"]),
    (
        Intent::Urgent,
        &[r"urgent", r"emergency", r"immediately", r"asap", r"down", r"broken"],
    ),
];

static COMPILED_TRIGGERS: Lazy<Vec<(Intent, Vec<Regex>)>> = Lazy::new(|| {
    TRIGGERS
        .iter()
        .map(|(intent, patterns)| {
            let compiled = patterns
                .iter()
                .map(|pattern| Regex::new(pattern).expect("intent trigger must compile"))
                .collect();
            (*intent, compiled)
        })
        .collect()
});

static CUSTOMER_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:customer\s*(?:id|#)?|id)\s*#?\s*(\d+)").expect("customer id pattern must compile")
});

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("email pattern must compile"));

/// Classify a query. Total over all inputs: the intent list is never empty.
pub fn classify(text: &str) -> Classification {
    let lowered = text.to_lowercase();

    let mut intents: Vec<Intent> = COMPILED_TRIGGERS
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(&lowered)))
        .map(|(intent, _)| *intent)
        .collect();

    if intents.is_empty() {
        intents.push(Intent::General);
    }

    let params = extract_parameters(text, &lowered);
    let priority = Priority::for_intents(&intents);

    tracing::debug!(
        "[Classifier] intents={:?} params={:?} priority={}",
        intents,
        params,
        priority
    );

    Classification {
        intents,
        params,
        priority,
    }
}

fn extract_parameters(raw: &str, lowered: &str) -> ParameterSet {
    let customer_id = CUSTOMER_ID
        .captures(lowered)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok());

    // Emails keep their original casing.
    let email = EMAIL.find(raw).map(|m| m.as_str().to_string());

    ParameterSet { customer_id, email }
}
