//! Task brief - the text handed to each downstream service
//!
//! The router prepends a few `Key: value` lines to the original query so a
//! specialist sees what was already worked out. It is plain text, not a
//! negotiated format: a specialist receiving a bare query classifies it
//! itself.

use crate::routing::intent::{classify, Intent, ParameterSet, Priority};

const INTENTS: &str = "Intents:";
const CUSTOMER_ID: &str = "Customer ID:";
const EMAIL: &str = "Email:";
const PRIORITY: &str = "Priority:";
const QUERY: &str = "Query:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBrief {
    pub intents: Vec<Intent>,
    pub params: ParameterSet,
    pub priority: Priority,
    pub query: String,
}

impl TaskBrief {
    pub fn new(intents: Vec<Intent>, params: ParameterSet, priority: Priority, query: &str) -> Self {
        Self {
            intents,
            params,
            priority,
            query: query.to_string(),
        }
    }

    pub fn render(&self) -> String {
        let names: Vec<&str> = self.intents.iter().map(|i| i.as_str()).collect();
        let mut lines = vec![format!("{} {}", INTENTS, names.join(", "))];

        if let Some(id) = self.params.customer_id {
            lines.push(format!("{} {}", CUSTOMER_ID, id));
        }
        if let Some(email) = &self.params.email {
            lines.push(format!("{} {}", EMAIL, email));
        }
        lines.push(format!("{} {}", PRIORITY, self.priority));
        lines.push(format!("{} {}", QUERY, self.query));

        lines.join("\n")
    }

    /// Read a brief back. Text without an `Intents:` header is classified
    /// as a raw query instead.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines();
        let intents_line = match lines.next().and_then(|l| l.strip_prefix(INTENTS)) {
            Some(rest) => rest,
            None => return Self::from_query(text),
        };

        let intents: Vec<Intent> = intents_line.split(',').filter_map(Intent::parse).collect();
        let mut params = ParameterSet::default();
        let mut priority = None;
        let mut query = String::new();

        while let Some(line) = lines.next() {
            if let Some(value) = line.strip_prefix(CUSTOMER_ID) {
                params.customer_id = value.trim().parse().ok();
            } else if let Some(value) = line.strip_prefix(EMAIL) {
                params.email = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix(PRIORITY) {
                priority = match value.trim() {
                    "HIGH" => Some(Priority::High),
                    "NORMAL" => Some(Priority::Normal),
                    _ => None,
                };
            } else if let Some(value) = line.strip_prefix(QUERY) {
                // The query is last and may span lines.
                let rest: Vec<&str> = lines.by_ref().collect();
                query = std::iter::once(value.trim_start())
                    .chain(rest)
                    .collect::<Vec<_>>()
                    .join("\n");
                break;
            }
        }

        if intents.is_empty() {
            return Self::from_query(&query);
        }

        let priority = priority.unwrap_or_else(|| Priority::for_intents(&intents));
        Self {
            intents,
            params,
            priority,
            query,
        }
    }

    fn from_query(text: &str) -> Self {
        let classification = classify(text);
        Self {
            intents: classification.intents,
            params: classification.params,
            priority: classification.priority,
            query: text.to_string(),
        }
    }
}
