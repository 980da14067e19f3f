//! Customer Store - SQLite-backed customers and tickets
//!
//! Information Hiding:
//! - Schema, seed data and SQL are private to this module
//! - Connection sharing hidden behind a cloneable handle
//! - Row mapping into typed records is internal

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const CUSTOMER_STATUSES: &[&str] = &["active", "disabled"];
pub const TICKET_STATUSES: &[&str] = &["open", "in_progress", "resolved"];
pub const TICKET_PRIORITIES: &[&str] = &["low", "medium", "high"];

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL,
        issue TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'open',
        priority TEXT NOT NULL DEFAULT 'medium',
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (customer_id) REFERENCES customers(id)
    );
";

const SEED_CUSTOMERS: &[(&str, &str, &str, &str)] = &[
    ("John Doe", "john.doe@example.com", "+1-555-0101", "active"),
    ("Jane Smith", "jane.smith@example.com", "+1-555-0102", "active"),
    ("Bob Johnson", "bob.johnson@example.com", "+1-555-0103", "disabled"),
    ("Alice Williams", "alice.w@techcorp.com", "+1-555-0104", "active"),
    ("Charlie Brown", "charlie.brown@email.com", "+1-555-0105", "active"),
    ("Diana Prince", "diana.prince@company.org", "+1-555-0106", "active"),
    ("Edward Norton", "e.norton@business.net", "+1-555-0107", "active"),
];

const SEED_TICKETS: &[(i64, &str, &str, &str)] = &[
    (1, "Cannot login to account", "open", "high"),
    (1, "Password reset not working", "in_progress", "medium"),
    (2, "Billing question about invoice", "resolved", "low"),
    (4, "Database connection timeout", "in_progress", "high"),
    (5, "Feature request: dark mode", "open", "low"),
    (6, "Dashboard loading slowly", "open", "medium"),
    (7, "Payment processing failing", "open", "high"),
];

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, status, created_at, updated_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Customer {0} not found")]
    CustomerNotFound(i64),

    #[error("No fields to update")]
    NothingToUpdate,

    #[error("Invalid {field} '{value}', expected one of: {allowed}")]
    InvalidValue {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("database lock poisoned")]
    Poisoned,

    #[error("store task aborted: {0}")]
    Blocking(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Errors caused by the request rather than the store itself.
    pub fn is_application(&self) -> bool {
        matches!(
            self,
            StoreError::CustomerNotFound(_)
                | StoreError::NothingToUpdate
                | StoreError::InvalidValue { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub customer_id: i64,
    pub issue: String,
    pub status: String,
    pub priority: String,
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatistics {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

impl TicketStatistics {
    fn from_tickets(tickets: &[Ticket]) -> Self {
        let count = |status: &str| tickets.iter().filter(|t| t.status == status).count();
        Self {
            total: tickets.len(),
            open: count("open"),
            in_progress: count("in_progress"),
            resolved: count("resolved"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerHistory {
    pub customer: Customer,
    pub tickets: Vec<Ticket>,
    pub statistics: TicketStatistics,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

impl CustomerUpdate {
    /// Set fields in column order. Empty strings count as absent.
    fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("email", &self.email),
            ("phone", &self.phone),
            ("name", &self.name),
            ("status", &self.status),
        ]
        .into_iter()
        .filter_map(|(column, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (column, v))
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedCustomer {
    pub customer: Customer,
    pub updated_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    pub ticket: Ticket,
    pub customer_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTicket {
    pub id: i64,
    pub issue: String,
    pub priority: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerWithOpenTickets {
    pub customer: CustomerSummary,
    pub open_tickets: Vec<OpenTicket>,
    pub ticket_count: usize,
}

fn check(field: &'static str, value: &str, allowed: &[&str]) -> Result<(), StoreError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(StoreError::InvalidValue {
            field,
            value: value.to_string(),
            allowed: allowed.join(", "),
        })
    }
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get("id")?,
        customer_id: row.get("customer_id")?,
        issue: row.get("issue")?,
        status: row.get("status")?,
        priority: row.get("priority")?,
        created_at: row.get("created_at")?,
        customer_name: None,
    })
}

/// Cloneable handle over one SQLite connection.
#[derive(Clone)]
pub struct CustomerStore {
    conn: Arc<Mutex<Connection>>,
}

impl CustomerStore {
    /// Open (or create) the database at `path` and seed it when empty.
    /// `":memory:"` gives a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Self::initialize(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM customers", [], |row| row.get(0))?;
        if count == 0 {
            for (name, email, phone, status) in SEED_CUSTOMERS {
                conn.execute(
                    "INSERT INTO customers (name, email, phone, status) VALUES (?1, ?2, ?3, ?4)",
                    params![name, email, phone, status],
                )?;
            }
            for (customer_id, issue, status, priority) in SEED_TICKETS {
                conn.execute(
                    "INSERT INTO tickets (customer_id, issue, status, priority) VALUES (?1, ?2, ?3, ?4)",
                    params![customer_id, issue, status, priority],
                )?;
            }
            tracing::info!(
                "[CustomerStore] Seeded {} customers and {} tickets",
                SEED_CUSTOMERS.len(),
                SEED_TICKETS.len()
            );
        } else {
            tracing::info!("[CustomerStore] Opened existing database with {} customers", count);
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn find_customer(conn: &Connection, id: i64) -> Result<Option<Customer>, StoreError> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
        Ok(conn.query_row(&sql, [id], customer_from_row).optional()?)
    }

    pub fn get_customer(&self, id: i64) -> Result<Customer, StoreError> {
        let conn = self.lock()?;
        Self::find_customer(&conn, id)?.ok_or(StoreError::CustomerNotFound(id))
    }

    pub fn list_customers(&self, status: Option<&str>, limit: i64) -> Result<Vec<Customer>, StoreError> {
        let conn = self.lock()?;
        let customers = match status {
            Some(status) => {
                check("status", status, CUSTOMER_STATUSES)?;
                let sql = format!(
                    "SELECT {} FROM customers WHERE status = ?1 ORDER BY id LIMIT ?2",
                    CUSTOMER_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![status, limit], customer_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let sql = format!("SELECT {} FROM customers ORDER BY id LIMIT ?1", CUSTOMER_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([limit], customer_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(customers)
    }

    pub fn update_customer(&self, id: i64, update: &CustomerUpdate) -> Result<UpdatedCustomer, StoreError> {
        let fields = update.fields();
        if fields.is_empty() {
            return Err(StoreError::NothingToUpdate);
        }
        if let Some(status) = update.status.as_deref().filter(|s| !s.is_empty()) {
            check("status", status, CUSTOMER_STATUSES)?;
        }

        let conn = self.lock()?;
        if Self::find_customer(&conn, id)?.is_none() {
            return Err(StoreError::CustomerNotFound(id));
        }

        let set_clause = fields
            .iter()
            .map(|(column, _)| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE customers SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            set_clause
        );

        let mut values: Vec<SqlValue> = fields
            .iter()
            .map(|(_, value)| SqlValue::Text(value.to_string()))
            .collect();
        values.push(SqlValue::Integer(id));
        conn.execute(&sql, params_from_iter(values.iter()))?;

        let customer = Self::find_customer(&conn, id)?.ok_or(StoreError::CustomerNotFound(id))?;
        tracing::info!("[CustomerStore] Updated customer {} ({:?})", id, fields);

        Ok(UpdatedCustomer {
            customer,
            updated_fields: fields.iter().map(|(column, _)| column.to_string()).collect(),
        })
    }

    pub fn create_ticket(&self, customer_id: i64, issue: &str, priority: &str) -> Result<CreatedTicket, StoreError> {
        check("priority", priority, TICKET_PRIORITIES)?;

        let conn = self.lock()?;
        let customer =
            Self::find_customer(&conn, customer_id)?.ok_or(StoreError::CustomerNotFound(customer_id))?;

        conn.execute(
            "INSERT INTO tickets (customer_id, issue, status, priority) VALUES (?1, ?2, 'open', ?3)",
            params![customer_id, issue, priority],
        )?;
        let ticket_id = conn.last_insert_rowid();
        let ticket = conn.query_row("SELECT * FROM tickets WHERE id = ?1", [ticket_id], ticket_from_row)?;

        tracing::info!(
            "[CustomerStore] Created ticket {} for customer {} ({})",
            ticket_id,
            customer_id,
            priority
        );

        Ok(CreatedTicket {
            ticket,
            customer_name: customer.name,
        })
    }

    pub fn get_customer_history(&self, customer_id: i64) -> Result<CustomerHistory, StoreError> {
        let conn = self.lock()?;
        let customer =
            Self::find_customer(&conn, customer_id)?.ok_or(StoreError::CustomerNotFound(customer_id))?;

        let mut stmt = conn.prepare(
            "SELECT * FROM tickets WHERE customer_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let tickets = stmt
            .query_map([customer_id], ticket_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let statistics = TicketStatistics::from_tickets(&tickets);

        Ok(CustomerHistory {
            customer,
            tickets,
            statistics,
        })
    }

    pub fn get_tickets_by_priority(&self, priority: &str, status: Option<&str>) -> Result<Vec<Ticket>, StoreError> {
        check("priority", priority, TICKET_PRIORITIES)?;
        if let Some(status) = status {
            check("status", status, TICKET_STATUSES)?;
        }

        let conn = self.lock()?;
        let map = |row: &Row<'_>| {
            let mut ticket = ticket_from_row(row)?;
            ticket.customer_name = row.get("customer_name")?;
            Ok(ticket)
        };

        let tickets = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT t.*, c.name AS customer_name
                     FROM tickets t JOIN customers c ON t.customer_id = c.id
                     WHERE t.priority = ?1 AND t.status = ?2
                     ORDER BY t.id",
                )?;
                let rows = stmt.query_map(params![priority, status], map)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT t.*, c.name AS customer_name
                     FROM tickets t JOIN customers c ON t.customer_id = c.id
                     WHERE t.priority = ?1
                     ORDER BY t.id",
                )?;
                let rows = stmt.query_map([priority], map)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(tickets)
    }

    pub fn get_active_customers_with_open_tickets(&self) -> Result<Vec<CustomerWithOpenTickets>, StoreError> {
        let conn = self.lock()?;

        let mut customers_stmt = conn.prepare(
            "SELECT DISTINCT c.id, c.name, c.email, c.status
             FROM customers c JOIN tickets t ON c.id = t.customer_id
             WHERE c.status = 'active' AND t.status = 'open'
             ORDER BY c.id",
        )?;
        let customers = customers_stmt
            .query_map([], |row| {
                Ok(CustomerSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    status: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tickets_stmt = conn.prepare(
            "SELECT id, issue, priority FROM tickets
             WHERE customer_id = ?1 AND status = 'open'
             ORDER BY id",
        )?;

        let mut result = Vec::with_capacity(customers.len());
        for customer in customers {
            let open_tickets = tickets_stmt
                .query_map([customer.id], |row| {
                    Ok(OpenTicket {
                        id: row.get(0)?,
                        issue: row.get(1)?,
                        priority: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            result.push(CustomerWithOpenTickets {
                customer,
                ticket_count: open_tickets.len(),
                open_tickets,
            });
        }

        Ok(result)
    }
}
