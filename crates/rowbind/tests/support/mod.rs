//! Shared test support: an in-memory connection provider that interprets
//! the statement grammar the builders emit, plus record fixtures.
//!
//! The interpreter evaluates WHERE fragments strictly left to right with no
//! operator precedence, matching the documented search contract.

#![allow(dead_code)]

use rowbind::prelude::*;
use rowbind::{compose_from, decompose_into, prefixed_column};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DATABASE: &str = "appdb";

type StoredRow = HashMap<String, Value>;

#[derive(Default)]
struct Table {
    next_key: i64,
    rows: Vec<StoredRow>,
}

/// In-memory store handing out connections per operation.
#[derive(Default)]
pub struct MemProvider {
    tables: RefCell<HashMap<String, Table>>,
}

impl MemProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.borrow().get(table).map_or(0, |t| t.rows.len())
    }

    /// Store a row directly, bypassing the session.
    pub fn seed(&self, table: &str, pairs: &[(&str, Value)]) {
        let mut tables = self.tables.borrow_mut();
        let table = tables.entry(table.to_string()).or_default();
        table.rows.push(
            pairs
                .iter()
                .map(|(name, value)| ((*name).to_string(), value.clone()))
                .collect(),
        );
    }
}

impl ConnectionProvider for MemProvider {
    fn connection(&self, database: &str) -> Result<Box<dyn Connection + '_>> {
        if database != DATABASE {
            return Err(Error::connection(database, "unknown logical database"));
        }
        Ok(Box::new(MemConnection {
            tables: &self.tables,
        }))
    }
}

struct MemConnection<'a> {
    tables: &'a RefCell<HashMap<String, Table>>,
}

impl Connection for MemConnection<'_> {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            self.run_update(sql, rest, params)
        } else if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            self.run_delete(sql, rest, params)
        } else {
            Err(Error::query(sql, "unsupported statement"))
        }
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let rest = sql
            .strip_prefix("SELECT ")
            .ok_or_else(|| Error::query(sql, "unsupported statement"))?;
        let (select, rest) = rest
            .split_once(" FROM ")
            .ok_or_else(|| Error::query(sql, "missing FROM"))?;
        let select: Vec<&str> = select.split(", ").collect();

        let (rest, limit, offset) = match rest.split_once(" LIMIT ") {
            Some((head, paging)) => {
                let (limit, offset) = paging
                    .split_once(" OFFSET ")
                    .ok_or_else(|| Error::query(sql, "missing OFFSET"))?;
                let limit: usize = limit.parse().map_err(|_| Error::query(sql, "bad LIMIT"))?;
                let offset: usize = offset.parse().map_err(|_| Error::query(sql, "bad OFFSET"))?;
                (head, Some(limit), offset)
            }
            None => (rest, None, 0),
        };
        let (table, condition) = match rest.split_once(" WHERE ") {
            Some((table, condition)) => (table, Some(condition)),
            None => (rest, None),
        };

        let tables = self.tables.borrow();
        let empty = Vec::new();
        let stored = tables.get(table).map_or(&empty, |t| &t.rows);

        let mut matched = Vec::new();
        for row in stored {
            let keep = match condition {
                Some(condition) => eval_condition(sql, condition, params, row)?,
                None => true,
            };
            if keep {
                matched.push(row);
            }
        }

        let matched: Vec<&StoredRow> = match limit {
            Some(limit) => matched.into_iter().skip(offset).take(limit).collect(),
            None => matched,
        };

        Ok(matched
            .into_iter()
            .map(|stored| {
                select
                    .iter()
                    .map(|column| {
                        let value = stored.get(*column).cloned().unwrap_or(Value::Null);
                        ((*column).to_string(), value)
                    })
                    .collect()
            })
            .collect())
    }

    fn insert(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        let rest = sql
            .strip_prefix("INSERT INTO ")
            .ok_or_else(|| Error::query(sql, "unsupported statement"))?;
        if let Some(table) = rest.strip_suffix(" DEFAULT VALUES") {
            let mut tables = self.tables.borrow_mut();
            let table = tables.entry(table.to_string()).or_default();
            table.next_key += 1;
            let key = Value::Int(table.next_key);
            table.rows.push(HashMap::from([("id".to_string(), key.clone())]));
            return Ok(Some(key));
        }
        let (table, rest) = rest
            .split_once(" (")
            .ok_or_else(|| Error::query(sql, "missing column list"))?;
        let (columns, _) = rest
            .split_once(')')
            .ok_or_else(|| Error::query(sql, "missing column list"))?;
        let columns: Vec<&str> = columns.split(", ").filter(|c| !c.is_empty()).collect();
        if columns.len() != params.len() {
            return Err(Error::query(sql, "parameter count mismatch"));
        }

        let mut row: StoredRow = columns
            .iter()
            .zip(params)
            .map(|(column, value)| ((*column).to_string(), value.clone()))
            .collect();

        let mut tables = self.tables.borrow_mut();
        let table = tables.entry(table.to_string()).or_default();
        let generated = if row.contains_key("id") {
            None
        } else {
            table.next_key += 1;
            row.insert("id".to_string(), Value::Int(table.next_key));
            Some(Value::Int(table.next_key))
        };
        table.rows.push(row);
        Ok(generated)
    }
}

impl MemConnection<'_> {
    fn run_update(&self, sql: &str, rest: &str, params: &[Value]) -> Result<u64> {
        let (table, rest) = rest
            .split_once(" SET ")
            .ok_or_else(|| Error::query(sql, "missing SET"))?;
        let (assignments, condition) = rest
            .split_once(" WHERE ")
            .ok_or_else(|| Error::query(sql, "missing WHERE"))?;
        let columns: Vec<&str> = assignments
            .split(", ")
            .map(|a| a.strip_suffix(" = ?").unwrap_or(a))
            .collect();
        let pk_column = condition
            .strip_suffix(" = ?")
            .ok_or_else(|| Error::query(sql, "unsupported WHERE"))?;
        let pk_value = params
            .last()
            .ok_or_else(|| Error::query(sql, "missing key parameter"))?;

        let mut tables = self.tables.borrow_mut();
        let Some(table) = tables.get_mut(table) else {
            return Ok(0);
        };
        let mut affected = 0;
        for row in &mut table.rows {
            if row.get(pk_column) != Some(pk_value) {
                continue;
            }
            for (column, value) in columns.iter().zip(params) {
                row.insert((*column).to_string(), value.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    fn run_delete(&self, sql: &str, rest: &str, params: &[Value]) -> Result<u64> {
        let (table, condition) = rest
            .split_once(" WHERE ")
            .ok_or_else(|| Error::query(sql, "missing WHERE"))?;
        let pk_column = condition
            .strip_suffix(" = ?")
            .ok_or_else(|| Error::query(sql, "unsupported WHERE"))?;
        let pk_value = params
            .first()
            .ok_or_else(|| Error::query(sql, "missing key parameter"))?;

        let mut tables = self.tables.borrow_mut();
        let Some(table) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|row| row.get(pk_column) != Some(pk_value));
        Ok((before - table.rows.len()) as u64)
    }
}

/// Left-to-right fold over the condition clauses, no precedence.
fn eval_condition(sql: &str, condition: &str, params: &[Value], row: &StoredRow) -> Result<bool> {
    if condition == "1 = 0" {
        return Ok(false);
    }
    if let Some((column, _)) = condition.split_once(" IN (") {
        let value = row.get(column).cloned().unwrap_or(Value::Null);
        return Ok(params.iter().any(|p| *p == value));
    }

    let tokens: Vec<&str> = condition.split(' ').collect();
    if tokens.len() < 3 {
        return Err(Error::query(sql, "unsupported WHERE"));
    }
    let mut acc = eval_clause(sql, tokens[0], tokens[1], &params[0], row)?;
    let mut index = 3;
    let mut param = 1;
    while index < tokens.len() {
        let clause = eval_clause(sql, tokens[index + 1], tokens[index + 2], &params[param], row)?;
        acc = match tokens[index] {
            "AND" => acc && clause,
            "OR" => acc || clause,
            other => return Err(Error::query(sql, format!("unsupported connective {other}"))),
        };
        index += 4;
        param += 1;
    }
    Ok(acc)
}

fn eval_clause(sql: &str, column: &str, op: &str, param: &Value, row: &StoredRow) -> Result<bool> {
    let value = row.get(column).cloned().unwrap_or(Value::Null);
    let result = match op {
        "=" => value == *param,
        "<>" => value != *param,
        "LIKE" => like(&value, param),
        "<" => compare(&value, param) == Some(Ordering::Less),
        "<=" => matches!(compare(&value, param), Some(Ordering::Less | Ordering::Equal)),
        ">" => compare(&value, param) == Some(Ordering::Greater),
        ">=" => matches!(compare(&value, param), Some(Ordering::Greater | Ordering::Equal)),
        other => return Err(Error::query(sql, format!("unsupported operator {other}"))),
    };
    Ok(result)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Double(y)) => (*x as f64).partial_cmp(y),
        (Value::Double(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn like(value: &Value, pattern: &Value) -> bool {
    let (Value::Text(value), Value::Text(pattern)) = (value, pattern) else {
        return false;
    };
    let leading = pattern.starts_with('%');
    let trailing = pattern.len() > 1 && pattern.ends_with('%');
    let needle = pattern.trim_matches('%');
    match (leading, trailing) {
        (true, true) => value.contains(needle),
        (false, true) => value.starts_with(needle),
        (true, false) => value.ends_with(needle),
        (false, false) => value == needle,
    }
}

// --- record fixtures ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub secret: Option<String>,
    pub tags: Option<serde_json::Value>,
}

impl Record for User {
    fn descriptor() -> Result<Descriptor> {
        Descriptor::builder(DATABASE, "users", "User")
            .column(ColumnInfo::new("id").primary_key(true).automatic(true))
            .column(ColumnInfo::new("name"))
            .column(ColumnInfo::new("email").pattern("^[^@\\s]+@[^@\\s]+$"))
            .column(ColumnInfo::new("role").accepts(["admin", "member", "guest"]))
            .column(
                ColumnInfo::new("secret")
                    .min_read_level(AccessLevel::new(1))
                    .min_write_level(AccessLevel::new(1)),
            )
            .column(ColumnInfo::new("tags").json(true))
            .build()
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        vec![
            ("id".into(), Value::from(self.id)),
            ("name".into(), Value::from(self.name.clone())),
            ("email".into(), Value::from(self.email.clone())),
            ("role".into(), Value::from(self.role.clone())),
            ("secret".into(), Value::from(self.secret.clone())),
            (
                "tags".into(),
                self.tags.clone().map_or(Value::Null, Value::Json),
            ),
        ]
    }

    fn load(&mut self, row: &Row) -> Result<()> {
        if let Some(v) = row.get_named("id") {
            self.id = v.as_i64();
        }
        if let Some(v) = row.get_named("name") {
            self.name = v.as_str().unwrap_or_default().to_string();
        }
        if let Some(v) = row.get_named("email") {
            self.email = v.as_str().map(ToString::to_string);
        }
        if let Some(v) = row.get_named("role") {
            self.role = v.as_str().map(ToString::to_string);
        }
        if let Some(v) = row.get_named("secret") {
            self.secret = v.as_str().map(ToString::to_string);
        }
        if let Some(v) = row.get_named("tags") {
            self.tags = v.as_json().cloned();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
    pub member_ids: Option<serde_json::Value>,
    pub members: Vec<User>,
}

impl Record for Team {
    fn descriptor() -> Result<Descriptor> {
        Descriptor::builder(DATABASE, "teams", "Team")
            .column(ColumnInfo::new("id").primary_key(true).automatic(true))
            .column(ColumnInfo::new("name"))
            .column(ColumnInfo::new("member_ids").json(true))
            .relation(relation_many::<Team, User>("members", "member_ids"))
            .build()
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        vec![
            ("id".into(), Value::from(self.id)),
            ("name".into(), Value::from(self.name.clone())),
            (
                "member_ids".into(),
                self.member_ids.clone().map_or(Value::Null, Value::Json),
            ),
        ]
    }

    fn load(&mut self, row: &Row) -> Result<()> {
        if let Some(v) = row.get_named("id") {
            self.id = v.as_i64();
        }
        if let Some(v) = row.get_named("name") {
            self.name = v.as_str().unwrap_or_default().to_string();
        }
        if let Some(v) = row.get_named("member_ids") {
            self.member_ids = v.as_json().cloned();
        }
        Ok(())
    }

    fn set_related(&mut self, field: &str, related: Box<dyn std::any::Any>) {
        if field != "members" {
            return;
        }
        if let Ok(members) = related.downcast::<Vec<User>>() {
            self.members = *members;
        }
    }
}

/// Linked node with an explicit (non-generated) key, for cycle tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub id: Option<i64>,
    pub label: String,
    pub next_id: Option<i64>,
    pub next: Option<Box<Node>>,
}

impl Record for Node {
    fn descriptor() -> Result<Descriptor> {
        Descriptor::builder(DATABASE, "nodes", "Node")
            .column(ColumnInfo::new("id").primary_key(true))
            .column(ColumnInfo::new("label"))
            .column(ColumnInfo::new("next_id"))
            .relation(relation_one::<Node, Node>("next", "next_id").always_fetch(true))
            .build()
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        vec![
            ("id".into(), Value::from(self.id)),
            ("label".into(), Value::from(self.label.clone())),
            ("next_id".into(), Value::from(self.next_id)),
        ]
    }

    fn load(&mut self, row: &Row) -> Result<()> {
        if let Some(v) = row.get_named("id") {
            self.id = v.as_i64();
        }
        if let Some(v) = row.get_named("label") {
            self.label = v.as_str().unwrap_or_default().to_string();
        }
        if let Some(v) = row.get_named("next_id") {
            self.next_id = v.as_i64();
        }
        Ok(())
    }

    fn set_related(&mut self, field: &str, related: Box<dyn std::any::Any>) {
        if field != "next" {
            return;
        }
        if let Ok(next) = related.downcast::<Node>() {
            self.next = Some(next);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zip: Option<String>,
}

impl Composite for Address {
    const FIELDS: &'static [&'static str] = &["city", "street", "zip"];

    fn decompose(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("city", Value::from(self.city.clone())),
            ("street", Value::from(self.street.clone())),
            ("zip", Value::from(self.zip.clone())),
        ]
    }

    fn compose(lookup: &dyn Fn(&str) -> Option<Value>) -> Result<Self> {
        Ok(Self {
            city: rowbind::required(lookup, "city")?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            street: rowbind::required(lookup, "street")?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            zip: lookup("zip").and_then(|v| v.as_str().map(ToString::to_string)),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shipment {
    pub id: Option<i64>,
    pub label: String,
    pub address: Option<Address>,
}

impl Record for Shipment {
    fn descriptor() -> Result<Descriptor> {
        Descriptor::builder(DATABASE, "shipments", "Shipment")
            .column(ColumnInfo::new("id").primary_key(true).automatic(true))
            .column(ColumnInfo::new("label"))
            .composite(CompositeInfo::new(
                "address",
                "addr",
                Address::FIELDS.iter().copied(),
            ))
            .build()
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        let mut pairs = vec![
            ("id".into(), Value::from(self.id)),
            ("label".into(), Value::from(self.label.clone())),
        ];
        if let Some(address) = &self.address {
            pairs.extend(decompose_into("addr", address));
        }
        pairs
    }

    fn load(&mut self, row: &Row) -> Result<()> {
        if let Some(v) = row.get_named("id") {
            self.id = v.as_i64();
        }
        if let Some(v) = row.get_named("label") {
            self.label = v.as_str().unwrap_or_default().to_string();
        }
        // Rows narrowed to other columns leave the composite as it was.
        let present = Address::FIELDS
            .iter()
            .any(|f| row.get_named(&prefixed_column("addr", f)).is_some());
        if present {
            let lookup = |name: &str| row.get_named(name).cloned();
            self.address = compose_from::<Address>("addr", &lookup).ok();
        }
        Ok(())
    }
}
