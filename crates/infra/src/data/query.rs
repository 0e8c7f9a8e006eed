//! Row selection: filters, ordering and limit.
//!
//! A [`Query`] renders to the query-string dialect of the REST table API
//! (`column=eq.value`, `order=column.desc`, `or=(a.ilike.x,b.ilike.y)`) and
//! can also be evaluated directly against JSON rows for the in-memory service.

use std::cmp::Ordering;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    Neq(String, String),
    In(String, Vec<String>),
    /// Case-insensitive pattern where `%` matches any run of characters.
    ILike(String, String),
    Gte(String, String),
    Lte(String, String),
    /// Matches when any inner filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    fn column(&self) -> Option<&str> {
        match self {
            Filter::Eq(c, _)
            | Filter::Neq(c, _)
            | Filter::In(c, _)
            | Filter::ILike(c, _)
            | Filter::Gte(c, _)
            | Filter::Lte(c, _) => Some(c),
            Filter::Or(_) => None,
        }
    }

    /// `op.value` part of the rendered filter.
    fn operand(&self) -> String {
        match self {
            Filter::Eq(_, v) => format!("eq.{v}"),
            Filter::Neq(_, v) => format!("neq.{v}"),
            Filter::In(_, vs) => format!("in.({})", vs.join(",")),
            Filter::ILike(_, p) => format!("ilike.{p}"),
            Filter::Gte(_, v) => format!("gte.{v}"),
            Filter::Lte(_, v) => format!("lte.{v}"),
            Filter::Or(fs) => format!("({})", render_or(fs)),
        }
    }

    /// Query-string pair for a top-level filter.
    pub fn to_param(&self) -> (String, String) {
        match self.column() {
            Some(col) => (col.to_string(), self.operand()),
            None => ("or".to_string(), self.operand()),
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        let field = |c: &str| row.get(c).and_then(scalar_text);
        match self {
            Filter::Eq(c, v) => field(c).is_some_and(|f| f == *v),
            Filter::Neq(c, v) => field(c).is_none_or(|f| f != *v),
            Filter::In(c, vs) => field(c).is_some_and(|f| vs.contains(&f)),
            Filter::ILike(c, p) => field(c).is_some_and(|f| ilike(p, &f)),
            Filter::Gte(c, v) => row
                .get(c)
                .and_then(|f| compare_scalar(f, v))
                .is_some_and(|o| o != Ordering::Less),
            Filter::Lte(c, v) => row
                .get(c)
                .and_then(|f| compare_scalar(f, v))
                .is_some_and(|o| o != Ordering::Greater),
            Filter::Or(fs) => fs.iter().any(|f| f.matches(row)),
        }
    }
}

fn render_or(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(|f| match f.column() {
            Some(col) => format!("{col}.{}", f.operand()),
            None => format!("or{}", f.operand()),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Text form of a scalar JSON value; `None` for null, arrays and objects.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `None` when the two sides are not comparable (null field, number vs text).
fn compare_scalar(field: &Value, operand: &str) -> Option<Ordering> {
    match (field, operand.parse::<f64>()) {
        (Value::Number(n), Ok(rhs)) => n.as_f64().and_then(|lhs| lhs.partial_cmp(&rhs)),
        (Value::String(s), _) => Some(s.as_str().cmp(operand)),
        _ => None,
    }
}

fn ilike(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !text.starts_with(first) || text.len() < first.len() + last.len() || !text.ends_with(last) {
        return false;
    }
    let mut rest = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    fn render(&self) -> String {
        let dir = if self.ascending { "asc" } else { "desc" };
        format!("{}.{dir}", self.column)
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let (fa, fb) = (a.get(&self.column), b.get(&self.column));
        // Nulls sort last regardless of direction.
        let ord = match (fa.filter(|v| !v.is_null()), fb.filter(|v| !v.is_null())) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(Value::Number(x)), Some(Value::Number(y))) => x
                .as_f64()
                .zip(y.as_f64())
                .and_then(|(x, y)| x.partial_cmp(&y))
                .unwrap_or(Ordering::Equal),
            (Some(x), Some(y)) => scalar_text(x).cmp(&scalar_text(y)),
        };
        if self.ascending { ord } else { ord.reverse() }
    }
}

/// Selection over one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn neq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Neq(column.to_string(), value.to_string()));
        self
    }

    pub fn in_list<V: ToString>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.to_string()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Lte(column.to_string(), value.to_string()));
        self
    }

    /// Substring search over several columns, any of which may match.
    pub fn search(mut self, columns: &[&str], term: &str) -> Self {
        let term = term.trim();
        if term.is_empty() {
            return self;
        }
        // Characters with meaning in the `or=(...)` grammar are dropped.
        let term: String = term.chars().filter(|c| !matches!(c, ',' | '(' | ')' | '%')).collect();
        let pattern = format!("%{term}%");
        let alternatives = columns
            .iter()
            .map(|c| Filter::ILike(c.to_string(), pattern.clone()))
            .collect();
        self.filters.push(Filter::Or(alternatives));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Query-string parameters, in a stable order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order = self.order.iter().map(Order::render).collect::<Vec<_>>().join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(n) = self.limit {
            params.push(("limit".to_string(), n.to_string()));
        }
        params
    }

    /// Evaluate against in-memory rows.
    pub fn apply(&self, rows: &[Value]) -> Vec<Value> {
        let mut out: Vec<Value> = rows
            .iter()
            .filter(|r| self.filters.iter().all(|f| f.matches(r)))
            .cloned()
            .collect();
        if !self.order.is_empty() {
            out.sort_by(|a, b| {
                self.order
                    .iter()
                    .map(|o| o.compare(a, b))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        if let Some(n) = self.limit {
            out.truncate(n);
        }
        out
    }
}
