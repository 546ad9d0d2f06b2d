use chrono::{Days, NaiveDate};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::{QueryAs, QueryScalar};

/// A single positional parameter. Values only ever reach SQL through `$n` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    BigInt(i64),
    Date(NaiveDate),
}

/// Accumulates AND-ed conditions and their parameters in placeholder order.
#[derive(Debug, Default)]
pub struct WhereBuilder {
    conditions: Vec<String>,
    params: Vec<SqlParam>,
    excluded_email_column: Option<String>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder for customer-facing listings. `build` always appends the
    /// excluded-email predicate on `email_column`, whatever else was added.
    pub fn with_exclusion(email_column: &str) -> Self {
        Self {
            excluded_email_column: Some(email_column.to_string()),
            ..Self::default()
        }
    }

    fn placeholder(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// `column = $n`, skipped when the value is absent or blank.
    pub fn eq_text(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = non_blank(value) {
            let p = self.placeholder(SqlParam::Text(v.to_string()));
            self.conditions.push(format!("{column} = {p}"));
        }
        self
    }

    /// Case-insensitive equality, used for free-form enum-ish columns like payment channel.
    pub fn eq_text_ci(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = non_blank(value) {
            let p = self.placeholder(SqlParam::Text(v.to_lowercase()));
            self.conditions.push(format!("LOWER({column}) = {p}"));
        }
        self
    }

    pub fn eq_i64(&mut self, column: &str, value: Option<i64>) -> &mut Self {
        if let Some(v) = value {
            let p = self.placeholder(SqlParam::BigInt(v));
            self.conditions.push(format!("{column} = {p}"));
        }
        self
    }

    /// One `%term%` parameter matched against every column with ILIKE.
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = non_blank(term) else {
            return self;
        };
        if columns.is_empty() {
            return self;
        }
        let p = self.placeholder(SqlParam::Text(format!("%{}%", escape_like(term))));
        let ors: Vec<String> = columns
            .iter()
            .map(|c| format!("{c}::TEXT ILIKE {p}"))
            .collect();
        self.conditions.push(format!("({})", ors.join(" OR ")));
        self
    }

    /// Inclusive on both days: `column >= start AND column < end + 1 day`.
    pub fn date_range(
        &mut self,
        column: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> &mut Self {
        if let Some(start) = start {
            let p = self.placeholder(SqlParam::Date(start));
            self.conditions.push(format!("{column} >= {p}"));
        }
        if let Some(end) = end {
            let next_day = end.checked_add_days(Days::new(1)).unwrap_or(end);
            let p = self.placeholder(SqlParam::Date(next_day));
            self.conditions.push(format!("{column} < {p}"));
        }
        self
    }

    pub fn not_null(&mut self, column: &str) -> &mut Self {
        self.conditions.push(format!("{column} IS NOT NULL"));
        self
    }

    pub fn build(mut self) -> WhereClause {
        if let Some(col) = self.excluded_email_column.take() {
            self.conditions.push(excluded_email_predicate(&col));
        }
        let sql = if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        };
        WhereClause {
            sql,
            params: self.params,
        }
    }
}

/// Fixed predicate hiding demo/test accounts listed in `excluded_emails`.
pub fn excluded_email_predicate(email_column: &str) -> String {
    format!(
        "NOT EXISTS (SELECT 1 FROM excluded_emails ee WHERE ee.email = LOWER({email_column}))"
    )
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// A rendered WHERE clause shared by a listing's count and data queries.
#[derive(Debug, Clone)]
pub struct WhereClause {
    sql: String,
    params: Vec<SqlParam>,
}

impl WhereClause {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// `LIMIT $n OFFSET $n+1`, numbered after the filter parameters.
    pub fn limit_offset_sql(&self) -> String {
        let n = self.params.len() + 1;
        format!(" LIMIT ${} OFFSET ${}", n, n + 1)
    }

    pub fn bind_as<'q, O>(
        &self,
        mut query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for param in &self.params {
            query = match param {
                SqlParam::Text(v) => query.bind(v.clone()),
                SqlParam::BigInt(v) => query.bind(*v),
                SqlParam::Date(v) => query.bind(*v),
            };
        }
        query
    }

    pub fn bind_scalar<'q, O>(
        &self,
        mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    ) -> QueryScalar<'q, Postgres, O, PgArguments> {
        for param in &self.params {
            query = match param {
                SqlParam::Text(v) => query.bind(v.clone()),
                SqlParam::BigInt(v) => query.bind(*v),
                SqlParam::Date(v) => query.bind(*v),
            };
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn empty_builder_renders_nothing() {
        let clause = WhereBuilder::new().build();
        assert_eq!(clause.sql(), "");
        assert!(clause.params().is_empty());
        assert_eq!(clause.limit_offset_sql(), " LIMIT $1 OFFSET $2");
    }

    #[test]
    fn exclusion_is_always_appended() {
        let clause = WhereBuilder::with_exclusion("c.email").build();
        assert_eq!(
            clause.sql(),
            " WHERE NOT EXISTS (SELECT 1 FROM excluded_emails ee WHERE ee.email = LOWER(c.email))"
        );
        assert!(clause.params().is_empty());
    }

    #[test]
    fn exclusion_goes_last_after_filters() {
        let mut b = WhereBuilder::with_exclusion("c.email");
        b.eq_text("t.status", Some("finished"));
        let clause = b.build();
        assert!(clause.sql().starts_with(" WHERE t.status = $1 AND NOT EXISTS"));
    }

    #[test]
    fn blank_filters_are_no_constraint() {
        let mut b = WhereBuilder::new();
        b.eq_text("status", Some(""))
            .eq_text("status", Some("   "))
            .eq_text("status", None)
            .search(&["name"], Some(" "))
            .eq_i64("customer_id", None)
            .date_range("created_at", None, None);
        let clause = b.build();
        assert_eq!(clause.sql(), "");
        assert!(clause.params().is_empty());
    }

    #[test]
    fn placeholders_follow_push_order() {
        let mut b = WhereBuilder::new();
        b.search(&["c.name", "c.email"], Some("budi"))
            .eq_text("t.status", Some("finished"))
            .date_range("t.created_at", Some(date("2026-01-01")), Some(date("2026-01-31")))
            .eq_i64("t.customer_id", Some(42));
        let clause = b.build();
        assert_eq!(
            clause.sql(),
            " WHERE (c.name::TEXT ILIKE $1 OR c.email::TEXT ILIKE $1) AND t.status = $2 \
             AND t.created_at >= $3 AND t.created_at < $4 AND t.customer_id = $5"
        );
        assert_eq!(
            clause.params(),
            &[
                SqlParam::Text("%budi%".into()),
                SqlParam::Text("finished".into()),
                SqlParam::Date(date("2026-01-01")),
                SqlParam::Date(date("2026-02-01")),
                SqlParam::BigInt(42),
            ]
        );
        assert_eq!(clause.limit_offset_sql(), " LIMIT $6 OFFSET $7");
    }

    #[test]
    fn values_never_reach_sql_text() {
        let hostile = "x'; DROP TABLE customers; --";
        let mut b = WhereBuilder::with_exclusion("c.email");
        b.eq_text("c.subscription_status", Some(hostile))
            .search(&["c.name"], Some(hostile));
        let clause = b.build();
        assert!(!clause.sql().contains("DROP TABLE"));
        assert_eq!(clause.params().len(), 2);
    }

    #[test]
    fn search_escapes_like_wildcards() {
        let mut b = WhereBuilder::new();
        b.search(&["name"], Some("50%_off"));
        let clause = b.build();
        assert_eq!(clause.params(), &[SqlParam::Text("%50\\%\\_off%".into())]);
    }

    #[test]
    fn case_insensitive_equality_lowercases_value() {
        let mut b = WhereBuilder::new();
        b.eq_text_ci("t.payment_channel", Some("BCA_VA"));
        let clause = b.build();
        assert_eq!(clause.sql(), " WHERE LOWER(t.payment_channel) = $1");
        assert_eq!(clause.params(), &[SqlParam::Text("bca_va".into())]);
    }

    #[test]
    fn not_null_has_no_parameter() {
        let mut b = WhereBuilder::with_exclusion("c.email");
        b.not_null("c.referral_code").eq_text("c.referral_code", Some("AYU10"));
        let clause = b.build();
        assert!(clause
            .sql()
            .starts_with(" WHERE c.referral_code IS NOT NULL AND c.referral_code = $1 AND NOT EXISTS"));
        assert_eq!(clause.params().len(), 1);
    }
}
