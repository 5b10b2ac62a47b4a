//! SQL text builder shared by all dialect renderers

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{DataType, DatasetFilter, DatasetReference, FilterType, Literal};

use super::{Dialect, ExecutableStatement, StatementKind};

/// Lexical conventions and capabilities of one dialect
pub(crate) struct Syntax {
    pub dialect: Dialect,
    pub quote: (char, char),
    /// Placeholder text for the 1-based parameter index
    pub placeholder: fn(usize) -> String,
    pub timestamp_literal: fn(&NaiveDateTime) -> String,
    pub date_literal: fn(&NaiveDate) -> String,
    pub type_name: fn(&DataType) -> String,
    /// `UPDATE t AS x` / `DELETE FROM t AS x` is accepted
    pub dml_target_alias: bool,
    pub window_functions: bool,
    /// `IS [NOT] DISTINCT FROM` is available
    pub distinct_from: bool,
    /// Predicate required by DML statements that touch every row
    pub all_rows_predicate: Option<&'static str>,
    pub create_if_not_exists: bool,
}

/// Appends SQL text and collects bound parameters in placeholder order
pub(crate) struct SqlWriter<'a> {
    syntax: &'a Syntax,
    sql: String,
    params: Vec<Literal>,
    /// One entry per nested query; true once its WHERE clause is open
    scopes: Vec<bool>,
}

impl<'a> SqlWriter<'a> {
    pub fn new(syntax: &'a Syntax) -> Self {
        Self {
            syntax,
            sql: String::new(),
            params: Vec::new(),
            scopes: vec![false],
        }
    }

    pub fn syntax(&self) -> &Syntax {
        self.syntax
    }

    pub fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    pub fn quote(&self, name: &str) -> String {
        let (open, close) = self.syntax.quote;
        let escaped = name.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    pub fn ident(&mut self, name: &str) -> &mut Self {
        let quoted = self.quote(name);
        self.push(&quoted)
    }

    pub fn table_name(&self, reference: &DatasetReference) -> String {
        match &reference.namespace {
            Some(ns) => format!("{}.{}", self.quote(ns), self.quote(&reference.name)),
            None => self.quote(&reference.name),
        }
    }

    pub fn table(&mut self, reference: &DatasetReference, alias: &str) -> &mut Self {
        let name = self.table_name(reference);
        self.push(&name).push(" AS ").push(alias)
    }

    /// Write the target of an UPDATE or DELETE and return its column qualifier
    ///
    /// Dialects without DML aliases qualify columns with the table name itself.
    pub fn dml_target(&mut self, reference: &DatasetReference, alias: &str) -> String {
        let name = self.table_name(reference);
        self.push(&name);
        if self.syntax.dml_target_alias {
            self.push(" AS ").push(alias);
            alias.to_string()
        } else {
            name
        }
    }

    pub fn column(&mut self, qualifier: &str, name: &str) -> &mut Self {
        let quoted = self.quote(name);
        self.push(qualifier).push(".").push(&quoted)
    }

    /// Comma separated list, one item per element
    pub fn list<T>(&mut self, items: &[T], mut item: impl FnMut(&mut Self, &T)) -> &mut Self {
        for (i, value) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            item(self, value);
        }
        self
    }

    pub fn columns(&mut self, qualifier: &str, names: &[String]) -> &mut Self {
        self.list(names, |w, name| {
            w.column(qualifier, name);
        })
    }

    pub fn timestamp(&mut self, value: &NaiveDateTime) -> &mut Self {
        let text = (self.syntax.timestamp_literal)(value);
        self.push(&text)
    }

    /// Inline temporal literals, bind everything else as a parameter
    pub fn literal(&mut self, value: &Literal) -> &mut Self {
        match value {
            Literal::Timestamp(ts) => self.timestamp(ts),
            Literal::Date(d) => {
                let text = (self.syntax.date_literal)(d);
                self.push(&text)
            }
            other => {
                self.params.push(other.clone());
                let placeholder = (self.syntax.placeholder)(self.params.len());
                self.push(&placeholder)
            }
        }
    }

    /// Start the next predicate of the current query: ` WHERE ` first, ` AND ` after
    pub fn conjunct(&mut self) -> &mut Self {
        let open = self.scopes.last().copied().unwrap_or(false);
        if let Some(scope) = self.scopes.last_mut() {
            *scope = true;
        }
        self.push(if open { " AND " } else { " WHERE " })
    }

    /// Enter a nested query with its own WHERE clause
    pub fn begin_query(&mut self) -> &mut Self {
        self.scopes.push(false);
        self
    }

    pub fn end_query(&mut self) -> &mut Self {
        self.scopes.pop();
        self
    }

    /// One conjunct per filter, evaluated against `qualifier`
    pub fn filters(&mut self, qualifier: &str, filters: &[DatasetFilter]) -> &mut Self {
        for filter in filters {
            self.conjunct();
            self.column(qualifier, &filter.field);
            if filter.filter_type == FilterType::In {
                self.push(" IN (").list(&filter.values, |w, v| {
                    w.literal(v);
                });
                self.push(")");
            } else {
                self.push(" ").push(filter.filter_type.operator()).push(" ");
                if let Some(value) = filter.values.first() {
                    self.literal(value);
                }
            }
        }
        self
    }

    /// One `left.k = right.k` conjunct per key
    pub fn key_match(&mut self, left: &str, right: &str, keys: &[String]) -> &mut Self {
        for key in keys {
            self.conjunct();
            self.column(left, key).push(" = ").column(right, key);
        }
        self
    }

    /// NULL-safe `left.f = right.f` conjunct; NULL matches NULL
    pub fn same_value(&mut self, left: &str, right: &str, field: &str) -> &mut Self {
        self.conjunct();
        if self.syntax.distinct_from {
            return self
                .column(left, field)
                .push(" IS NOT DISTINCT FROM ")
                .column(right, field);
        }
        self.push("(")
            .column(left, field)
            .push(" = ")
            .column(right, field)
            .push(" OR (")
            .column(left, field)
            .push(" IS NULL AND ")
            .column(right, field)
            .push(" IS NULL))")
    }

    /// NULL-safe `left.f <> right.f` conjunct; NULL differs from any value
    pub fn different_value(&mut self, left: &str, right: &str, field: &str) -> &mut Self {
        self.conjunct();
        if self.syntax.distinct_from {
            return self
                .column(left, field)
                .push(" IS DISTINCT FROM ")
                .column(right, field);
        }
        self.push("(")
            .column(left, field)
            .push(" <> ")
            .column(right, field)
            .push(" OR (")
            .column(left, field)
            .push(" IS NULL AND ")
            .column(right, field)
            .push(" IS NOT NULL) OR (")
            .column(left, field)
            .push(" IS NOT NULL AND ")
            .column(right, field)
            .push(" IS NULL))")
    }

    /// `newer.v > older.v`, also true when the older version is NULL
    pub fn newer_version(&mut self, newer: &str, older: &str, field: &str) -> &mut Self {
        self.push("(")
            .column(newer, field)
            .push(" > ")
            .column(older, field)
            .push(" OR ")
            .column(older, field)
            .push(" IS NULL)")
    }

    /// Any of `qualifier.k IS NULL`, as one parenthesised disjunction
    pub fn any_null(&mut self, qualifier: &str, keys: &[String]) -> &mut Self {
        self.push("(");
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                self.push(" OR ");
            }
            self.column(qualifier, key).push(" IS NULL");
        }
        self.push(")")
    }

    /// Predicate that keeps a full-table DML statement acceptable to the dialect
    pub fn all_rows(&mut self) -> &mut Self {
        if let Some(predicate) = self.syntax.all_rows_predicate {
            self.conjunct();
            self.push(predicate);
        }
        self
    }

    pub fn finish(self, operation: &'static str, kind: StatementKind) -> ExecutableStatement {
        ExecutableStatement {
            operation,
            kind,
            sql: self.sql,
            params: self.params,
        }
    }
}
