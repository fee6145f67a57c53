//! Clauses shared by several statement kinds.

use crate::qb::expr::OperatorGroup;
use crate::qb::operand::Operand;
use crate::qb::writer::SqlWriter;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One ORDER BY term.
#[derive(Debug, Clone)]
pub struct OrderBy {
    target: Operand,
    direction: Option<Direction>,
    collation: Option<String>,
}

impl OrderBy {
    /// Order by `target` without an explicit direction.
    pub fn new(target: impl Into<Operand>) -> Self {
        Self {
            target: target.into(),
            direction: None,
            collation: None,
        }
    }

    pub fn asc(target: impl Into<Operand>) -> Self {
        Self::new(target).direction(Direction::Asc)
    }

    pub fn desc(target: impl Into<Operand>) -> Self {
        Self::new(target).direction(Direction::Desc)
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// `"col" COLLATE <name>`
    pub fn collate(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub(crate) fn write_sql(&self, w: &mut SqlWriter<'_>) {
        // Order by the alias when one is set.
        self.target.write_reference(w);
        if let Some(collation) = &self.collation {
            w.push(" COLLATE ").push(collation);
        }
        match self.direction {
            Some(Direction::Asc) => {
                w.push(" ASC");
            }
            Some(Direction::Desc) => {
                w.push(" DESC");
            }
            None => {}
        }
    }
}

/// `OR <POLICY>` on INSERT and UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Rollback,
    Abort,
    Replace,
    Fail,
    Ignore,
}

impl ConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictPolicy::Rollback => "ROLLBACK",
            ConflictPolicy::Abort => "ABORT",
            ConflictPolicy::Replace => "REPLACE",
            ConflictPolicy::Fail => "FAIL",
            ConflictPolicy::Ignore => "IGNORE",
        }
    }

    /// Write `OR <POLICY> ` for an optional policy.
    pub(crate) fn write_opt(policy: Option<Self>, w: &mut SqlWriter<'_>) {
        if let Some(policy) = policy {
            w.push("OR ").push(policy.as_str()).push_char(' ');
        }
    }
}

/// GROUP BY / HAVING / ORDER BY / LIMIT / OFFSET, in that order.
#[derive(Debug, Clone, Default)]
pub struct Tail {
    pub(crate) group_by: Vec<Operand>,
    pub(crate) having: OperatorGroup,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl Tail {
    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Write each present clause followed by a single space.
    pub(crate) fn write_sql(&self, w: &mut SqlWriter<'_>) {
        if !self.group_by.is_empty() {
            w.push("GROUP BY ");
            for (i, column) in self.group_by.iter().enumerate() {
                if i > 0 {
                    w.push_char(',');
                }
                w.push_operand_name(column);
            }
            w.push_char(' ');
        }
        if !self.having.is_empty() {
            w.push("HAVING ");
            self.having.write_sql(w);
            w.push_char(' ');
        }
        if !self.order_by.is_empty() {
            w.push("ORDER BY ");
            for (i, term) in self.order_by.iter().enumerate() {
                if i > 0 {
                    w.push_char(',');
                }
                term.write_sql(w);
            }
            w.push_char(' ');
        }
        match (self.limit, self.offset) {
            (Some(limit), _) => {
                w.push("LIMIT ").push(&limit.to_string()).push_char(' ');
            }
            // SQLite only accepts OFFSET after a LIMIT; -1 means no limit.
            (None, Some(_)) => {
                w.push("LIMIT -1 ");
            }
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            w.push("OFFSET ").push(&offset.to_string()).push_char(' ');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConverterRegistry;

    fn render(tail: &Tail) -> String {
        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        tail.write_sql(&mut w);
        w.into_sql()
    }

    #[test]
    fn tail_clause_order() {
        let tail = Tail {
            group_by: vec![Operand::column("a")],
            having: OperatorGroup::of(Operand::raw("COUNT(*)").gt(1)),
            order_by: vec![OrderBy::desc("b"), OrderBy::asc("c")],
            limit: Some(10),
            offset: Some(20),
        };
        assert_eq!(
            render(&tail),
            r#"GROUP BY "a" HAVING COUNT(*)>1 ORDER BY "b" DESC,"c" ASC LIMIT 10 OFFSET 20 "#
        );
    }

    #[test]
    fn offset_without_limit() {
        let tail = Tail {
            offset: Some(5),
            ..Tail::default()
        };
        assert_eq!(render(&tail), "LIMIT -1 OFFSET 5 ");
    }

    #[test]
    fn order_by_collation_and_alias() {
        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        OrderBy::asc("name").collate("NOCASE").write_sql(&mut w);
        assert_eq!(w.sql(), r#""name" COLLATE NOCASE ASC"#);

        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        OrderBy::new(crate::qb::func::count_all().as_("n")).write_sql(&mut w);
        assert_eq!(w.sql(), r#""n""#);
    }

    #[test]
    fn conflict_policy_keywords() {
        assert_eq!(ConflictPolicy::Replace.as_str(), "REPLACE");
        assert_eq!(ConflictPolicy::Fail.as_str(), "FAIL");
    }
}
