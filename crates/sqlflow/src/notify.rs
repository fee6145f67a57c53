//! Change notification for mutations.

use std::fmt;

/// The kind of change a mutation makes to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryAction {
    Insert,
    Update,
    Delete,
    /// Any other change (raw statements, DDL).
    Change,
}

impl PrimaryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimaryAction::Insert => "insert",
            PrimaryAction::Update => "update",
            PrimaryAction::Delete => "delete",
            PrimaryAction::Change => "change",
        }
    }
}

impl fmt::Display for PrimaryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives `(table, action)` after a mutation succeeds.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, table: &str, action: PrimaryAction);
}

impl<F> ChangeListener for F
where
    F: Fn(&str, PrimaryAction) + Send + Sync,
{
    fn on_change(&self, table: &str, action: PrimaryAction) {
        self(table, action)
    }
}

/// Logs every change at DEBUG.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl ChangeListener for TracingListener {
    fn on_change(&self, table: &str, action: PrimaryAction) {
        tracing::debug!(target: "sqlflow.notify", table, action = action.as_str(), "table changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closure_listener_receives_change() {
        let seen = Mutex::new(Vec::new());
        let listener = |table: &str, action: PrimaryAction| {
            seen.lock().unwrap().push((table.to_string(), action));
        };
        listener.on_change("users", PrimaryAction::Insert);
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![("users".to_string(), PrimaryAction::Insert)]
        );
    }
}
