// crates/entitlements-core/src/runtime/query.rs
// ============================================================================
// Module: Search Query Builder
// Description: Fluent builder for accounts-system search expressions.
// Purpose: Compose `LIKE`, `=`, and `IN` predicates joined by `AND`.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The accounts system filters collections with a SQL-like `search`
//! parameter. [`SearchQuery`] composes those expressions. Values are quoted
//! verbatim: single quotes are not escaped, so callers must only pass values
//! known not to contain `'`.

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Single-use builder for search expressions.
///
/// # Invariants
/// - [`SearchQuery::build`] does not consume or mutate the builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Expression accumulated so far.
    expression: String,
}

impl SearchQuery {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `field LIKE 'value'`.
    #[must_use]
    pub fn like(mut self, field: &str, value: &str) -> Self {
        self.expression.push_str(&format!("{field} LIKE '{value}'"));
        self
    }

    /// Appends `field = 'value'`.
    #[must_use]
    pub fn equals(mut self, field: &str, value: &str) -> Self {
        self.expression.push_str(&format!("{field} = '{value}'"));
        self
    }

    /// Appends `field IN ('v1','v2',...)`.
    #[must_use]
    pub fn in_values<S: AsRef<str>>(mut self, field: &str, values: &[S]) -> Self {
        let quoted: Vec<String> =
            values.iter().map(|value| format!("'{}'", value.as_ref())).collect();
        self.expression.push_str(&format!("{field} IN ({})", quoted.join(",")));
        self
    }

    /// Appends the ` AND ` conjunction.
    #[must_use]
    pub fn and(mut self) -> Self {
        self.expression.push_str(" AND ");
        self
    }

    /// Returns the expression built so far.
    #[must_use]
    pub fn build(&self) -> String {
        self.expression.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::SearchQuery;

    #[test]
    fn composes_seat_subscription_search() {
        let query = SearchQuery::new()
            .like("plan.id", "AnsibleWisdom")
            .and()
            .equals("organization_id", "AMSORG1")
            .and()
            .in_values("status", &["Active", "Deprovisioned"]);
        assert_eq!(
            query.build(),
            "plan.id LIKE 'AnsibleWisdom' AND organization_id = 'AMSORG1' AND status IN \
             ('Active','Deprovisioned')"
        );
    }

    #[test]
    fn build_is_idempotent() {
        let query = SearchQuery::new().like("quota_id", "seat|ansible.wisdom%");
        assert_eq!(query.build(), query.build());
        assert_eq!(query.build(), "quota_id LIKE 'seat|ansible.wisdom%'");
    }

    #[test]
    fn empty_builder_builds_empty_expression() {
        assert_eq!(SearchQuery::new().build(), "");
    }
}
