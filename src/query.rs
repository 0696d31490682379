//! Read-side query parameters.
//!
//! Queries are validated and carried on the report of a read; they never
//! change which rules are evaluated.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::UsageError;

/// How a query orders its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    Key,
    Value,
    Priority,
    Child(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Query {
    #[serde(default, skip_serializing_if = "is_false")]
    order_by_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    order_by_value: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    order_by_priority: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order_by_child: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_at: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_at: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equal_to: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit_to_first: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit_to_last: Option<f64>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !b
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse query parameters given as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidQuery`] for unknown keys, values of the
    /// wrong type, or more than one ordering.
    pub fn from_json(value: &JsonValue) -> Result<Self, UsageError> {
        let query: Query =
            serde_json::from_value(value.clone()).map_err(|e| UsageError::InvalidQuery {
                reason: e.to_string(),
            })?;
        query.validate()?;
        Ok(query)
    }

    #[must_use]
    pub fn order_by_key(mut self) -> Self {
        self.order_by_key = true;
        self
    }

    #[must_use]
    pub fn order_by_value(mut self) -> Self {
        self.order_by_value = true;
        self
    }

    #[must_use]
    pub fn order_by_priority(mut self) -> Self {
        self.order_by_priority = true;
        self
    }

    #[must_use]
    pub fn order_by_child(mut self, child: &str) -> Self {
        self.order_by_child = Some(child.to_owned());
        self
    }

    #[must_use]
    pub fn start_at(mut self, value: impl Into<JsonValue>) -> Self {
        self.start_at = Some(value.into());
        self
    }

    #[must_use]
    pub fn end_at(mut self, value: impl Into<JsonValue>) -> Self {
        self.end_at = Some(value.into());
        self
    }

    #[must_use]
    pub fn equal_to(mut self, value: impl Into<JsonValue>) -> Self {
        self.equal_to = Some(value.into());
        self
    }

    #[must_use]
    pub fn limit_to_first(mut self, limit: f64) -> Self {
        self.limit_to_first = Some(limit);
        self
    }

    #[must_use]
    pub fn limit_to_last(mut self, limit: f64) -> Self {
        self.limit_to_last = Some(limit);
        self
    }

    /// Check that at most one ordering is set and every bound is a primitive.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidQuery`] describing the first problem.
    pub fn validate(&self) -> Result<(), UsageError> {
        let orderings = [
            self.order_by_key,
            self.order_by_value,
            self.order_by_priority,
            self.order_by_child.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if orderings > 1 {
            return Err(UsageError::InvalidQuery {
                reason: "orderByKey, orderByValue, orderByPriority and orderByChild are mutually exclusive"
                    .to_owned(),
            });
        }

        let bounds = [
            ("startAt", &self.start_at),
            ("endAt", &self.end_at),
            ("equalTo", &self.equal_to),
        ];
        for (name, bound) in bounds {
            if let Some(value) = bound
                && (value.is_object() || value.is_array())
            {
                return Err(UsageError::InvalidQuery {
                    reason: format!(
                        "{name} must be a string, number, boolean or null, got {value}"
                    ),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn order_by(&self) -> Option<OrderBy> {
        if self.order_by_key {
            Some(OrderBy::Key)
        } else if self.order_by_value {
            Some(OrderBy::Value)
        } else if self.order_by_priority {
            Some(OrderBy::Priority)
        } else {
            self.order_by_child.clone().map(OrderBy::Child)
        }
    }

    #[must_use]
    pub fn start(&self) -> Option<&JsonValue> {
        self.start_at.as_ref()
    }

    #[must_use]
    pub fn end(&self) -> Option<&JsonValue> {
        self.end_at.as_ref()
    }

    #[must_use]
    pub fn equal(&self) -> Option<&JsonValue> {
        self.equal_to.as_ref()
    }

    #[must_use]
    pub fn limit_first(&self) -> Option<f64> {
        self.limit_to_first
    }

    #[must_use]
    pub fn limit_last(&self) -> Option<f64> {
        self.limit_to_last
    }
}
