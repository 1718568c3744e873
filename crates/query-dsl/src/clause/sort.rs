use crate::{
    body::ClauseBody,
    clause::{Clause, single_entry, term::non_empty_field},
    error::{DslError, Result},
    registry::ClauseArgs,
    version::Version,
};
use model::SortOrder;
use serde_json::Value;

/// One sort key: `{field: {"order": "asc", ...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub(crate) body: ClauseBody,
    field: String,
}

impl SortField {
    pub fn new(field: impl Into<String>, version: Version) -> Result<Self> {
        let field = non_empty_field("sort", field.into())?;
        let body = ClauseBody::new(&[&field], version, &[])?;
        Ok(Self { body, field })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.body.put("order", Value::from(order.as_str()));
        self
    }

    /// Reduction applied to multi-valued fields: `min`, `max`, `sum`, `avg` or `median`.
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.body.put("mode", Value::from(mode));
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.body.put("unit", Value::from(unit));
        self
    }

    pub fn with_nested_path(mut self, path: &str) -> Self {
        self.body.put("nested_path", Value::from(path));
        self
    }

    pub fn with_nested_filter(mut self, filter: impl Into<Value>) -> Self {
        self.body.put("nested_filter", filter.into());
        self
    }

    pub fn order(&self) -> Option<SortOrder> {
        self.body
            .get("order")
            .and_then(Value::as_str)
            .and_then(|order| order.parse().ok())
    }

    pub fn mode(&self) -> Option<&str> {
        self.body.get("mode").and_then(Value::as_str)
    }

    pub fn nested_path(&self) -> Option<&str> {
        self.body.get("nested_path").and_then(Value::as_str)
    }

    /// Accepts `{field: {...}}`, the `{field: "desc"}` shorthand, or a bare field name.
    pub fn from_document(doc: &Value, version: Version) -> Result<Self> {
        if let Value::String(field) = doc {
            return SortField::new(field.as_str(), version);
        }

        let (field, params) = single_entry(doc).map_err(|e| match e {
            DslError::MalformedClauseSpec(reason) => DslError::MalformedClauseSpec(format!("sort: {reason}")),
            other => other,
        })?;
        let mut sort = SortField::new(field.as_str(), version)?;
        match params {
            Value::Object(params) => {
                for (key, value) in params {
                    sort.body.put(key, value.clone());
                }
            }
            Value::String(order) => {
                let order = order.parse::<SortOrder>().map_err(DslError::MalformedClauseSpec)?;
                sort = sort.with_order(order);
            }
            other => {
                return Err(DslError::MalformedClauseSpec(format!(
                    "sort: unexpected parameters for '{field}': {other}"
                )));
            }
        }
        Ok(sort)
    }
}

pub(crate) fn construct(args: ClauseArgs<'_>) -> Result<Clause> {
    match (args.body, args.field) {
        (Some(body), _) => SortField::from_document(body, args.version).map(Clause::Sort),
        (None, Some(field)) => SortField::new(field, args.version).map(Clause::Sort),
        (None, None) => Err(DslError::MissingField { clause: "sort", what: "field name" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_document() {
        let sort = SortField::new("price", Version::default())
            .unwrap()
            .with_order(SortOrder::Desc)
            .with_mode("avg");
        assert_eq!(sort.order(), Some(SortOrder::Desc));
        assert_eq!(sort.mode(), Some("avg"));
        assert_eq!(Value::from(sort), json!({"price": {"order": "desc", "mode": "avg"}}));
    }

    #[test]
    fn test_sort_shorthands() {
        let sort = SortField::from_document(&json!({"lineno": "desc"}), Version::default()).unwrap();
        assert_eq!(sort.order(), Some(SortOrder::Desc));

        let sort = SortField::from_document(&json!("host"), Version::default()).unwrap();
        assert_eq!(sort.field(), "host");
        assert!(sort.order().is_none());

        assert!(SortField::from_document(&json!({"lineno": "up"}), Version::default()).is_err());
        assert!(SortField::from_document(&json!({"lineno": 3}), Version::default()).is_err());
    }
}
