use model::SortOrder;
use sql_syntax::{Expr, Operand};

/// Order-by entries in declaration order. Declaring a key again replaces its direction
/// but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBy {
    entries: Vec<(String, SortOrder)>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, order: SortOrder) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = order,
            None => self.entries.push((key, order)),
        }
    }

    pub fn get(&self, key: &str) -> Option<SortOrder> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, order)| *order)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortOrder)> {
        self.entries.iter().map(|(key, order)| (key.as_str(), *order))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, SortOrder)> for OrderBy {
    fn from_iter<I: IntoIterator<Item = (K, SortOrder)>>(iter: I) -> Self {
        let mut order_by = OrderBy::new();
        for (key, order) in iter {
            order_by.insert(key, order);
        }
        order_by
    }
}

/// Everything one compile call consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectStatement {
    pub where_clause: Option<Expr>,
    /// Plain fields (`Field`, bare name) and aggregation expressions.
    pub fields: Vec<Operand>,
    pub group_by: Vec<Operand>,
    pub order_by: OrderBy,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectStatement {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_replaces_in_place() {
        let mut order_by: OrderBy = [("lineno", SortOrder::Desc), ("timestamp", SortOrder::Asc)]
            .into_iter()
            .collect();
        order_by.insert("lineno", SortOrder::Asc);
        assert_eq!(order_by.len(), 2);
        assert_eq!(
            order_by.iter().collect::<Vec<_>>(),
            vec![("lineno", SortOrder::Asc), ("timestamp", SortOrder::Asc)]
        );
        assert!(order_by.contains("timestamp"));
        assert_eq!(order_by.get("host"), None);
    }
}
