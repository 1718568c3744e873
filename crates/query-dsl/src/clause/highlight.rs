use crate::{
    body::ClauseBody,
    clause::Clause,
    error::{DslError, Result},
    registry::ClauseArgs,
    version::Version,
};
use serde_json::{Map, Value};

/// Highlighting options, embedded under `highlight` in a search request.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub(crate) body: ClauseBody,
}

impl Highlight {
    pub fn new(version: Version) -> Result<Self> {
        Ok(Self {
            body: ClauseBody::new(&[], version, &[])?,
        })
    }

    pub fn with_pre_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.append("pre_tags", tags.into_iter().map(|tag| Value::String(tag.into())));
        self
    }

    pub fn with_post_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.append("post_tags", tags.into_iter().map(|tag| Value::String(tag.into())));
        self
    }

    /// Highlights `field`; an empty parameter map uses the backend defaults.
    pub fn with_field(mut self, field: &str, params: Map<String, Value>) -> Self {
        if let Some(fields) = self.body.child_mut("fields") {
            fields.insert(field.to_string(), Value::Object(params));
        }
        self
    }

    pub fn with_order(mut self, order: &str) -> Self {
        self.body.put("order", Value::from(order));
        self
    }

    pub fn with_fragment_size(mut self, size: u64) -> Self {
        self.body.put("fragment_size", Value::from(size));
        self
    }

    pub fn with_number_of_fragments(mut self, count: u64) -> Self {
        self.body.put("number_of_fragments", Value::from(count));
        self
    }

    pub fn pre_tags(&self) -> Vec<&str> {
        string_list(self.body.get("pre_tags"))
    }

    pub fn post_tags(&self) -> Vec<&str> {
        string_list(self.body.get("post_tags"))
    }

    pub fn fields(&self) -> Vec<&str> {
        self.body
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| fields.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn from_body(body: &Value, version: Version) -> Result<Self> {
        let params = body
            .as_object()
            .ok_or_else(|| DslError::MalformedClauseSpec(format!("highlight: expected a mapping, got {body}")))?;
        let mut highlight = Highlight::new(version)?;
        for (key, value) in params {
            highlight.body.put(key, value.clone());
        }
        Ok(highlight)
    }
}

fn string_list(value: Option<&Value>) -> Vec<&str> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub(crate) fn construct(args: ClauseArgs<'_>) -> Result<Clause> {
    match args.body {
        Some(body) => Highlight::from_body(body, args.version).map(Clause::Highlight),
        None => Highlight::new(args.version).map(Clause::Highlight),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_highlight_document() {
        let highlight = Highlight::new(Version::default())
            .unwrap()
            .with_pre_tags(["<em>"])
            .with_post_tags(["</em>"])
            .with_field("msg", Map::new())
            .with_order("score");
        assert_eq!(highlight.pre_tags(), vec!["<em>"]);
        assert_eq!(highlight.fields(), vec!["msg"]);
        assert_eq!(
            Value::from(highlight),
            json!({"pre_tags": ["<em>"], "post_tags": ["</em>"], "fields": {"msg": {}}, "order": "score"})
        );
    }

    #[test]
    fn test_from_body_copies_options() {
        let doc = json!({"fields": {"title": {"number_of_fragments": 0}}, "fragment_size": 150});
        let highlight = Highlight::from_body(&doc, Version::new(7, 0)).unwrap();
        assert_eq!(Value::from(highlight), doc);
    }
}
