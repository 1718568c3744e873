use crate::{
    core::value::Value,
    error::{FieldError, Result},
    field::Field,
};
use serde_json::{Map, Value as Json};

/// Document type used when a schema does not declare one.
pub const DEFAULT_DOC_TYPE: &str = "_doc";

/// Declared fields of one document model, built once and shared by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    index: String,
    doc_type: String,
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            index: name.to_lowercase(),
            name,
            doc_type: DEFAULT_DOC_TYPE.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = doc_type.into();
        self
    }

    /// Declares a field under `name`. Redeclaring a name replaces the earlier field.
    pub fn field(mut self, name: &str, field: Field) -> Self {
        let field = field.named(name);
        match self.fields.iter_mut().find(|f| f.name() == Some(name)) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Inherits every field of `parent` that this schema does not redeclare.
    pub fn extend(mut self, parent: &Schema) -> Self {
        let inherited: Vec<Field> = parent
            .fields
            .iter()
            .filter(|f| !self.fields.iter().any(|own| own.name() == f.name()))
            .cloned()
            .collect();
        self.fields.splice(0..0, inherited);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn doc_type_name(&self) -> &str {
        &self.doc_type
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Resolves a dotted path such as `bigbrother.hand.finger` through composite children.
    pub fn lookup(&self, path: &str) -> Option<&Field> {
        let mut segments = path.split('.');
        let head = segments.next()?;
        let mut current = self.fields.iter().find(|f| f.name() == Some(head))?;
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// A record holding every declared default.
    pub fn record(&self) -> Record<'_> {
        let mut data = Map::new();
        for field in &self.fields {
            if let (Some(name), Some(default)) = (field.name(), field.default_value()) {
                data.insert(name.to_string(), default.to_json());
            }
        }
        Record { schema: self, data }
    }
}

/// Instance data of a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'s> {
    schema: &'s Schema,
    data: Map<String, Json>,
}

impl Record<'_> {
    /// Validates and stores a value. Repeatable fields accumulate values in a list.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let schema = self.schema;
        let field = schema
            .fields
            .iter()
            .find(|f| f.name() == Some(name))
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        let checked = field.validate(&value.into())?.to_json();

        if field.is_multi() {
            let slot = self
                .data
                .entry(name.to_string())
                .or_insert_with(|| Json::Array(Vec::new()));
            match slot {
                Json::Array(items) => items.push(checked),
                other => *other = Json::Array(vec![other.take(), checked]),
            }
        } else {
            self.data.insert(name.to_string(), checked);
        }
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Json> {
        self.data.get(name)
    }

    /// The stored values as a JSON document. Fails when a required field has no value.
    pub fn to_document(&self) -> Result<Json> {
        if let Some(missing) = self
            .schema
            .fields
            .iter()
            .filter(|f| f.is_required())
            .filter_map(Field::name)
            .find(|name| !self.data.contains_key(*name))
        {
            return Err(FieldError::MissingRequired(missing.to_string()));
        }
        Ok(Json::Object(self.data.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Schema {
        Schema::new("Base").field("timestamp", Field::timestamp())
    }

    fn log_center() -> Schema {
        Schema::new("LogCenter")
            .index("lala")
            .field("ok", Field::boolean().with_default(true).unwrap())
            .field("lineno", Field::integer().required())
            .field("tags", Field::text().multi())
            .field(
                "bigbrother",
                Field::object([("head", Field::integer()), ("hand", Field::object([("finger", Field::float())]))]),
            )
            .extend(&base())
    }

    #[test]
    fn test_schema_metadata() {
        let schema = log_center();
        assert_eq!(schema.index_name(), "lala");
        assert_eq!(schema.doc_type_name(), DEFAULT_DOC_TYPE);
        assert_eq!(Schema::new("Events").index_name(), "events");
        assert_eq!(schema.fields()[0].name(), Some("timestamp"));
    }

    #[test]
    fn test_lookup_dotted_path() {
        let schema = log_center();
        let finger = schema.lookup("bigbrother.hand.finger").unwrap();
        assert_eq!(finger.name(), Some("bigbrother.hand.finger"));
        assert!(schema.lookup("bigbrother.tail").is_none());
        assert!(schema.lookup("missing").is_none());
    }

    #[test]
    fn test_record_defaults_and_multi() {
        let schema = log_center();
        let mut record = schema.record();
        assert_eq!(record.get("ok"), Some(&json!("true")));

        record.set("tags", "a").unwrap().set("tags", 2).unwrap();
        record.set("lineno", "7").unwrap();
        assert_eq!(
            record.to_document().unwrap(),
            json!({"ok": "true", "lineno": 7, "tags": ["a", "2"]})
        );
    }

    #[test]
    fn test_record_rejects_unknown_and_missing_required() {
        let schema = log_center();
        let mut record = schema.record();
        assert!(matches!(record.set("nope", 1), Err(FieldError::UnknownField(_))));
        assert!(matches!(record.to_document(), Err(FieldError::MissingRequired(name)) if name == "lineno"));
    }
}
