// src/storage/types.rs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Discriminator stamped on every persisted Environment document
pub const ENVIRONMENT_OBJTYPE: &str = "Environment";

// ============================================================================
// Core Domain Types
// ============================================================================

/// The Environment record.
///
/// Only `_key`, `name` and `objtype` are interpreted by the service; any other
/// field is carried through verbatim in `fields`. Empty strings are omitted on
/// output, so `Environment::default()` serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(
        rename = "_key",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub key: String,

    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "String::is_empty")]
    pub objtype: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A `null` string field reads as empty
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Environment {
    /// Create a named environment carrying the Environment discriminator
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: String::new(),
            name: name.into(),
            objtype: ENVIRONMENT_OBJTYPE.to_string(),
            fields: Map::new(),
        }
    }

    /// Build an environment from a raw database document
    pub fn from_document(document: Value) -> serde_json::Result<Self> {
        serde_json::from_value(document)
    }

    /// Convert into the raw document written to the database
    pub fn to_document(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Stamp the discriminator so the record is visible to the list query
    pub fn stamp_objtype(&mut self) {
        self.objtype = ENVIRONMENT_OBJTYPE.to_string();
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.name.is_empty() && self.objtype.is_empty() && self.fields.is_empty()
    }
}

/// Bookkeeping returned by the database for a stored document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_key", default)]
    pub key: String,

    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(rename = "_rev", default)]
    pub rev: String,
}

impl DocumentMeta {
    /// Extract the metadata fields from a raw document
    pub fn from_document(collection: &str, document: &Value) -> Self {
        let field = |name: &str| {
            document
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let key = field("_key");
        let id = match field("_id") {
            id if id.is_empty() && !key.is_empty() => format!("{}/{}", collection, key),
            id => id,
        };

        Self {
            key,
            id,
            rev: field("_rev"),
        }
    }
}

/// Drop the database bookkeeping fields that are not part of the record
pub fn strip_bookkeeping(mut document: Value) -> Value {
    if let Some(object) = document.as_object_mut() {
        object.remove("_id");
        object.remove("_rev");
    }
    document
}

// ============================================================================
// Query Types
// ============================================================================

/// The two lookups the service performs, expressed independently of any
/// query language. Backends either render it to AQL with bind variables or
/// evaluate it as a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentQuery {
    /// Every document whose `objtype` equals the given discriminator
    ByObjType { objtype: String },

    /// Documents whose `name` or `_key` equals `key` exactly
    ByKeyOrName { key: String },
}

impl EnvironmentQuery {
    pub fn all() -> Self {
        Self::ByObjType {
            objtype: ENVIRONMENT_OBJTYPE.to_string(),
        }
    }

    pub fn key_or_name(key: impl Into<String>) -> Self {
        Self::ByKeyOrName { key: key.into() }
    }

    /// Render to AQL. The collection is passed as a bind parameter too, so no
    /// caller-controlled text ever reaches the query string.
    pub fn to_aql(&self, collection: &str) -> AqlQuery {
        let mut bind_vars = Map::new();
        bind_vars.insert("@collection".to_string(), Value::from(collection));

        let query = match self {
            Self::ByObjType { objtype } => {
                bind_vars.insert("objtype".to_string(), Value::from(objtype.as_str()));
                "FOR doc IN @@collection FILTER doc.objtype == @objtype RETURN doc"
            }
            Self::ByKeyOrName { key } => {
                bind_vars.insert("key".to_string(), Value::from(key.as_str()));
                "FOR doc IN @@collection FILTER doc.name == @key OR doc._key == @key RETURN doc"
            }
        };

        AqlQuery {
            query: query.to_string(),
            bind_vars,
        }
    }

    /// Evaluate the query against a single document
    pub fn matches(&self, document: &Value) -> bool {
        let field_eq = |field: &str, expected: &str| {
            document.get(field).and_then(Value::as_str) == Some(expected)
        };

        match self {
            Self::ByObjType { objtype } => field_eq("objtype", objtype),
            Self::ByKeyOrName { key } => field_eq("name", key) || field_eq("_key", key),
        }
    }
}

/// A rendered AQL query with its bind variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqlQuery {
    pub query: String,
    #[serde(rename = "bindVars")]
    pub bind_vars: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zero_value_serializes_empty() {
        let environment = Environment::default();
        assert_eq!(serde_json::to_string(&environment).unwrap(), "{}");
        assert!(environment.is_empty());
    }

    #[test]
    fn test_extra_fields_pass_through() {
        let document = json!({
            "_key": "abc123",
            "name": "prod",
            "objtype": "Environment",
            "owner": {"domain": "GLOBAL"},
            "region": "us-east-1"
        });

        let environment = Environment::from_document(document.clone()).unwrap();
        assert_eq!(environment.key, "abc123");
        assert_eq!(environment.name, "prod");
        assert_eq!(environment.fields["region"], "us-east-1");
        assert_eq!(environment.to_document().unwrap(), document);
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let environment = Environment::from_document(json!({
            "_key": null,
            "name": null,
            "objtype": null,
            "domain": null
        }))
        .unwrap();

        assert!(environment.key.is_empty());
        assert!(environment.name.is_empty());
        assert!(environment.objtype.is_empty());
        assert_eq!(environment.fields["domain"], Value::Null);
    }

    #[test]
    fn test_non_string_fields_still_rejected() {
        assert!(Environment::from_document(json!({"name": 12})).is_err());
    }

    #[test]
    fn test_new_stamps_objtype() {
        let environment = Environment::new("dev");
        assert_eq!(environment.objtype, ENVIRONMENT_OBJTYPE);
        assert!(environment.key.is_empty());
    }

    #[test]
    fn test_document_meta_fills_missing_id() {
        let meta = DocumentMeta::from_document("environments", &json!({"_key": "k1"}));
        assert_eq!(meta.key, "k1");
        assert_eq!(meta.id, "environments/k1");
        assert!(meta.rev.is_empty());
    }

    #[test]
    fn test_strip_bookkeeping() {
        let stripped = strip_bookkeeping(json!({"_key": "k", "_id": "c/k", "_rev": "r", "name": "n"}));
        assert_eq!(stripped, json!({"_key": "k", "name": "n"}));
    }

    #[test]
    fn test_key_or_name_query_is_parameterized() {
        let aql = EnvironmentQuery::key_or_name("prod\" || true").to_aql("environments");

        assert!(!aql.query.contains("prod"));
        assert!(aql.query.contains("doc.name == @key OR doc._key == @key"));
        assert_eq!(aql.bind_vars["key"], "prod\" || true");
        assert_eq!(aql.bind_vars["@collection"], "environments");
    }

    #[test]
    fn test_all_query_filters_discriminator() {
        let aql = EnvironmentQuery::all().to_aql("evidence");
        assert!(aql.query.contains("doc.objtype == @objtype"));
        assert_eq!(aql.bind_vars["objtype"], ENVIRONMENT_OBJTYPE);

        let serialized = serde_json::to_value(&aql).unwrap();
        assert!(serialized.get("bindVars").is_some());
    }

    #[test]
    fn test_query_matching() {
        let document = json!({"_key": "abc", "name": "prod", "objtype": "Environment"});
        let other = json!({"_key": "xyz", "name": "prod", "objtype": "Application"});

        assert!(EnvironmentQuery::all().matches(&document));
        assert!(!EnvironmentQuery::all().matches(&other));

        assert!(EnvironmentQuery::key_or_name("abc").matches(&document));
        assert!(EnvironmentQuery::key_or_name("prod").matches(&document));
        assert!(!EnvironmentQuery::key_or_name("Prod").matches(&document));
        assert!(!EnvironmentQuery::key_or_name("pro").matches(&document));
    }
}
