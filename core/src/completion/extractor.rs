use schemars::{gen::SchemaSettings, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::validation::ValidationError;

const MAX_NAME_LEN: usize = 64;
const FALLBACK_NAME: &str = "extract";

/// A type the model can be asked to fill in.
///
/// Usually derived with `#[derive(Extractor)]`, which also wires
/// [`post_decode`](Extractor::post_decode) to the type's
/// [`Validate`](crate::validation::Validate) rules when `#[extractor(validate)]` is set.
pub trait Extractor: JsonSchema + DeserializeOwned + Send {
    /// Name the schema is sent under
    fn name() -> String {
        sanitize_name(&<Self as JsonSchema>::schema_name())
    }

    /// Instructions sent alongside the schema
    fn description() -> Option<String> {
        None
    }

    /// Rules applied after a successful decode
    fn post_decode(self) -> Result<Self, ValidationError> {
        Ok(self)
    }
}

/// JSON schema of an [`Extractor`], ready to be sent to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorSchema {
    pub name: String,
    pub description: Option<String>,
    pub schema: Value,
}

impl ExtractorSchema {
    pub fn for_type<T: Extractor>() -> Result<Self, serde_json::Error> {
        let settings = SchemaSettings::default().with(|s| {
            s.inline_subschemas = true;
        });
        let generator = settings.into_generator();
        let schema = generator.into_root_schema_for::<T>();
        let mut schema_value = serde_json::to_value(&schema)?;

        if let Some(obj) = schema_value.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        process_json_value(&mut schema_value);

        let description = T::description().or_else(|| {
            schema_value["description"]
                .as_str()
                .map(ToString::to_string)
        });

        Ok(Self {
            name: T::name(),
            description,
            schema: schema_value,
        })
    }
}

fn process_json_value(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if obj.get("title").is_some_and(Value::is_string) {
                obj.remove("title");
            }
            if let Some(v) = obj.remove("oneOf") {
                obj.insert("anyOf".to_string(), v);
            }
            if obj.contains_key("properties") {
                obj.insert("additionalProperties".to_string(), json!(false));
            }
            for (_, v) in obj.iter_mut() {
                process_json_value(v);
            }
        }
        Value::Array(arr) => {
            for elem in arr.iter_mut() {
                process_json_value(elem);
            }
        }
        _ => {}
    }
}

/// Maps a schema name onto the `[A-Za-z0-9_-]{1,64}` alphabet tool names allow
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

/// Decodes raw tool input into `T` and applies its post-decode rules.
pub fn decode<T: Extractor>(raw: &str) -> Result<T, ValidationError> {
    let value: T =
        serde_json::from_str(raw).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    value.post_decode()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    /// A person mentioned in the text
    #[allow(unused)]
    #[derive(JsonSchema, Deserialize, Debug)]
    struct Person {
        /// Full name of the person
        name: String,
        age: u8,
        tags: Vec<Tag>,
    }

    #[allow(unused)]
    #[derive(JsonSchema, Deserialize, Debug)]
    struct Tag {
        label: String,
    }

    impl Extractor for Person {}

    #[test]
    fn test_schema_is_inlined_and_closed() {
        let schema = ExtractorSchema::for_type::<Person>().unwrap();
        assert_eq!(schema.name, "Person");
        assert_eq!(
            schema.description.as_deref(),
            Some("A person mentioned in the text")
        );
        let value = &schema.schema;
        assert!(value.get("$schema").is_none());
        assert!(value.get("title").is_none());
        assert!(value.get("definitions").is_none());
        assert_eq!(value["additionalProperties"], json!(false));
        assert_eq!(
            value["properties"]["tags"]["items"]["additionalProperties"],
            json!(false)
        );
        assert_eq!(
            value["properties"]["name"]["description"],
            json!("Full name of the person")
        );
    }

    #[test]
    fn test_properties_keep_declaration_order() {
        let schema = ExtractorSchema::for_type::<Person>().unwrap();
        let keys: Vec<_> = schema.schema["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["name", "age", "tags"]);
    }

    #[test]
    fn test_one_of_becomes_any_of() {
        let mut value = json!({"oneOf": [{"type": "string", "title": "A"}]});
        process_json_value(&mut value);
        assert_eq!(value, json!({"anyOf": [{"type": "string"}]}));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(
            sanitize_name("ExtractionResult_for_TextSchedule"),
            "ExtractionResult_for_TextSchedule"
        );
        assert_eq!(sanitize_name("Array_of<Person>"), "Array_of_Person_");
        assert_eq!(sanitize_name(""), "extract");
        assert_eq!(sanitize_name(&"x".repeat(100)).len(), 64);
    }

    #[test]
    fn test_decode_reports_malformed_output() {
        let ok: Person = decode(r#"{"name": "Jo", "age": 3, "tags": []}"#).unwrap();
        assert_eq!(ok.age, 3);
        let err = decode::<Person>(r#"{"name": "Jo", "age": -3, "tags": []}"#).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }
}
