use std::fmt;

use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, NumberValidation, Schema, SchemaObject},
    JsonSchema,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Wire value of a text component the request does not mention
pub const NOT_PROVIDED: &str = "None";
/// Wire value of a locator the request does not mention
pub const MISSING_LOCATOR: i64 = -1;

const SENTINEL_SPELLINGS: [&str; 5] = ["", "none", "null", "n/a", "unknown"];

fn is_sentinel(raw: &str) -> bool {
    let raw = raw.trim();
    SENTINEL_SPELLINGS
        .iter()
        .any(|s| raw.eq_ignore_ascii_case(s))
}

/// A textual address component.
///
/// Always present: a missing key, `null`, an empty string or any spelling of
/// the sentinel decodes to [`Component::NotProvided`], which encodes as `"None"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Component {
    Provided(String),
    #[default]
    NotProvided,
}

impl Component {
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Provided(s) => Some(s),
            Self::NotProvided => None,
        }
    }
}

impl From<&str> for Component {
    fn from(raw: &str) -> Self {
        if is_sentinel(raw) {
            Self::NotProvided
        } else {
            Self::Provided(raw.trim().to_string())
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_deref().unwrap_or(NOT_PROVIDED))
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_deref().unwrap_or(NOT_PROVIDED))
    }
}

impl<'de> Deserialize<'de> for Component {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // going through Option also turns a missing key into `None`
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map_or(Self::NotProvided, |s| Self::from(s.as_str())))
    }
}

impl JsonSchema for Component {
    fn schema_name() -> String {
        "AddressComponent".to_string()
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Numeric locator of an address, e.g. a Dubai Makani number.
///
/// Encodes as the number itself or as `-1` when the request has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locator {
    Known(u64),
    #[default]
    Missing,
}

impl Locator {
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Known(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Self::Missing => MISSING_LOCATOR,
        }
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(n) => serializer.serialize_u64(*n),
            Self::Missing => serializer.serialize_i64(MISSING_LOCATOR),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLocator {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<RawLocator>::deserialize(deserializer)? {
            None => Ok(Self::Missing),
            Some(RawLocator::Unsigned(n)) => Ok(Self::Known(n)),
            Some(RawLocator::Signed(MISSING_LOCATOR)) => Ok(Self::Missing),
            Some(RawLocator::Signed(n)) => Err(de::Error::custom(format!(
                "locator must be -1 or a non-negative integer, got {n}"
            ))),
            Some(RawLocator::Text(s)) if is_sentinel(&s) || s.trim() == "-1" => Ok(Self::Missing),
            Some(RawLocator::Text(s)) => {
                let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                digits.parse().map(Self::Known).map_err(|_| {
                    de::Error::custom(format!("locator must be an integer, got {s:?}"))
                })
            }
        }
    }
}

impl JsonSchema for Locator {
    fn schema_name() -> String {
        "Locator".to_string()
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::Integer.into()),
            number: Some(Box::new(NumberValidation {
                minimum: Some(-1.0),
                ..Default::default()
            })),
            ..Default::default()
        }
        .into()
    }
}

/// Delivery address, broken down into its components.
///
/// Put "None" for every component the text does not give and cannot be
/// inferred with certainty. Infer components that follow from others, e.g. a
/// Dubai address is in the emirate of Dubai, United Arab Emirates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    /// Name of the building or tower, e.g. "Marina Pearl Tower"
    pub building_name: Component,
    /// Street line including house and unit numbers, e.g. "123 Main St, Apt 4B"
    pub street: Component,
    /// Neighbourhood or district
    pub area_name: Component,
    pub city: Component,
    /// State, emirate or province, abbreviated the way the text writes it
    pub region: Component,
    /// ZIP or postal code
    pub postal_code: Component,
    pub country: Component,
    /// Numeric address locator such as a Makani number, -1 when absent
    pub locator: Locator,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_missing_components_decode_to_sentinels() {
        let location: Location = serde_json::from_value(json!({
            "street": "Al Marsa Street",
            "city": "Dubai",
            "region": null,
            "postal_code": "",
            "country": "n/a",
            "area_name": "None"
        }))
        .unwrap();
        assert_eq!(location.street, Component::Provided("Al Marsa Street".into()));
        assert_eq!(location.building_name, Component::NotProvided);
        assert_eq!(location.region, Component::NotProvided);
        assert_eq!(location.postal_code, Component::NotProvided);
        assert_eq!(location.country, Component::NotProvided);
        assert_eq!(location.area_name, Component::NotProvided);
        assert_eq!(location.locator, Locator::Missing);

        let encoded = serde_json::to_value(&location).unwrap();
        assert_eq!(encoded["building_name"], json!("None"));
        assert_eq!(encoded["locator"], json!(-1));
        assert_eq!(encoded.as_object().unwrap().len(), 8);
    }

    #[test]
    fn test_locator_values() {
        let decode = |v| serde_json::from_value::<Locator>(v);
        assert_eq!(decode(json!(1234567890)).unwrap(), Locator::Known(1_234_567_890));
        assert_eq!(decode(json!(-1)).unwrap(), Locator::Missing);
        assert_eq!(decode(json!(null)).unwrap(), Locator::Missing);
        assert_eq!(decode(json!("12345 67890")).unwrap(), Locator::Known(1_234_567_890));
        assert_eq!(decode(json!("None")).unwrap(), Locator::Missing);
        assert!(decode(json!(-7)).is_err());
        assert!(decode(json!("north")).is_err());
        assert_eq!(Locator::Missing.as_i64(), -1);
    }

    #[test]
    fn test_schema_shapes() {
        let schema = serde_json::to_value(schemars::schema_for!(Location)).unwrap();
        assert_eq!(schema["properties"]["city"]["type"], json!("string"));
        assert_eq!(schema["properties"]["locator"]["type"], json!("integer"));
        assert_eq!(schema["properties"]["locator"]["minimum"], json!(-1.0));
        assert_eq!(schema["required"].as_array().unwrap().len(), 8);
    }
}
