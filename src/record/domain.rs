//! Core expense record domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, macros::format_description};

use crate::Error;

/// The key holding the name of the shop or business on the receipt.
pub const ESTABLISHMENT_KEY: &str = "estabelecimento";
/// The key holding the total amount paid, as a decimal string such as "44.40".
pub const TOTAL_AMOUNT_KEY: &str = "valor_total";
/// The key holding the ISO-8601 date-time of the transaction.
pub const TRANSACTION_TIMESTAMP_KEY: &str = "data_transacao";
/// The key holding the spending category of the transaction.
pub const CATEGORY_KEY: &str = "categoria";

/// Database identifier for an expense record.
pub type RecordId = i64;

/// A structured extraction of one receipt.
///
/// The record is the JSON object produced by the model, kept verbatim so that
/// clients see exactly what was extracted. Only objects can be records: a
/// scalar, array or null is rejected when the record is created, and
/// deserializing anything but a JSON object fails.
///
/// The well-known fields are read through accessors. None of them are
/// required, since the model may leave a field out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseRecord(Map<String, Value>);

impl ExpenseRecord {
    /// Create a record from a JSON value.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::UnexpectedResponseShape] if
    /// `value` is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::UnexpectedResponseShape(
                json_type_name(&other).to_owned(),
            )),
        }
    }

    /// The fields of the record.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The name of the shop or business, if present and non-empty.
    pub fn establishment(&self) -> Option<&str> {
        self.non_empty_str(ESTABLISHMENT_KEY)
    }

    /// The total amount as written by the model, e.g. "12.50".
    ///
    /// The amount is not checked to be a number.
    pub fn total_amount(&self) -> Option<&str> {
        self.non_empty_str(TOTAL_AMOUNT_KEY)
    }

    /// The raw transaction timestamp string.
    pub fn transaction_timestamp(&self) -> Option<&str> {
        self.non_empty_str(TRANSACTION_TIMESTAMP_KEY)
    }

    /// The transaction timestamp parsed as a local date-time.
    ///
    /// A timestamp with only a date resolves to midnight of that date.
    /// Returns `None` if the field is missing or cannot be parsed.
    pub fn transaction_datetime(&self) -> Option<PrimitiveDateTime> {
        self.transaction_timestamp().and_then(parse_timestamp)
    }

    /// The spending category, if the field holds one of the known labels.
    pub fn category(&self) -> Option<Category> {
        self.non_empty_str(CATEGORY_KEY)
            .and_then(|label| label.parse().ok())
    }

    /// Format the record as indented JSON for display.
    pub fn to_pretty_json(&self) -> String {
        // A map of JSON values always serializes.
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| format!("{:?}", self.0))
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// An expense record as read back from the record store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// The ID of the record in the store. IDs increase in insertion order.
    pub id: RecordId,
    /// When the record was added to the store.
    pub created_at: OffsetDateTime,
    /// The record itself.
    pub record: ExpenseRecord,
}

/// The spending categories the extraction prompt asks the model to choose from.
///
/// The category is a prompt-level constraint only, records with other labels
/// are still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Groceries, restaurants, cafés.
    Food,
    /// Fuel, fares, parking.
    Transport,
    /// Entertainment and hobbies.
    Leisure,
    /// Rent, utilities, household goods.
    Housing,
    /// Pharmacies, doctors.
    Health,
    /// Anything else.
    Other,
}

impl Category {
    /// All categories in prompt order.
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transport,
        Category::Leisure,
        Category::Housing,
        Category::Health,
        Category::Other,
    ];

    /// The label the extraction prompt uses for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Food => "Alimentação",
            Category::Transport => "Transporte",
            Category::Leisure => "Lazer",
            Category::Housing => "Moradia",
            Category::Health => "Saúde",
            Category::Other => "Outros",
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Parse a category from its prompt label or its English name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let category = match s.trim().to_lowercase().as_str() {
            "alimentação" | "alimentacao" | "food" => Category::Food,
            "transporte" | "transport" => Category::Transport,
            "lazer" | "leisure" => Category::Leisure,
            "moradia" | "housing" => Category::Housing,
            "saúde" | "saude" | "health" => Category::Health,
            "outros" | "other" => Category::Other,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "\"{s}\" is not a known category"
                )));
            }
        };

        Ok(category)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn parse_timestamp(text: &str) -> Option<PrimitiveDateTime> {
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let with_minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    let date_only = format_description!("[year]-[month]-[day]");

    // Ignore fractional seconds and any UTC offset, only the local wall time matters.
    let text = text.get(..19).unwrap_or(text);

    PrimitiveDateTime::parse(text, with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(text, with_minutes))
        .ok()
        .or_else(|| {
            Date::parse(text.get(..10)?, date_only)
                .ok()
                .map(|date| date.with_time(Time::MIDNIGHT))
        })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}


#[cfg(test)]
mod category_tests {
    use crate::record::Category;

    #[test]
    fn parses_prompt_labels() {
        for category in Category::ALL {
            assert_eq!(category.label().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn parses_english_names_ignoring_case() {
        assert_eq!("FOOD".parse::<Category>(), Ok(Category::Food));
        assert_eq!(" transport ".parse::<Category>(), Ok(Category::Transport));
        assert_eq!("saude".parse::<Category>(), Ok(Category::Health));
    }

    #[test]
    fn rejects_unknown_label() {
        assert!("Groceries".parse::<Category>().is_err());
    }
}
