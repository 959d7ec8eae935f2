//! Structured trip parameters and the three ways they are produced:
//! normalized from client metadata, read from the model's analysis, and
//! merged from both.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Preferences {
    pub fn is_empty(&self) -> bool {
        self == &Preferences::default()
    }

    fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        let prefs = Preferences {
            travel_style: trimmed(obj.get("travelStyle")),
            budget_level: trimmed(obj.get("budgetLevel")),
            pace: trimmed(obj.get("pace")),
            transport_mode: trimmed(obj.get("transportMode")),
            interests: string_list(obj.get("interests")),
            notes: trimmed(obj.get("notes")),
        };
        (!prefs.is_empty()).then_some(prefs)
    }

    /// Key-by-key, `primary` wins where it has a value.
    fn merge(secondary: Option<&Preferences>, primary: Option<&Preferences>) -> Option<Preferences> {
        let (s, p) = match (secondary, primary) {
            (None, None) => return None,
            (Some(s), None) => return Some(s.clone()),
            (None, Some(p)) => return Some(p.clone()),
            (Some(s), Some(p)) => (s, p),
        };
        Some(Preferences {
            travel_style: p.travel_style.clone().or_else(|| s.travel_style.clone()),
            budget_level: p.budget_level.clone().or_else(|| s.budget_level.clone()),
            pace: p.pace.clone().or_else(|| s.pace.clone()),
            transport_mode: p.transport_mode.clone().or_else(|| s.transport_mode.clone()),
            interests: p.interests.clone().or_else(|| s.interests.clone()),
            notes: p.notes.clone().or_else(|| s.notes.clone()),
        })
    }
}

/// Absent fields are omitted when serialized, never sent as `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passengers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_preferences: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_query: Option<String>,
}

impl TravelDetails {
    /// Canonicalizes the loosely typed metadata bag sent by the client.
    /// Blank or wrongly typed fields are dropped.
    pub fn from_metadata(metadata: &Value) -> Self {
        let Some(obj) = metadata.as_object() else {
            return Self::default();
        };
        Self {
            origin: trimmed(obj.get("origin")),
            destination: trimmed(obj.get("destination")),
            departure_date: trimmed(obj.get("startDate")),
            return_date: trimmed(obj.get("endDate")),
            passengers: positive_count(obj.get("travelers")),
            hotel_preferences: None,
            preferences: Preferences::from_object(obj),
            raw_query: None,
        }
    }

    /// Reads the model's analysis object. Each field is taken on its own so
    /// one malformed value does not discard the rest.
    pub fn from_analysis(analysis: &Value) -> Self {
        let Some(obj) = analysis.as_object() else {
            return Self::default();
        };
        let preferences = obj
            .get("preferences")
            .and_then(Value::as_object)
            .and_then(Preferences::from_object);
        Self {
            origin: trimmed(obj.get("origin")),
            destination: trimmed(obj.get("destination")),
            departure_date: trimmed(obj.get("departureDate")),
            return_date: trimmed(obj.get("returnDate")),
            passengers: positive_count(obj.get("passengers")),
            hotel_preferences: trimmed(obj.get("hotelPreferences")),
            preferences,
            raw_query: trimmed(obj.get("rawQuery")),
        }
    }

    /// Combines analysis and metadata; metadata takes precedence field by
    /// field and `raw_query` is always the user's query.
    pub fn merge(analysis: &TravelDetails, metadata: &TravelDetails, query: &str) -> TravelDetails {
        TravelDetails {
            origin: metadata.origin.clone().or_else(|| analysis.origin.clone()),
            destination: metadata.destination.clone().or_else(|| analysis.destination.clone()),
            departure_date: metadata.departure_date.clone().or_else(|| analysis.departure_date.clone()),
            return_date: metadata.return_date.clone().or_else(|| analysis.return_date.clone()),
            passengers: metadata.passengers.or(analysis.passengers),
            hotel_preferences: metadata
                .hotel_preferences
                .clone()
                .or_else(|| analysis.hotel_preferences.clone()),
            preferences: Preferences::merge(analysis.preferences.as_ref(), metadata.preferences.as_ref()),
            raw_query: Some(query.to_string()),
        }
    }
}

fn trimmed(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items: Vec<String> = value?
        .as_array()?
        .iter()
        .filter_map(|v| trimmed(Some(v)))
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Accepts numbers and numeric strings; keeps only finite values of at
/// least one, truncated to a whole count.
fn positive_count(value: Option<&Value>) -> Option<u32> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() && n >= 1.0 && n <= u32::MAX as f64 {
        Some(n.trunc() as u32)
    } else {
        None
    }
}
