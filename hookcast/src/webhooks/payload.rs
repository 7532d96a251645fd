//! Webhook Payloads
//!
//! Builds the field mapping posted for one dispatch and renders it as
//! `application/x-www-form-urlencoded`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Content type of every delivery body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Field name carrying the event name.
pub const EVENT_FIELD: &str = "event";

/// Caller-supplied field mapping.
pub type Fields = BTreeMap<String, String>;

/// Immutable field mapping shared by every attempt of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    fields: Fields,
}

impl Payload {
    /// Merge `{"event": event}`, then `extra`, then `args`. Later sources win
    /// on key collisions, so either may override `event`.
    pub fn build<E, A>(event: &str, extra: E, args: A) -> Self
    where
        E: IntoIterator,
        E::Item: Into<(String, String)>,
        A: IntoIterator,
        A::Item: Into<(String, String)>,
    {
        let mut fields = Fields::new();
        fields.insert(EVENT_FIELD.to_string(), event.to_string());
        fields.extend(extra.into_iter().map(Into::into));
        fields.extend(args.into_iter().map(Into::into));
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub const fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Form-encode the fields.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

/// Decode a form body back into fields. Used by receivers and tests.
pub fn decode_form(body: &[u8]) -> Fields {
    form_urlencoded::parse(body).into_owned().collect()
}
