//! The durable unit of work: `Item`, its processing `State`, and the wire
//! types the HTTP front door and `Store` trade in.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use typed_builder::TypedBuilder;

/// Processing state of a notification. Encoded on the wire (and in the
/// `cur_state` column) as a plain `i16`: `PENDING=0, SUCCESS=1, FAILED=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Success,
    Failed,
}

impl State {
    pub fn as_i16(self) -> i16 {
        match self {
            State::Pending => 0,
            State::Success => 1,
            State::Failed => 2,
        }
    }

    pub fn from_i16(v: i16) -> Option<Self> {
        match v {
            0 => Some(State::Pending),
            1 => Some(State::Success),
            2 => Some(State::Failed),
            _ => None,
        }
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i16(self.as_i16())
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = i16::deserialize(d)?;
        State::from_i16(v).ok_or_else(|| de::Error::custom(format!("invalid state code {v}")))
    }
}

/// A single durable notification record, as defined in `DATA MODEL`.
///
/// `Create` produces one with `tried=0`, `state=Pending`, `next_at=create_at`.
/// From then on only the Dispatcher/Worker pair and the Lifecycle API's
/// `resend`/`delete`/`clear` operations mutate it, always through a `Store`.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Item {
    pub id: String,
    pub driver: String,
    pub endpoint: String,
    #[builder(setter(!into))]
    pub content: Vec<u8>,
    pub create_at: i64,
    pub next_at: i64,
    #[builder(default = 0)]
    pub tried: u32,
    #[builder(default = State::Pending)]
    pub state: State,
    #[builder(default, setter(strip_option, !into))]
    pub response: Option<Vec<u8>>,
}

/// Request body accepted by `/send` and `/sendOnce`.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    pub id: String,
    #[serde(rename = "type")]
    pub driver: String,
    pub endpoint: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Response body of `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct ItemStatus {
    pub create_at: i64,
    pub next_at: i64,
    pub tried: u32,
    pub state: State,
}

/// Response body of `/detail`. `content`/`response` are rendered lossily as
/// UTF-8 — the front door is a diagnostic surface, not a byte-exact mirror of
/// the stored payload.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    #[serde(rename = "type")]
    pub driver: String,
    pub endpoint: String,
    pub content: String,
    pub response: Option<String>,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl From<Item> for ItemStatus {
    fn from(item: Item) -> Self {
        ItemStatus {
            create_at: item.create_at,
            next_at: item.next_at,
            tried: item.tried,
            state: item.state,
        }
    }
}

impl From<Item> for ItemDetail {
    fn from(item: Item) -> Self {
        ItemDetail {
            driver: item.driver,
            endpoint: item.endpoint,
            content: String::from_utf8_lossy(&item.content).into_owned(),
            response: item
                .response
                .as_deref()
                .map(|r| String::from_utf8_lossy(r).into_owned()),
            status: ItemStatus {
                create_at: item.create_at,
                next_at: item.next_at,
                tried: item.tried,
                state: item.state,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roundtrips_through_wire_codes() {
        for s in [State::Pending, State::Success, State::Failed] {
            assert_eq!(State::from_i16(s.as_i16()), Some(s));
        }
        assert_eq!(State::from_i16(99), None);
    }

    #[test]
    fn state_serializes_as_bare_integer() {
        assert_eq!(serde_json::to_string(&State::Pending).unwrap(), "0");
        assert_eq!(serde_json::to_string(&State::Success).unwrap(), "1");
        assert_eq!(serde_json::to_string(&State::Failed).unwrap(), "2");
    }
}
