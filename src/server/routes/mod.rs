//! Route handlers.

pub mod assistant;
pub mod devices;
pub mod generation;
pub mod status;

use serde::de::DeserializeOwned;

/// Parse a JSON body leniently: an empty or malformed body yields
/// `T::default()`, leaving field validation to the handler.
pub(crate) fn json_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    if body.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!("ignoring unparseable JSON body: {e}");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Body {
        name: Option<String>,
    }

    #[test]
    fn empty_and_invalid_bodies_default() {
        assert_eq!(json_or_default::<Body>(b""), Body::default());
        assert_eq!(json_or_default::<Body>(b"not json"), Body::default());
        assert_eq!(
            json_or_default::<Body>(br#"{"name": "lamp"}"#),
            Body {
                name: Some("lamp".into())
            }
        );
    }
}
