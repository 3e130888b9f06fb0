use num_bigint::BigUint;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serializer};

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Serde helpers for encoding big integers as 0x-prefixed big-endian hex strings.
pub mod biguint {
    use super::*;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let hex = format!("0x{}", hex::encode(value.to_bytes_be()));
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(strip_prefix(&s)).map_err(DeError::custom)?;
        Ok(BigUint::from_bytes_be(&bytes))
    }
}

/// Serde helpers for raw byte strings encoded as 0x-prefixed hex. The bytes
/// are kept verbatim so minimality can be checked by the caller.
pub mod bytes {
    use super::*;

    pub fn serialize<S>(value: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(strip_prefix(&s)).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super::biguint")]
        value: BigUint,
        #[serde(with = "super::bytes")]
        raw: Vec<u8>,
    }

    #[test]
    fn encodes_as_prefixed_hex() {
        let holder = Holder {
            value: BigUint::from(0xBEEFu32),
            raw: vec![0x00, 0x81],
        };
        let json = serde_json::to_value(&holder).unwrap();
        assert_eq!(json["value"], "0xbeef");
        assert_eq!(json["raw"], "0x0081");

        let restored: Holder = serde_json::from_value(json).unwrap();
        assert_eq!(restored, holder);
    }

    #[test]
    fn accepts_unprefixed_and_rejects_garbage() {
        let restored: Holder =
            serde_json::from_str(r#"{ "value": "0102", "raw": "ff" }"#).unwrap();
        assert_eq!(restored.value, BigUint::from(0x0102u32));
        assert_eq!(restored.raw, vec![0xff]);

        let err = serde_json::from_str::<Holder>(r#"{ "value": "0xzz", "raw": "" }"#);
        assert!(err.is_err());
    }
}
