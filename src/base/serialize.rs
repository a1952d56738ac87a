// This file is part of REGISTRAR.
//
// Copyright (C) 2022 Veredictum Ltd.
//
// REGISTRAR is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// REGISTRAR is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with REGISTRAR. If not, see <https://www.gnu.org/licenses/>.

//! JSON serialization helpers.
//!
//! Inbound payloads are "loose" JSON: producers are allowed to leave object
//! keys unquoted. [`json_deserialize_relaxed`] normalizes such payloads by
//! quoting bare keys before handing them to the strict parser. String
//! contents are never touched by the normalization pass.

use crate::{Error, ErrorKind, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Serialize using JSON format.
///
/// # Error
///
/// If the data cannot be serialized a `MalformedData` error kind is returned.
pub fn json_serialize<T>(val: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    serde_json::to_vec(val).map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))
}

/// Deserialize using JSON format.
///
/// # Error
///
/// If the data cannot be deserialized a `MalformedData` error kind is returned.
pub fn json_deserialize<'a, T>(buf: &'a [u8]) -> Result<T>
where
    T: Deserialize<'a>,
{
    serde_json::from_slice(buf).map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))
}

/// Deserialize a loosely formatted JSON payload, tolerating unquoted keys.
pub fn json_deserialize_relaxed<T>(buf: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let raw =
        std::str::from_utf8(buf).map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))?;
    let normalized = json_quote_keys(raw);
    serde_json::from_str(&normalized).map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))
}

/// Quote the bare object keys of a JSON document.
///
/// An identifier run is treated as a key only when the next non-whitespace
/// character is a colon, so literals such as `true` or `null` pass through
/// unmodified.
pub fn json_quote_keys(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 16);
    let mut chars = raw.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => in_string = false,
                _ => (),
            }
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut ident = String::new();
            ident.push(c);
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    ident.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let mut blanks = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    blanks.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek() == Some(&':') {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            out.push_str(&blanks);
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
    struct MyStruct {
        name: String,
        enabled: bool,
        a_vec: Vec<u16>,
        a_map: BTreeMap<String, u32>,
    }

    fn my_struct() -> MyStruct {
        let mut map = BTreeMap::new();
        map.insert("k1".to_owned(), 123);
        map.insert("k2".to_owned(), 456);
        MyStruct {
            name: "Davide".to_owned(),
            enabled: true,
            a_vec: vec![1, 255, 128],
            a_map: map,
        }
    }

    const MYSTRUCT_JSON: &str =
        r#"{"name":"Davide","enabled":true,"a_vec":[1,255,128],"a_map":{"k1":123,"k2":456}}"#;

    const MYSTRUCT_LOOSE_JSON: &str =
        r#"{name:"Davide", enabled : true, a_vec:[1,255,128], a_map:{k1:123,k2:456}}"#;

    #[test]
    fn mystruct_serialize() {
        let st = my_struct();

        let buf = json_serialize(&st).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), MYSTRUCT_JSON);
    }

    #[test]
    fn mystruct_deserialize() {
        let exp = my_struct();

        let st: MyStruct = json_deserialize(MYSTRUCT_JSON.as_bytes()).unwrap();

        assert_eq!(st, exp);
    }

    #[test]
    fn mystruct_deserialize_relaxed() {
        let exp = my_struct();

        let st: MyStruct = json_deserialize_relaxed(MYSTRUCT_LOOSE_JSON.as_bytes()).unwrap();

        assert_eq!(st, exp);
    }

    #[test]
    fn quote_keys_leaves_strict_documents_untouched() {
        assert_eq!(json_quote_keys(MYSTRUCT_JSON), MYSTRUCT_JSON);
    }

    #[test]
    fn quote_keys_skips_literals_and_string_contents() {
        let loose = r#"{a:"x:y", b:true, c:null, d:"\"esc:aped\""}"#;
        let expected = r#"{"a":"x:y", "b":true, "c":null, "d":"\"esc:aped\""}"#;

        assert_eq!(json_quote_keys(loose), expected);
    }

    #[test]
    fn deserialize_garbage() {
        let err = json_deserialize::<MyStruct>(b"not a json").unwrap_err();

        assert_eq!(err.kind, crate::ErrorKind::MalformedData);
    }

    #[test]
    fn deserialize_relaxed_bad_utf8() {
        let err = json_deserialize_relaxed::<MyStruct>(&[0xC0, 0xAF]).unwrap_err();

        assert_eq!(err.kind, crate::ErrorKind::MalformedData);
    }
}
