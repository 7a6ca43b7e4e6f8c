//! Tests for the decode module

use super::decoders::extract_path;
use super::*;
use crate::error::Error;
use crate::transport::ResponseEnvelope;
use bytes::Bytes;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, PartialEq)]
struct Todo {
    id: u32,
    title: String,
}

#[test]
fn test_json_decoder_typed() {
    let decoder = JsonDecoder::<Todo>::new();
    let envelope = ResponseEnvelope::new(200, r#"{"id": 7, "title": "ship it"}"#);

    let todo = decoder.decode(&envelope).unwrap();
    assert_eq!(todo.id, 7);
    assert_eq!(todo.title, "ship it");
}

#[test]
fn test_json_decoder_failure_keeps_body() {
    let decoder = JsonDecoder::<Todo>::new();
    let envelope = ResponseEnvelope::new(200, "<html>oops</html>");

    match decoder.decode(&envelope) {
        Err(Error::Decoding { body, message }) => {
            assert_eq!(body, Bytes::from("<html>oops</html>"));
            assert!(message.contains("Failed to parse JSON"));
        }
        other => panic!("Expected Decoding error, got {other:?}"),
    }
}

#[test]
fn test_json_decoder_type_mismatch() {
    let decoder = JsonDecoder::<Todo>::new();
    let envelope = ResponseEnvelope::new(200, r#"{"id": "seven"}"#);
    assert!(matches!(
        decoder.decode(&envelope),
        Err(Error::Decoding { .. })
    ));
}

#[test]
fn test_json_decoder_with_path() {
    let decoder = JsonDecoder::<Vec<Todo>>::with_path("$.data.items");
    let envelope = ResponseEnvelope::new(
        200,
        r#"{"data": {"items": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]}}"#,
    );

    let todos = decoder.decode(&envelope).unwrap();
    assert_eq!(todos.len(), 2);
    assert_eq!(decoder.path(), Some("$.data.items"));
}

#[test]
fn test_json_decoder_missing_path() {
    let decoder = JsonDecoder::<Todo>::with_path("data.missing");
    let envelope = ResponseEnvelope::new(200, r#"{"data": {}}"#);

    match decoder.decode(&envelope) {
        Err(Error::Decoding { message, .. }) => assert!(message.contains("data.missing")),
        other => panic!("Expected Decoding error, got {other:?}"),
    }
}

#[test]
fn test_extract_path_indices() {
    let value = json!({
        "data": {"items": [{"id": 1}, {"id": 2}, {"id": 3}]}
    });

    assert_eq!(extract_path(&value, "data.items.0.id"), Some(&json!(1)));
    assert_eq!(extract_path(&value, "data.items[1].id"), Some(&json!(2)));
    assert_eq!(extract_path(&value, "$.data.items[-1].id"), Some(&json!(3)));
    assert_eq!(extract_path(&value, "data.items[9]"), None);
    assert_eq!(extract_path(&value, "data.nope"), None);
    assert_eq!(extract_path(&value, "$"), Some(&value));
}

#[test]
fn test_empty_decoder_ignores_body() {
    EmptyDecoder
        .decode(&ResponseEnvelope::new(204, ""))
        .unwrap();
    EmptyDecoder
        .decode(&ResponseEnvelope::new(200, "not json"))
        .unwrap();
}

#[test]
fn test_bytes_and_text_decoders() {
    let envelope = ResponseEnvelope::new(200, vec![0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(
        BytesDecoder.decode(&envelope).unwrap(),
        Bytes::from(vec![0xde, 0xad, 0xbe, 0xef])
    );
    assert!(matches!(
        TextDecoder.decode(&envelope),
        Err(Error::Decoding { .. })
    ));

    let envelope = ResponseEnvelope::new(200, "héllo");
    assert_eq!(TextDecoder.decode(&envelope).unwrap(), "héllo");
}

#[test]
fn test_fn_decoder_custom_date_format() {
    #[derive(Deserialize)]
    struct Raw {
        due: String,
    }

    let decoder = FnDecoder::new(|envelope: &ResponseEnvelope| {
        let raw: Raw = serde_json::from_slice(&envelope.body)
            .map_err(|e| Error::decoding(e.to_string(), envelope.body.clone()))?;
        NaiveDate::parse_from_str(&raw.due, "%d/%m/%Y")
            .map_err(|e| Error::decoding(e.to_string(), envelope.body.clone()))
    });

    let envelope = ResponseEnvelope::new(200, r#"{"due": "24/12/2025"}"#);
    let date: NaiveDate = decoder.decode(&envelope).unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2025, 12, 24).unwrap());

    let envelope = ResponseEnvelope::new(200, r#"{"due": "2025-12-24"}"#);
    let result: crate::Result<NaiveDate> = decoder.decode(&envelope);
    assert!(matches!(result, Err(Error::Decoding { .. })));
}
