// SPDX-License-Identifier: MIT

//! Wire format tests: length-prefix framing and JSON encoding.

use super::*;

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = Response::Ok;
    let encoded = encode(&response).expect("encode failed");

    // encode() returns raw JSON, no length prefix
    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be JSON object: {}", json_str);
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.expect("write failed");

    // write_message adds 4-byte length prefix
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    // First 4 bytes are the length prefix
    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;

    // Length should match the data size
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn request_response_roundtrip() {
    let request = Request::AddBaseHubFile { path: "assets/root.hub".to_string() };
    let mut buffer = Vec::new();
    write_message(&mut buffer, &encode(&request).unwrap()).await.unwrap();

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_request(&mut cursor).await.unwrap();
    assert_eq!(read_back, request);

    let response = Response::Error { message: "nope".to_string() };
    let mut buffer = Vec::new();
    write_response(&mut buffer, &response).await.unwrap();
    let mut cursor = std::io::Cursor::new(buffer);
    let payload = read_message(&mut cursor).await.unwrap();
    let read_back: Response = decode(&payload).unwrap();
    assert_eq!(read_back, response);
}

#[tokio::test]
async fn oversized_prefix_is_rejected() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&u32::MAX.to_be_bytes());
    buffer.extend_from_slice(b"junk");

    let mut cursor = std::io::Cursor::new(buffer);
    assert!(matches!(
        read_message(&mut cursor).await,
        Err(ProtocolError::TooLarge(_))
    ));
}

#[test]
fn requests_tag_by_type() {
    let json = serde_json::to_value(Request::StartProcessing).unwrap();
    assert_eq!(json["type"], "StartProcessing");

    let json = serde_json::to_value(Request::SetReferenceDirectory { path: "/x".into() }).unwrap();
    assert_eq!(json["type"], "SetReferenceDirectory");
    assert_eq!(json["path"], "/x");
}
