use chatdesk::infrastructure::streaming::{SseDecoder, UiMessageChunk};

#[test]
fn given_complete_events_when_pushing_then_returns_each_payload() {
    let mut decoder = SseDecoder::new();

    let payloads = decoder.push(b"data: first\n\ndata: second\n\n");

    assert_eq!(payloads, vec!["first", "second"]);
}

#[test]
fn given_line_split_across_chunks_when_pushing_then_payload_waits_for_newline() {
    let mut decoder = SseDecoder::new();

    assert!(decoder.push(b"data: {\"a\":").is_empty());
    assert_eq!(decoder.push(b"1}\n\n"), vec!["{\"a\":1}"]);
}

#[test]
fn given_multibyte_character_split_across_chunks_when_pushing_then_decoded_intact() {
    let mut decoder = SseDecoder::new();
    let line = "data: café\n".as_bytes();
    let split = line.len() - 2;

    assert!(decoder.push(&line[..split]).is_empty());
    assert_eq!(decoder.push(&line[split..]), vec!["café"]);
}

#[test]
fn given_crlf_comments_and_fields_when_pushing_then_only_data_is_returned() {
    let mut decoder = SseDecoder::new();

    let payloads = decoder.push(b": keep-alive\r\nevent: message\r\ndata:tight\r\n\r\n");

    assert_eq!(payloads, vec!["tight"]);
}

#[test]
fn given_unterminated_last_line_when_finishing_then_returns_it() {
    let mut decoder = SseDecoder::new();
    decoder.push(b"data: [DONE]");

    assert_eq!(decoder.finish(), Some("[DONE]".to_string()));
    assert_eq!(decoder.finish(), None);
}

#[test]
fn given_ui_chunks_when_serializing_then_use_protocol_type_names() {
    let delta = UiMessageChunk::TextDelta {
        id: "t1".to_string(),
        delta: "Hi".to_string(),
    };
    let error = UiMessageChunk::Error {
        error_text: "boom".to_string(),
    };

    assert_eq!(
        delta.to_json(),
        r#"{"type":"text-delta","id":"t1","delta":"Hi"}"#
    );
    assert_eq!(error.to_json(), r#"{"type":"error","errorText":"boom"}"#);
    assert_eq!(UiMessageChunk::FinishStep.to_json(), r#"{"type":"finish-step"}"#);
}

#[test]
fn given_unknown_chunk_type_when_deserializing_then_maps_to_unknown() {
    let chunk: UiMessageChunk =
        serde_json::from_str(r#"{"type":"reasoning-delta","id":"r","delta":"..."}"#).unwrap();

    assert_eq!(chunk, UiMessageChunk::Unknown);
}
