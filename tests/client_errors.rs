//! How a stub surfaces what comes back over the wire

mod common;

use common::{Calculator, ScriptedTransport, scripted_calculator};
use serde_json::json;
use tether_rpc::{RemoteError, RpcError};

#[test]
fn test_request_shape() {
    let transport = ScriptedTransport::replying(&[r#"{"jsonrpc":"2.0","id":7,"result":5}"#]);
    let math = scripted_calculator(transport.clone());

    assert_eq!(math.add(2, 3).unwrap(), 5);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let request = requests[0].as_object().unwrap();
    assert_eq!(request.len(), 3);
    assert_eq!(request["method"], json!("math.add"));
    assert_eq!(request["params"], json!([2, 3]));
    assert!(request["id"].as_i64().is_some_and(|id| id >= 0));
}

#[test]
fn test_bare_string_error() {
    let math = scripted_calculator(ScriptedTransport::replying(&[r#"{"error":"boom"}"#]));

    let error = math.add(1, 1).unwrap_err();
    assert_eq!(error.as_remote(), Some(&RemoteError::message_only("boom")));
    let remote = error.as_remote().unwrap();
    assert_eq!(remote.code, None);
    assert_eq!(remote.data, None);
}

#[test]
fn test_structured_error_round_trips() {
    let math = scripted_calculator(ScriptedTransport::replying(&[
        r#"{"error":{"code":-32002,"message":"x","data":{"reason":"quota","left":[0]}}}"#,
    ]));

    let error = math.add(1, 1).unwrap_err();
    let remote = error.as_remote().unwrap();
    assert_eq!(remote.code, Some(-32002));
    assert_eq!(remote.message.as_deref(), Some("x"));

    let data: serde_json::Value = serde_json::from_str(remote.data.as_deref().unwrap()).unwrap();
    assert_eq!(data, json!({"reason": "quota", "left": [0]}));
}

#[test]
fn test_scalar_error_data_keeps_its_text() {
    let math = scripted_calculator(ScriptedTransport::replying(&[
        r#"{"error":{"code":-32000,"message":"failed","data":"trace line"}}"#,
        r#"{"error":{"message":"failed","data":17}}"#,
    ]));

    let first = math.add(1, 1).unwrap_err();
    assert_eq!(first.as_remote().unwrap().data.as_deref(), Some("trace line"));

    let second = math.add(1, 1).unwrap_err();
    let remote = second.as_remote().unwrap();
    assert_eq!(remote.code, None);
    assert_eq!(remote.data.as_deref(), Some("17"));
}

#[test]
fn test_null_error_means_success() {
    let math = scripted_calculator(ScriptedTransport::replying(&[
        r#"{"id":1,"error":null,"result":4}"#,
    ]));
    assert_eq!(math.add(2, 2).unwrap(), 4);
}

#[test]
fn test_void_never_decodes_the_result() {
    let math = scripted_calculator(ScriptedTransport::replying(&[
        r#"{"jsonrpc":"2.0","id":1}"#,
        r#"{"jsonrpc":"2.0","id":1,"result":null}"#,
        r#"{"jsonrpc":"2.0","id":1,"result":[1,2,3]}"#,
    ]));

    for _ in 0..3 {
        math.reset().unwrap();
    }
}

#[test]
fn test_missing_result_is_a_decode_error_for_values() {
    let math = scripted_calculator(ScriptedTransport::replying(&[r#"{"id":1}"#]));

    let error = math.add(1, 2).unwrap_err();
    assert!(matches!(error, RpcError::Decode { .. }));
    assert!(!error.is_remote());
}

#[test]
fn test_malformed_response_is_a_decode_error() {
    let math = scripted_calculator(ScriptedTransport::replying(&["<html>", "[1,2]"]));

    assert!(matches!(math.add(1, 2), Err(RpcError::Decode { .. })));
    assert!(matches!(math.add(1, 2), Err(RpcError::Decode { .. })));
}

#[test]
fn test_transport_failure_is_not_a_remote_error() {
    let math = scripted_calculator(ScriptedTransport::failing("connection reset"));

    let error = math.add(1, 2).unwrap_err();
    assert!(error.is_transport());
    assert!(error.as_remote().is_none());
    assert!(error.to_string().contains("connection reset"));

    // Nothing queued any more: the transport reports itself closed
    assert!(math.add(1, 2).unwrap_err().is_transport());
}
