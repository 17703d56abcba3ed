// =============================================================================
// PNODE RADAR — network.rs
// Wire types of the seed pRPC protocol
//
//   request:  {"jsonrpc":"2.0","method":"get-pods-with-stats","id":1}
//   response: {"jsonrpc":"2.0","id":1,"result":[...pods]}
//         or  {"jsonrpc":"2.0","id":1,"result":{"pods":[...], "total_count":N}}
//
// Seeds are third-party daemons of varying versions, so pod fields decode
// leniently: ints, floats, numeric strings and null are all accepted.
// =============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::constants::{GET_PODS_TIMEOUT_MS, GET_PODS_WITH_STATS_TIMEOUT_MS};

// -----------------------------------------------------------------------------
// RpcMethod
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    GetPods,
    GetPodsWithStats,
}

impl RpcMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::GetPods => "get-pods",
            RpcMethod::GetPodsWithStats => "get-pods-with-stats",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "get-pods" => Some(RpcMethod::GetPods),
            "get-pods-with-stats" => Some(RpcMethod::GetPodsWithStats),
            _ => None,
        }
    }

    pub fn default_timeout_ms(&self) -> u64 {
        match self {
            RpcMethod::GetPods => GET_PODS_TIMEOUT_MS,
            RpcMethod::GetPodsWithStats => GET_PODS_WITH_STATS_TIMEOUT_MS,
        }
    }
}

impl Default for RpcMethod {
    fn default() -> Self {
        RpcMethod::GetPodsWithStats
    }
}

// -----------------------------------------------------------------------------
// Envelope
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: RpcMethod) -> Self {
        RpcRequest { jsonrpc: "2.0", method: method.as_str(), id: 1 }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<PodsResult>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PodsResult {
    List(Vec<RawNodeObservation>),
    Wrapped { pods: Vec<RawNodeObservation> },
}

impl RpcResponse {
    /// Observations carried by the response, or why there are none.
    pub fn into_observations(self) -> Result<Vec<RawNodeObservation>, String> {
        if let Some(err) = self.error {
            return Err(format!("rpc error: {}", err));
        }
        match self.result {
            Some(PodsResult::List(pods)) => Ok(pods),
            Some(PodsResult::Wrapped { pods }) => Ok(pods),
            None => Err("response has no result".to_string()),
        }
    }
}

pub fn decode_response(body: &[u8]) -> Result<Vec<RawNodeObservation>, String> {
    let envelope: RpcResponse = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    envelope.into_observations()
}

// -----------------------------------------------------------------------------
// RawNodeObservation — one pod as reported by one seed
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNodeObservation {
    #[serde(rename = "pubkey", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(rename = "address", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub network_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub last_seen_timestamp: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub storage_committed: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub storage_used: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub credits: f64,
    #[serde(rename = "uptime", default, deserialize_with = "lenient_u64")]
    pub uptime_secs: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub packets_received: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub packets_sent: u64,
    #[serde(rename = "version", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, deserialize_with = "lenient_port", skip_serializing_if = "Option::is_none")]
    pub rpc_port: Option<u16>,
}

impl RawNodeObservation {
    /// The merge key, if the pod carries a usable one. Compared as-is, never trimmed.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref().filter(|s| !s.trim().is_empty())
    }
}

// -----------------------------------------------------------------------------
// Lenient decoders
// -----------------------------------------------------------------------------

fn value_as_f64(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn value_as_u64(v: &Value) -> u64 {
    if let Value::Number(n) = v {
        if let Some(u) = n.as_u64() {
            return u;
        }
    }
    if let Value::String(s) = v {
        if let Ok(u) = s.trim().parse::<u64>() {
            return u;
        }
    }
    let f = value_as_f64(v);
    // `as` saturates for out-of-range floats
    if f.is_finite() && f > 0.0 { f as u64 } else { 0 }
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().map(value_as_u64).unwrap_or(0))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    let f = v.as_ref().map(value_as_f64).unwrap_or(0.0);
    Ok(if f.is_finite() && f > 0.0 { f } else { 0.0 })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Some(Value::Number(n)) => match n.as_u64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_port<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().map(value_as_u64).and_then(|p| u16::try_from(p).ok()).filter(|p| *p != 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(RpcRequest::new(RpcMethod::GetPodsWithStats)).unwrap();
        assert_eq!(body, serde_json::json!({"jsonrpc":"2.0","method":"get-pods-with-stats","id":1}));
    }

    #[test]
    fn test_method_parse_and_timeouts() {
        assert_eq!(RpcMethod::parse("get-pods"), Some(RpcMethod::GetPods));
        assert_eq!(RpcMethod::parse(" get-pods-with-stats "), Some(RpcMethod::GetPodsWithStats));
        assert_eq!(RpcMethod::parse("get-version"), None);
        assert_eq!(RpcMethod::GetPods.default_timeout_ms(), 5_000);
        assert_eq!(RpcMethod::GetPodsWithStats.default_timeout_ms(), 8_000);
    }

    #[test]
    fn test_decode_array_result() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":[
            {"pubkey":"A","address":"1.2.3.4:9001","last_seen_timestamp":1700000000}
        ]}"#;
        let pods = decode_response(body).unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].identity(), Some("A"));
        assert_eq!(pods[0].network_address.as_deref(), Some("1.2.3.4:9001"));
        assert_eq!(pods[0].last_seen_timestamp, 1_700_000_000);
    }

    #[test]
    fn test_decode_wrapped_result() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":{"pods":[
            {"pubkey":"A","last_seen_timestamp":1},{"pubkey":"B","last_seen_timestamp":2}
        ],"total_count":2}}"#;
        let pods = decode_response(body).unwrap();
        assert_eq!(pods.len(), 2);
        assert_eq!(pods[1].identity(), Some("B"));
    }

    #[test]
    fn test_lenient_numbers() {
        let body = br#"{"result":[{
            "pubkey":"A",
            "last_seen_timestamp":1700000000.0,
            "storage_committed":"1000",
            "storage_used":null,
            "credits":"42.5",
            "uptime":-5,
            "packets_received":12.9,
            "rpc_port":6000
        }]}"#;
        let pods = decode_response(body).unwrap();
        let p = &pods[0];
        assert_eq!(p.last_seen_timestamp, 1_700_000_000);
        assert_eq!(p.storage_committed, 1000);
        assert_eq!(p.storage_used, 0);
        assert_eq!(p.credits, 42.5);
        assert_eq!(p.uptime_secs, 0);
        assert_eq!(p.packets_received, 12);
        assert_eq!(p.packets_sent, 0);
        assert_eq!(p.version_label, None);
        assert_eq!(p.rpc_port, Some(6000));
    }

    #[test]
    fn test_lenient_is_public() {
        let body = br#"{"result":{"pods":[
            {"pubkey":"A","is_public":true},
            {"pubkey":"B","is_public":"true"},
            {"pubkey":"C","is_public":0},
            {"pubkey":"D","is_public":null},
            {"pubkey":"E","is_public":"maybe"},
            {"pubkey":"F","is_public":{"x":1}}
        ]}}"#;
        let pods = decode_response(body).unwrap();
        let flags: Vec<Option<bool>> = pods.iter().map(|p| p.is_public).collect();
        assert_eq!(flags, vec![Some(true), Some(true), Some(false), None, None, None]);
    }

    #[test]
    fn test_identity_is_not_trimmed() {
        let pods = decode_response(br#"{"result":[{"pubkey":"A"},{"pubkey":" A"}]}"#).unwrap();
        assert_eq!(pods[0].identity(), Some("A"));
        assert_eq!(pods[1].identity(), Some(" A"));
    }

    #[test]
    fn test_missing_identity_decodes() {
        let pods = decode_response(br#"{"result":[{"address":"1.1.1.1:1"},{"pubkey":"  "}]}"#).unwrap();
        assert_eq!(pods.len(), 2);
        assert!(pods.iter().all(|p| p.identity().is_none()));
    }

    #[test]
    fn test_rpc_error_and_missing_result() {
        assert!(decode_response(br#"{"error":{"code":-32601,"message":"no such method"}}"#).is_err());
        assert!(decode_response(br#"{"jsonrpc":"2.0","id":1}"#).is_err());
        assert!(decode_response(br#"{"result":null}"#).is_err());
        assert!(decode_response(br#"{"result":"nope"}"#).is_err());
        assert!(decode_response(b"<html>502</html>").is_err());
    }
}
