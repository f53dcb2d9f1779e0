//! Line-delimited JSON framing spoken with the host process.
//!
//! Client -> host: `{"id":1,"cmd":"get_current_user_name","args":{}}`
//! Host -> client: `{"id":1,"result":"alice"}`, `{"id":1,"error":"..."}`
//! or a channel push `{"channel":3,"message":{"event":"progress","data":{..}}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    pub cmd: &'a str,
    pub args: Value,
}

/// Arguments of `set_current_user_name`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetUserNameArgs {
    pub user_name: String,
}

/// Arguments of `manually_check_update`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckUpdateArgs {
    pub manually: bool,
    pub on_event: String,
}

/// Anything the host writes on its stdout.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Inbound {
    Channel {
        channel: u32,
        message: Value,
    },
    Response {
        id: u64,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Serialize a request as a single newline-terminated line.
pub fn encode_request(id: u64, cmd: &str, args: Value) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(&Request { id, cmd, args })?;
    line.push('\n');
    Ok(line)
}

pub fn decode_inbound(line: &str) -> Result<Inbound, serde_json::Error> {
    serde_json::from_str(line.trim())
}

/// Request id of a line that did not decode as a known message, if it has one.
pub fn peek_id(line: &str) -> Option<u64> {
    let value: Value = serde_json::from_str(line.trim()).ok()?;
    value.get("id")?.as_u64()
}
