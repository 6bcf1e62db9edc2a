//! Introspection and debugging tools for tether frames.
//!
//! This crate provides utilities for inspecting captured frames:
//!
//! - Summarize frame structure and sizes without any registries
//! - Decode payload frames into structured JSON
//! - Collect and order frame captures from a directory
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to understand what went over the wire.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use codec::{
    decode_payload, AttributeSnapshot, Payload, PayloadRegistries, TrackedValue, Vec2,
};
use glob::Pattern;
use serde::Serialize;
use serde_json::{json, Value};
use wire::{Frame, Limits, Route};

/// Structure of one frame, read without payload registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub header: String,
    pub header_byte: u8,
    pub frame_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u8>,
    /// Bytes spent on the route target or exclusion list.
    pub route_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<u64>,
}

/// A decoded payload frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFrame {
    pub route: Value,
    pub session_id: u8,
    pub type_id: String,
    pub frame_bytes: usize,
    pub payload: Value,
}

/// A capture file found by [`collect_frame_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    pub path: PathBuf,
    pub size: u64,
}

pub fn inspect_frame(bytes: &[u8], limits: &Limits) -> Result<InspectReport> {
    let frame = wire::decode_frame(bytes, limits).context("decode frame")?;
    let header = frame.header();
    let mut report = InspectReport {
        header: format!("{header:?}").to_lowercase(),
        header_byte: header.as_byte(),
        frame_bytes: bytes.len(),
        session_id: None,
        route_bytes: 0,
        type_id: None,
        body_bytes: None,
        message: None,
        peer_id: None,
        fingerprint: None,
    };
    match frame {
        Frame::Control(control) => {
            report.session_id = Some(control.session_id);
            report.message = Some(control.message.to_string());
        }
        Frame::Hello(hello) => {
            report.peer_id = Some(hello.peer_id.to_string());
            report.fingerprint = Some(hello.fingerprint);
        }
        Frame::Payload(payload) => {
            report.session_id = Some(payload.session_id);
            report.route_bytes = payload.route.extra_len();
            report.type_id = Some(payload.type_id.to_owned());
            report.body_bytes = Some(payload.body.len());
        }
    }
    Ok(report)
}

/// Decodes a payload frame into JSON-ready form.
pub fn decode_frame_json(
    bytes: &[u8],
    registries: &PayloadRegistries,
    limits: &Limits,
) -> Result<DecodedFrame> {
    let frame = wire::decode_frame(bytes, limits).context("decode frame")?;
    let Frame::Payload(frame) = frame else {
        anyhow::bail!("{:?} frame carries no payload", frame.header());
    };
    let envelope = decode_payload(registries, &frame).context("decode payload")?;
    Ok(DecodedFrame {
        route: route_json(&envelope.origin.route),
        session_id: envelope.origin.session_id,
        type_id: frame.type_id.to_owned(),
        frame_bytes: bytes.len(),
        payload: payload_json(&envelope.payload),
    })
}

fn route_json(route: &Route) -> Value {
    match route {
        Route::Client => json!({ "kind": "client" }),
        Route::Broadcast => json!({ "kind": "broadcast" }),
        Route::Targeted(target) => json!({ "kind": "targeted", "target": target.to_string() }),
        Route::Exclude(ids) => json!({
            "kind": "exclude",
            "excluded": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }),
    }
}

fn vec2_json(value: Vec2) -> Value {
    json!([value.x, value.y])
}

fn tracked_value_json(value: &TrackedValue) -> Value {
    match value {
        TrackedValue::Bool(v) => json!({ "bool": v }),
        TrackedValue::Byte(v) => json!({ "byte": v }),
        TrackedValue::Int(v) => json!({ "int": v }),
        TrackedValue::VarInt(v) => json!({ "varint": v }),
        TrackedValue::Float(v) => json!({ "float": v }),
        TrackedValue::Text(v) => json!({ "text": v }),
        TrackedValue::Id(v) => json!({ "id": v.to_string() }),
    }
}

fn attribute_json(snapshot: &AttributeSnapshot) -> Value {
    let modifiers: Vec<Value> = snapshot
        .modifiers
        .iter()
        .map(|modifier| {
            json!({
                "id": modifier.id.to_string(),
                "amount": modifier.amount,
                "operation": format!("{:?}", modifier.operation),
            })
        })
        .collect();
    json!({
        "attribute": snapshot.attribute.to_string(),
        "base": snapshot.base,
        "value": snapshot.value(),
        "modifiers": modifiers,
    })
}

/// Renders a payload as JSON, tagged with its kind path.
#[must_use]
pub fn payload_json(payload: &Payload) -> Value {
    let kind = payload.kind().path();
    let body = match payload {
        Payload::EntitySpawn(spawn) => json!({
            "id": spawn.id.to_string(),
            "entity_kind": spawn.kind.to_string(),
            "position": vec2_json(spawn.position),
            "yaw": spawn.yaw,
            "velocity": vec2_json(spawn.velocity),
        }),
        Payload::EntityRemove(remove) => json!({
            "ids": remove.ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }),
        Payload::EntityPosition(position) => json!({
            "id": position.id.to_string(),
            "position": vec2_json(position.position),
            "yaw": position.yaw,
        }),
        Payload::EntityMove(delta) => json!({
            "id": delta.id.to_string(),
            "dx": delta.dx,
            "dy": delta.dy,
        }),
        Payload::EntityRotate(rotate) => json!({
            "id": rotate.id.to_string(),
            "yaw": rotate.yaw,
        }),
        Payload::EntityMoveRotate(delta) => json!({
            "id": delta.id.to_string(),
            "dx": delta.dx,
            "dy": delta.dy,
            "yaw": delta.yaw,
        }),
        Payload::EntityVelocity(velocity) => json!({
            "id": velocity.id.to_string(),
            "velocity": vec2_json(velocity.velocity),
        }),
        Payload::TrackedData(update) => json!({
            "id": update.id.to_string(),
            "entries": update
                .entries
                .iter()
                .map(|entry| json!({ "key": entry.key, "value": tracked_value_json(&entry.value) }))
                .collect::<Vec<_>>(),
        }),
        Payload::Attributes(update) => json!({
            "id": update.id.to_string(),
            "attributes": update.attributes.iter().map(attribute_json).collect::<Vec<_>>(),
        }),
        Payload::PlayerInput(input) => json!({
            "position": vec2_json(input.position),
            "yaw": input.yaw,
        }),
        Payload::KeepAlive(keep_alive) => json!({ "nonce": keep_alive.nonce }),
        Payload::Batch(batch) => json!({
            "items": batch.items.iter().map(payload_json).collect::<Vec<_>>(),
        }),
    };
    json!({ "kind": kind, "body": body })
}

/// Human-readable rendering of a decoded frame.
#[must_use]
pub fn format_decode_pretty(frame: &DecodedFrame) -> String {
    let mut out = String::new();
    let route = frame.route["kind"].as_str().unwrap_or("?");
    let _ = writeln!(
        out,
        "{} via {route} (session {}, {} bytes)",
        frame.type_id, frame.session_id, frame.frame_bytes
    );
    write_value(&mut out, &frame.payload["body"], 1);
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(fields) => {
            for (name, field) in fields {
                let nested = field.is_object()
                    || field
                        .as_array()
                        .is_some_and(|items| items.iter().any(Value::is_object));
                if nested {
                    let _ = writeln!(out, "{indent}{name}:");
                    write_value(out, field, depth + 1);
                } else {
                    let _ = writeln!(out, "{indent}{name}: {field}");
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let _ = writeln!(out, "{indent}[{index}]");
                write_value(out, item, depth + 1);
            }
        }
        other => {
            let _ = writeln!(out, "{indent}{other}");
        }
    }
}

/// Lists regular files in `dir`, keeping those whose path or file name
/// matches `glob` when one is given.
pub fn collect_frame_entries(dir: &Path, glob: Option<&str>) -> Result<Vec<FrameEntry>> {
    let pattern = glob
        .map(|value| Pattern::new(value).context("invalid glob pattern"))
        .transpose()?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        let size = entry.metadata()?.len();
        entries.push(FrameEntry { path, size });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Largest first, ties broken by path.
pub fn sort_by_size(entries: &mut [FrameEntry]) {
    entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
}
