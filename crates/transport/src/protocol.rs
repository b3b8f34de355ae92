//! Protocol module - JSON message types for the game server link
//!
//! Inbound frames are discriminated by `type`, outbound frames by `action`.
//! Every frame is a single JSON object in one WebSocket text message.
//!
//! | Dir | `type` / `action` | Maps to |
//! |-----|-------------------|---------|
//! | in  | `status` | [`ServerEvent::Status`] |
//! | in  | `mining_tick` | [`ServerEvent::ActivityTick`] |
//! | in  | `ore_mined` | [`ServerEvent::ResourceCollected`] |
//! | in  | `level_up` | [`ServerEvent::LevelUp`] |
//! | in  | `mining_started` | [`ServerEvent::ActivityStarted`] |
//! | in  | `mining_stopped` | [`ServerEvent::ActivityStopped`] |
//! | in  | `error` | [`ServerEvent::Error`] |
//! | out | `start_mining` | [`Command::StartActivity`] |
//! | out | `stop_mining` | [`Command::StopActivity`] |

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Command, ResourceCollected, ServerEvent};
use crate::types::{GameState, ResourceDescriptor, ResourceId, UnlockSource, DEFAULT_SKILL};

// ============== Server -> Client Messages ==============

/// Every inbound message kind this client understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Status { data: StatusPayload },
    MiningTick(MiningTick),
    OreMined(OreMined),
    LevelUp(LevelUp),
    MiningStarted(MiningStarted),
    MiningStopped(MiningStopped),
    Error(ErrorMessage),
}

impl ServerMessage {
    pub const KINDS: [&'static str; 7] = [
        "status",
        "mining_tick",
        "ore_mined",
        "level_up",
        "mining_started",
        "mining_stopped",
        "error",
    ];
}

/// Full snapshot carried by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    #[serde(default = "default_skill")]
    pub skill_type: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub xp_in_level: u64,
    #[serde(default)]
    pub xp_needed: u64,
    #[serde(default)]
    pub current_action: Option<String>,
    /// ISO-8601, with or without offset.
    #[serde(default)]
    pub action_started: Option<String>,
    #[serde(default)]
    pub available_ores: Vec<OreEntry>,
    #[serde(default)]
    pub inventory: BTreeMap<String, u64>,
}

fn default_skill() -> String {
    DEFAULT_SKILL.to_string()
}

fn default_level() -> u32 {
    1
}

/// One entry of `available_ores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OreEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_level")]
    pub level_required: u32,
    #[serde(default)]
    pub xp: u64,
    /// Seconds per unit.
    #[serde(default)]
    pub mining_time: f64,
    #[serde(default)]
    pub ascii: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: u64,
    /// Absent means the client derives it from the level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningTick {
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ore_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ore_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OreMined {
    pub ore_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ore_name: Option<String>,
    pub xp_gained: u64,
    pub total_xp: u64,
    pub level: u32,
    pub xp_in_level: u64,
    pub xp_needed: u64,
    /// Absolute count held after the award.
    pub ore_quantity: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUp {
    pub new_level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningStarted {
    pub ore_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ore_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The extra fields are informational; the next `status` carries the truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningStopped {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    StartMining { ore: String },
    StopMining,
}

impl From<&Command> for ClientMessage {
    fn from(command: &Command) -> Self {
        match command {
            Command::StartActivity(id) => create_start_mining(id.as_str()),
            Command::StopActivity => create_stop_mining(),
        }
    }
}

/// Create a start request for `ore`
pub fn create_start_mining(ore: &str) -> ClientMessage {
    ClientMessage::StartMining {
        ore: ore.to_string(),
    }
}

/// Create a stop request
pub fn create_stop_mining() -> ClientMessage {
    ClientMessage::StopMining
}

// ============== Message Parsing ==============

/// Parsed incoming message
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    Known(ServerMessage),
    /// Well-formed object whose `type` this client does not recognize.
    Unknown { kind: String },
}

/// Parse a JSON frame from a string
///
/// An unrecognized `type` is not an error. Anything else that does not decode
/// (not JSON, not an object, no string `type`, or a known kind with bad
/// fields) is.
///
/// # Examples
///
/// ```
/// use idle_miner_transport::protocol::{parse_message, ParsedMessage, ServerMessage};
///
/// let parsed = parse_message(r#"{"type":"level_up","new_level":2}"#).unwrap();
/// assert!(matches!(parsed, ParsedMessage::Known(ServerMessage::LevelUp(_))));
///
/// let parsed = parse_message(r#"{"type":"season_event"}"#).unwrap();
/// assert_eq!(parsed, ParsedMessage::Unknown { kind: "season_event".into() });
///
/// assert!(parse_message("not json").is_err());
/// assert!(parse_message(r#"{"new_level":2}"#).is_err());
/// ```
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    match serde_json::from_str::<ServerMessage>(json) {
        Ok(message) => Ok(ParsedMessage::Known(message)),
        Err(e) => {
            let object = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(json)?;
            match object.get("type").and_then(serde_json::Value::as_str) {
                Some(kind) if !ServerMessage::KINDS.iter().any(|known| *known == kind) => {
                    Ok(ParsedMessage::Unknown {
                        kind: kind.to_string(),
                    })
                }
                _ => Err(e),
            }
        }
    }
}

// ============== Conversions ==============

impl From<StatusPayload> for GameState {
    fn from(status: StatusPayload) -> Self {
        let level = status.level.max(1);
        let catalog = status
            .available_ores
            .into_iter()
            .map(|ore| ore.into_descriptor(level))
            .collect();

        GameState {
            skill_type: status.skill_type,
            level,
            total_xp: status.xp,
            xp_in_level: status.xp_in_level,
            xp_needed: status.xp_needed,
            current_activity: status.current_action.map(ResourceId::from),
            activity_started_at: status.action_started.as_deref().and_then(parse_timestamp),
            catalog,
            inventory: status
                .inventory
                .into_iter()
                .map(|(id, qty)| (ResourceId::from(id), qty))
                .collect(),
        }
    }
}

impl OreEntry {
    fn into_descriptor(self, level: u32) -> ResourceDescriptor {
        let (unlocked, unlock_source) = match self.unlocked {
            Some(flag) => (flag, UnlockSource::Server),
            None => (level >= self.level_required, UnlockSource::Derived),
        };

        ResourceDescriptor {
            id: ResourceId::from(self.id),
            name: self.name,
            level_required: self.level_required,
            xp_per_unit: self.xp,
            duration_secs: self.mining_time,
            glyph: self.ascii,
            color: self.color,
            description: self.description,
            quantity: self.quantity,
            unlocked,
            unlock_source,
        }
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl From<ServerMessage> for ServerEvent {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::Status { data } => ServerEvent::Status(data.into()),
            ServerMessage::MiningTick(tick) => ServerEvent::ActivityTick {
                progress: tick.progress,
            },
            ServerMessage::OreMined(m) => ServerEvent::ResourceCollected(ResourceCollected {
                resource: ResourceId::from(m.ore_id),
                resource_name: m.ore_name,
                xp_gained: m.xp_gained,
                total_xp: m.total_xp,
                level: m.level,
                xp_in_level: m.xp_in_level,
                xp_needed: m.xp_needed,
                quantity: m.ore_quantity,
            }),
            ServerMessage::LevelUp(m) => ServerEvent::LevelUp {
                new_level: m.new_level,
                skill: m.skill,
            },
            ServerMessage::MiningStarted(m) => ServerEvent::ActivityStarted {
                resource: ResourceId::from(m.ore_id),
            },
            ServerMessage::MiningStopped(_) => ServerEvent::ActivityStopped,
            ServerMessage::Error(m) => ServerEvent::Error { message: m.message },
        }
    }
}

impl From<ParsedMessage> for ServerEvent {
    fn from(parsed: ParsedMessage) -> Self {
        match parsed {
            ParsedMessage::Known(message) => message.into(),
            ParsedMessage::Unknown { kind } => ServerEvent::Unknown { kind },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;

    const STATUS: &str = r##"{
        "type": "status",
        "data": {
            "skill_type": "mining",
            "level": 16,
            "xp": 2500,
            "xp_in_level": 100,
            "xp_needed": 400,
            "current_action": "iron",
            "action_started": "2024-05-01T12:30:15.250000",
            "available_ores": [
                {"id": "copper", "name": "Copper Ore", "level_required": 1, "xp": 10,
                 "mining_time": 2.0, "ascii": "[Cu]", "color": "#B87333",
                 "description": "A common ore.", "quantity": 12, "unlocked": true},
                {"id": "iron", "name": "Iron Ore", "level_required": 15, "xp": 35,
                 "mining_time": 4.0, "ascii": "[Fe]", "color": "#A19D94",
                 "description": "Sturdy.", "quantity": 3},
                {"id": "mithril", "name": "Mithril Ore", "level_required": 55, "xp": 80,
                 "mining_time": 8.0, "ascii": "[Mi]", "color": "#5D7FA3",
                 "description": "Rare.", "unlocked": false}
            ],
            "inventory": {"copper": 12, "iron": 3}
        }
    }"##;

    #[test]
    fn status_converts_to_game_state() {
        let parsed = parse_message(STATUS).unwrap();
        let ParsedMessage::Known(message) = parsed else {
            panic!("expected known message");
        };
        let ServerEvent::Status(game) = ServerEvent::from(message) else {
            panic!("expected status event");
        };

        assert_eq!(game.level, 16);
        assert_eq!(game.total_xp, 2500);
        assert_eq!(game.current_activity, Some(ResourceId::from("iron")));
        assert_eq!(game.quantity("copper"), 12);
        assert_eq!(game.quantity("iron"), 3);

        let started = game.activity_started_at.unwrap();
        assert_eq!((started.year(), started.hour(), started.second()), (2024, 12, 15));

        let iron = game.resource("iron").unwrap();
        assert_eq!(iron.unlock_source, UnlockSource::Derived);
        assert!(iron.unlocked);
        assert_eq!(iron.duration_secs, 4.0);
        assert_eq!(iron.glyph, "[Fe]");

        let mithril = game.resource("mithril").unwrap();
        assert_eq!(mithril.unlock_source, UnlockSource::Server);
        assert!(!mithril.unlocked);
    }

    #[test]
    fn status_level_is_at_least_one() {
        let parsed = parse_message(r#"{"type":"status","data":{"level":0}}"#).unwrap();
        let ParsedMessage::Known(ServerMessage::Status { data }) = parsed else {
            panic!("expected status");
        };
        let game = GameState::from(data);
        assert_eq!(game.level, 1);
        assert_eq!(game.skill_type, "mining");
        assert!(game.catalog.is_empty());
    }

    #[test]
    fn status_without_data_wrapper_is_malformed() {
        assert!(parse_message(r#"{"type":"status","level":3}"#).is_err());
    }

    #[test]
    fn timestamp_accepts_offset_and_naive_forms() {
        let with_offset = parse_timestamp("2024-05-01T12:30:15+02:00").unwrap();
        assert_eq!(with_offset.hour(), 10);
        let naive = parse_timestamp("2024-05-01T12:30:15").unwrap();
        assert_eq!(naive.hour(), 12);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn ore_mined_maps_absolute_quantity() {
        let json = r#"{"type":"ore_mined","ore_id":"copper","ore_name":"Copper Ore",
            "xp_gained":10,"total_xp":60,"level":1,"ore_quantity":6,
            "xp_in_level":60,"xp_needed":83,"message":"You mined Copper Ore!"}"#;
        let event = ServerEvent::from(parse_message(json).unwrap());
        assert_eq!(
            event,
            ServerEvent::ResourceCollected(ResourceCollected {
                resource: ResourceId::from("copper"),
                resource_name: Some("Copper Ore".into()),
                xp_gained: 10,
                total_xp: 60,
                level: 1,
                xp_in_level: 60,
                xp_needed: 83,
                quantity: 6,
            })
        );
    }

    #[test]
    fn mining_stopped_extras_are_optional() {
        let bare = parse_message(r#"{"type":"mining_stopped"}"#).unwrap();
        let full = parse_message(
            r#"{"type":"mining_stopped","message":"Stopped mining.","level":3,"xp":120}"#,
        )
        .unwrap();
        assert_eq!(ServerEvent::from(bare), ServerEvent::ActivityStopped);
        assert_eq!(ServerEvent::from(full), ServerEvent::ActivityStopped);
    }

    #[test]
    fn malformed_frames_are_errors() {
        for frame in [
            "",
            "{",
            "[1,2,3]",
            "42",
            r#"{"type":7}"#,
            r#"{"progress":0.5}"#,
            r#"{"type":"mining_tick"}"#,
            r#"{"type":"mining_tick","progress":"half"}"#,
            r#"{"type":"error"}"#,
        ] {
            assert!(parse_message(frame).is_err(), "accepted {frame:?}");
        }
    }

    #[test]
    fn unknown_kind_is_forwarded() {
        let parsed = parse_message(r#"{"type":"daily_bonus","amount":5}"#).unwrap();
        assert_eq!(
            ServerEvent::from(parsed),
            ServerEvent::Unknown {
                kind: "daily_bonus".into()
            }
        );
    }

    #[test]
    fn commands_serialize_with_action_tag() {
        let start = ClientMessage::from(&Command::StartActivity(ResourceId::from("copper")));
        assert_eq!(
            serde_json::to_string(&start).unwrap(),
            r#"{"action":"start_mining","ore":"copper"}"#
        );
        let stop = ClientMessage::from(&Command::StopActivity);
        assert_eq!(
            serde_json::to_string(&stop).unwrap(),
            r#"{"action":"stop_mining"}"#
        );
    }
}
