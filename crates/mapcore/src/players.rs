use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::{bool_field, f64_field, i64_field, owned_str, str_field};

pub const MERGE_CHUNK_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLocation {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub account: String,
    pub name: String,
    pub health: f64,
    pub armor: f64,
    pub sort: i32,
    pub hidden: bool,
    pub location: PlayerLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub account: String,
    pub name: String,
    pub health: f64,
    pub armor: f64,
    pub sort: i32,
    pub hidden: bool,
    pub location: PlayerLocation,
}

pub fn snapshot_from_value(value: &Value) -> Option<PlayerSnapshot> {
    let account = match str_field(value, "account") {
        Some(account) if !account.is_empty() => account.to_string(),
        _ => return None,
    };
    Some(PlayerSnapshot {
        name: owned_str(value, "name").unwrap_or_else(|| account.clone()),
        health: f64_field(value, "health").unwrap_or(0.0),
        armor: f64_field(value, "armor").unwrap_or(0.0),
        sort: i64_field(value, "sort").unwrap_or(0) as i32,
        hidden: bool_field(value, "hidden").unwrap_or(false),
        location: PlayerLocation {
            world: owned_str(value, "world").unwrap_or_default(),
            x: f64_field(value, "x").unwrap_or(0.0),
            y: f64_field(value, "y").unwrap_or(0.0),
            z: f64_field(value, "z").unwrap_or(0.0),
        },
        account,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRegistry {
    players: BTreeMap<String, Player>,
}

impl PlayerRegistry {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player(&self, account: &str) -> Option<&Player> {
        self.players.get(account)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.players.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn merge_chunk(&mut self, mut pending: Vec<PlayerSnapshot>) -> Vec<PlayerSnapshot> {
        let take = pending.len().min(MERGE_CHUNK_SIZE);
        for snapshot in pending.drain(..take) {
            match self.players.get_mut(&snapshot.account) {
                Some(player) => {
                    player.name = snapshot.name;
                    player.health = snapshot.health;
                    player.armor = snapshot.armor;
                    player.sort = snapshot.sort;
                    player.hidden = snapshot.hidden;
                    player.location = snapshot.location;
                }
                None => {
                    self.players.insert(
                        snapshot.account.clone(),
                        Player {
                            account: snapshot.account,
                            name: snapshot.name,
                            health: snapshot.health,
                            armor: snapshot.armor,
                            sort: snapshot.sort,
                            hidden: snapshot.hidden,
                            location: snapshot.location,
                        },
                    );
                }
            }
        }
        pending
    }

    pub fn prune(&mut self, keep: &HashSet<String>) -> usize {
        let before = self.players.len();
        self.players.retain(|account, _| keep.contains(account));
        before - self.players.len()
    }
}
