use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

const MAX_EVENTS: usize = 500;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventKind {
    MapLoaded { path: String, reused_record: bool },
    CoinCollected { total: i32 },
    EntityDestroyed { kind: String, x: f32, y: f32 },
    BarrierOpened { tag: i8, count: usize },
    PlayerHurt { hp: i32 },
    PlayerRespawned,
    SpawnDropped { kind: String, x: usize, y: usize },
}

#[derive(Serialize, Clone, Debug)]
pub struct GameEvent {
    #[serde(flatten)]
    pub kind: GameEventKind,
    pub frame: u64,
}

#[derive(Default, Debug)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    pub frame: u64,
    pub dropped_events: u64,
    last_overflow_log_frame: u64,
}

impl GameEventBus {
    pub fn emit(&mut self, kind: GameEventKind) {
        self.recent.push_back(GameEvent {
            kind,
            frame: self.frame,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "[Tileworld events] Dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    pub fn tick(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    pub fn count(&self, matches: impl Fn(&GameEventKind) -> bool) -> usize {
        self.recent.iter().filter(|ev| matches(&ev.kind)).count()
    }

    /// One JSON object per line, oldest first.
    pub fn to_json_lines(&self) -> String {
        self.recent
            .iter()
            .filter_map(|ev| serde_json::to_string(ev).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
