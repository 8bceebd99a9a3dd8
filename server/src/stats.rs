//! Per-game statistics and the sink they are reported to.

use crate::session::GameId;
use log::info;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub hits: u32,
    pub misses: u32,
    pub ships_sunk: u32,
}

/// Summary of one terminated game that got past the waiting phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub game_id: GameId,
    pub ai_game: bool,
    /// The game ended with a winner rather than a leave or timeout
    pub completed: bool,
    pub won_against_ai: bool,
    pub players: [PlayerStats; 2],
}

/// Receives one record per finished game. Fire-and-forget for the caller.
pub trait StatsSink: Send + Sync {
    fn record(&self, stats: GameStats);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeTotals {
    pub games: u64,
    pub completed: u64,
    pub hits: u64,
    pub misses: u64,
    pub ships_sunk: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsTotals {
    pub pvp: ModeTotals,
    pub ai: ModeTotals,
    pub won_against_ai: u64,
}

#[derive(Debug, Default)]
struct ModeCounters {
    games: AtomicU64,
    completed: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    ships_sunk: AtomicU64,
}

impl ModeCounters {
    fn add(&self, stats: &GameStats) {
        self.games.fetch_add(1, Ordering::Relaxed);
        if stats.completed {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
        for player in &stats.players {
            self.hits.fetch_add(player.hits as u64, Ordering::Relaxed);
            self.misses.fetch_add(player.misses as u64, Ordering::Relaxed);
            self.ships_sunk.fetch_add(player.ships_sunk as u64, Ordering::Relaxed);
        }
    }

    fn totals(&self) -> ModeTotals {
        ModeTotals {
            games: self.games.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ships_sunk: self.ships_sunk.load(Ordering::Relaxed),
        }
    }
}

/// In-memory running totals, split by game mode.
#[derive(Debug, Default)]
pub struct StatsLedger {
    pvp: ModeCounters,
    ai: ModeCounters,
    won_against_ai: AtomicU64,
}

impl StatsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self) -> StatsTotals {
        StatsTotals {
            pvp: self.pvp.totals(),
            ai: self.ai.totals(),
            won_against_ai: self.won_against_ai.load(Ordering::Relaxed),
        }
    }
}

impl StatsSink for StatsLedger {
    fn record(&self, stats: GameStats) {
        if stats.ai_game {
            self.ai.add(&stats);
            if stats.won_against_ai {
                self.won_against_ai.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.pvp.add(&stats);
        }

        info!(
            "Game {} recorded: ai={} completed={} hits={}/{} sunk={}/{}",
            stats.game_id,
            stats.ai_game,
            stats.completed,
            stats.players[0].hits,
            stats.players[1].hits,
            stats.players[0].ships_sunk,
            stats.players[1].ships_sunk
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record(ai_game: bool, completed: bool, won_against_ai: bool) -> GameStats {
        GameStats {
            game_id: Uuid::new_v4(),
            ai_game,
            completed,
            won_against_ai,
            players: [
                PlayerStats { hits: 17, misses: 20, ships_sunk: 5 },
                PlayerStats { hits: 9, misses: 27, ships_sunk: 2 },
            ],
        }
    }

    #[test]
    fn test_ledger_splits_modes() {
        let ledger = StatsLedger::new();
        ledger.record(record(false, true, false));
        ledger.record(record(true, true, true));
        ledger.record(record(true, false, false));

        let totals = ledger.totals();
        assert_eq!(totals.pvp.games, 1);
        assert_eq!(totals.pvp.completed, 1);
        assert_eq!(totals.pvp.hits, 26);
        assert_eq!(totals.ai.games, 2);
        assert_eq!(totals.ai.completed, 1);
        assert_eq!(totals.ai.misses, 94);
        assert_eq!(totals.ai.ships_sunk, 14);
        assert_eq!(totals.won_against_ai, 1);
    }

    #[test]
    fn test_empty_ledger() {
        assert_eq!(StatsLedger::new().totals(), StatsTotals::default());
    }
}
