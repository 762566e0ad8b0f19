//! Authoritative session state: the player roster, harvest counters and gift queues

use log::{debug, info};
use shared::{Controls, Crop, Harvest, PlayerSummary, StateSnapshot, WIN_GOAL};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Per-connection session state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub name: String,
    /// Latest reported control state, with presses accumulated since the last tick
    pub controls: Controls,
}

impl Player {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: format!("Player {}", id),
            controls: Controls::default(),
        }
    }
}

/// Result of counting one raw crop pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestOutcome {
    /// New total for the picked crop
    pub total: u32,
    /// Set only on the pickup that first satisfied the win goal
    pub won_now: bool,
}

#[derive(Debug, Clone)]
pub struct Game {
    pub tick: u32,
    /// Roster in join order. Gift targeting depends on this order.
    pub players: Vec<Player>,
    pub harvest: Harvest,
    /// Never reset once set
    pub win: bool,
    pub win_goal: Harvest,
    pending_gifts: HashMap<u32, VecDeque<Crop>>,
    next_player_id: u32,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self::with_goal(WIN_GOAL)
    }

    pub fn with_goal(win_goal: Harvest) -> Self {
        Self {
            tick: 0,
            players: Vec::new(),
            harvest: Harvest::default(),
            win: false,
            win_goal,
            pending_gifts: HashMap::new(),
            next_player_id: 1,
        }
    }

    /// Adds a new player at the end of the roster and returns its id.
    pub fn spawn_player(&mut self) -> u32 {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let player = Player::new(id);
        info!("Spawned {} (id {})", player.name, id);
        self.players.push(player);
        self.pending_gifts.insert(id, VecDeque::new());
        id
    }

    /// Removes a player. Returns false when it was already gone.
    pub fn remove_player(&mut self, id: u32) -> bool {
        let Some(index) = self.roster_index(id) else {
            return false;
        };
        let player = self.players.remove(index);
        self.pending_gifts.remove(&id);
        info!("Removed {} (id {})", player.name, id);
        true
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: u32) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn roster_index(&self, id: u32) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// Folds a controls report into the player's accumulator.
    pub fn apply_controls(&mut self, id: u32, controls: &Controls) -> bool {
        match self.player_mut(id) {
            Some(player) => {
                player.controls.merge(controls);
                true
            }
            None => false,
        }
    }

    /// Counts a raw crop and evaluates the win goal.
    ///
    /// `won_now` is true at most once per game, no matter how many pickups
    /// follow.
    pub fn record_harvest(&mut self, crop: Crop) -> HarvestOutcome {
        let total = self.harvest.add(crop);
        let won_now = !self.win && self.harvest.meets(&self.win_goal);
        if won_now {
            self.win = true;
        }
        HarvestOutcome { total, won_now }
    }

    /// Picks who receives a gift sent by `sender`: the next player in the
    /// roster, wrapping to the front. A sender missing from the roster
    /// gifts the first player. Empty roster yields `None`.
    pub fn gift_target(&self, sender: u32) -> Option<u32> {
        if self.players.is_empty() {
            return None;
        }
        let target = match self.roster_index(sender) {
            Some(index) => (index + 1) % self.players.len(),
            None => 0,
        };
        Some(self.players[target].id)
    }

    pub fn enqueue_gift(&mut self, target: u32, crop: Crop) -> bool {
        match self.pending_gifts.get_mut(&target) {
            Some(queue) => {
                queue.push_back(crop);
                true
            }
            None => false,
        }
    }

    /// Drains the gifts waiting for `target` in arrival order.
    pub fn take_gifts(&mut self, target: u32) -> Vec<Crop> {
        self.pending_gifts
            .get_mut(&target)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn pending_gift_count(&self, target: u32) -> usize {
        self.pending_gifts.get(&target).map_or(0, VecDeque::len)
    }

    /// Advances the simulation by one tick. Movement is client-side, so this
    /// only clears the per-tick press counters.
    pub fn update(&mut self, dt: Duration) {
        for player in &mut self.players {
            player.controls.reset_downs();
        }
        self.tick = self.tick.wrapping_add(1);
        debug!("Tick {} advanced by {:?}", self.tick, dt);
    }

    pub fn snapshot_for(&self, player_id: u32) -> StateSnapshot {
        StateSnapshot {
            tick: self.tick,
            player_id,
            players: self
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                })
                .collect(),
            harvest: self.harvest,
            win: self.win,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with_players(n: usize) -> (Game, Vec<u32>) {
        let mut game = Game::new();
        let ids = (0..n).map(|_| game.spawn_player()).collect();
        (game, ids)
    }

    #[test]
    fn test_spawn_assigns_unique_ids() {
        let (mut game, ids) = game_with_players(3);
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(game.players[1].name, "Player 2");

        assert!(game.remove_player(3));
        let id = game.spawn_player();
        assert_eq!(id, 4, "ids are never reused");
    }

    #[test]
    fn test_remove_player_is_idempotent() {
        let (mut game, ids) = game_with_players(2);
        assert!(game.remove_player(ids[0]));
        assert!(!game.remove_player(ids[0]));
        assert_eq!(game.players.len(), 1);
        assert_eq!(game.players[0].id, ids[1]);
    }

    #[test]
    fn test_apply_controls_accumulates() {
        let (mut game, ids) = game_with_players(1);
        let mut report = Controls::default();
        report.left.press();

        assert!(game.apply_controls(ids[0], &report));
        assert!(game.apply_controls(ids[0], &report));
        assert!(!game.apply_controls(99, &report));

        let controls = game.player(ids[0]).unwrap().controls;
        assert!(controls.left.pressed);
        assert_eq!(controls.left.downs, 2);

        game.update(shared::TICK);
        let controls = game.player(ids[0]).unwrap().controls;
        assert!(controls.left.pressed);
        assert_eq!(controls.left.downs, 0);
    }

    #[test]
    fn test_win_fires_once() {
        let mut game = Game::with_goal(Harvest {
            carrots: 1,
            tomatoes: 1,
            beets: 1,
        });

        assert!(!game.record_harvest(Crop::Carrot).won_now);
        assert!(!game.record_harvest(Crop::Tomato).won_now);
        let outcome = game.record_harvest(Crop::Beet);
        assert_eq!(outcome.total, 1);
        assert!(outcome.won_now);
        assert!(game.win);

        for crop in Crop::ALL {
            assert!(!game.record_harvest(crop).won_now);
        }
        assert!(game.win);
        assert_eq!(game.harvest.carrots, 2);
    }

    #[test]
    fn test_gift_target_round_robin() {
        let (game, ids) = game_with_players(4);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(game.gift_target(*id), Some(ids[(i + 1) % ids.len()]));
        }
    }

    #[test]
    fn test_gift_target_edge_cases() {
        let (mut game, ids) = game_with_players(3);
        assert_eq!(game.gift_target(77), Some(ids[0]));

        game.remove_player(ids[1]);
        assert_eq!(game.gift_target(ids[0]), Some(ids[2]));
        assert_eq!(game.gift_target(ids[1]), Some(ids[0]));

        let (single, only) = game_with_players(1);
        assert_eq!(single.gift_target(only[0]), Some(only[0]));

        let empty = Game::new();
        assert_eq!(empty.gift_target(1), None);
    }

    #[test]
    fn test_gift_queue_order() {
        let (mut game, ids) = game_with_players(2);
        assert!(game.enqueue_gift(ids[1], Crop::Beet));
        assert!(game.enqueue_gift(ids[1], Crop::Carrot));
        assert!(!game.enqueue_gift(42, Crop::Carrot));
        assert_eq!(game.pending_gift_count(ids[1]), 2);

        assert_eq!(game.take_gifts(ids[1]), vec![Crop::Beet, Crop::Carrot]);
        assert_eq!(game.pending_gift_count(ids[1]), 0);
        assert!(game.take_gifts(ids[0]).is_empty());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let (mut game, ids) = game_with_players(2);
        game.record_harvest(Crop::Tomato);
        game.update(shared::TICK);

        let snapshot = game.snapshot_for(ids[1]);
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.player_id, ids[1]);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].name, "Player 1");
        assert_eq!(snapshot.harvest.tomatoes, 1);
        assert!(!snapshot.win);
    }
}
