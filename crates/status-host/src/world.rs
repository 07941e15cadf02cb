//! Demo game world owned by the host runtime.
//!
//! The world is a small stand-in for a real game server: a map rotation,
//! a heightmap per map that gets cratered as the game goes on, simulated
//! players racking up kills, and two team scores. The host's game loop
//! calls [`World::tick`]; the status server reads it through the
//! [`GameStateProvider`] and [`MapRenderer`] impls.
//!
//! All mutable state sits behind one lock, so a snapshot or an overview
//! render always sees a single consistent tick.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use futures::FutureExt as _;
use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom as _;
use rand::{Rng, SeedableRng};
use status_server::provider::{GameStateProvider, MapRenderer, OVERVIEW_SIZE, RenderError};
use status_types::{GameStateSnapshot, MapIdentity, MapInfo, PlayerStatus, TeamScores};
use tracing::{debug, info};

use crate::config::{GameConfig, MapEntry};
use crate::error::HostError;

/// Edge length of the heightmap, one cell per overview pixel.
const EDGE: usize = OVERVIEW_SIZE as usize;

/// Tallest column a map can have.
const MAX_HEIGHT: u8 = 63;

/// Columns at or below this height are water.
const WATER_LEVEL: u8 = 6;

/// Ticks between craters.
const CRATER_EVERY: u64 = 4;

const TEAMS: [&str; 2] = ["Blue", "Green"];
const CLIENTS: [&str; 3] = ["OpenSpades 0.1.3", "BetterSpades 0.1.5", "Ace of Spades 0.75"];

/// Column heights of one map, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terrain {
    heights: Vec<u8>,
}

impl Terrain {
    /// Generate the terrain for `map`. The same name always yields the
    /// same terrain.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::arithmetic_side_effects
    )]
    pub fn generate(map: &MapIdentity) -> Self {
        let mut rng = StdRng::seed_from_u64(name_seed(map.as_str()));
        let hills: Vec<(f32, f32, f32, f32)> = (0..14)
            .map(|_| {
                (
                    rng.random_range(0.0..EDGE as f32),
                    rng.random_range(0.0..EDGE as f32),
                    rng.random_range(40.0..170.0_f32),
                    rng.random_range(6.0..26.0_f32),
                )
            })
            .collect();

        let mut heights = Vec::with_capacity(EDGE.pow(2));
        for y in 0..EDGE {
            for x in 0..EDGE {
                let (fx, fy) = (x as f32, y as f32);
                let height: f32 = hills
                    .iter()
                    .map(|&(cx, cy, radius, amplitude)| {
                        let d2 = (fx - cx).powi(2) + (fy - cy).powi(2);
                        amplitude * (1.0 - d2 / radius.powi(2)).max(0.0)
                    })
                    .sum();
                heights.push((2.0 + height).clamp(0.0, f32::from(MAX_HEIGHT)) as u8);
            }
        }
        Self { heights }
    }

    /// Height of the column at `(x, y)`, or 0 outside the map.
    pub fn height(&self, x: usize, y: usize) -> u8 {
        if x >= EDGE || y >= EDGE {
            return 0;
        }
        y.checked_mul(EDGE)
            .and_then(|row| row.checked_add(x))
            .and_then(|i| self.heights.get(i))
            .copied()
            .unwrap_or(0)
    }

    /// Blast a bowl-shaped crater centred on `(cx, cy)`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn carve(&mut self, cx: usize, cy: usize, radius: usize) {
        let (x0, x1) = (cx.saturating_sub(radius), cx.saturating_add(radius).min(EDGE));
        let (y0, y1) = (cy.saturating_sub(radius), cy.saturating_add(radius).min(EDGE));
        let r2 = radius.saturating_mul(radius);

        for y in y0..y1 {
            for x in x0..x1 {
                let d2 = x.abs_diff(cx).pow(2).saturating_add(y.abs_diff(cy).pow(2));
                if d2 >= r2 {
                    continue;
                }
                let depth = r2
                    .saturating_sub(d2)
                    .saturating_mul(8)
                    .checked_div(r2)
                    .unwrap_or(0) as u8;
                let Some(cell) = y
                    .checked_mul(EDGE)
                    .and_then(|row| row.checked_add(x))
                    .and_then(|i| self.heights.get_mut(i))
                else {
                    continue;
                };
                *cell = cell.saturating_sub(depth);
            }
        }
    }

    /// Color the heightmap top-down: water, sand, grass, rock, snow.
    pub fn render(&self) -> RgbaImage {
        RgbaImage::from_fn(OVERVIEW_SIZE, OVERVIEW_SIZE, |x, y| {
            let h = self.height(x as usize, y as usize);
            shade(h)
        })
    }
}

fn shade(height: u8) -> Rgba<u8> {
    match height {
        h if h <= WATER_LEVEL => Rgba([28, 72, 150, 255]),
        h if h <= WATER_LEVEL.saturating_add(2) => Rgba([196, 180, 128, 255]),
        h if h <= 28 => Rgba([60, 110_u8.saturating_add(h.saturating_mul(3)), 52, 255]),
        h if h <= 44 => {
            let g = 90_u8.saturating_add(h);
            Rgba([g, g, g, 255])
        }
        _ => Rgba([236, 236, 242, 255]),
    }
}

/// FNV-1a over the map name, so terrain does not depend on std's hasher.
fn name_seed(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

struct WorldState {
    tick: u64,
    map_index: usize,
    map: MapEntry,
    terrain: Terrain,
    players: Vec<PlayerStatus>,
    scores: TeamScores,
    rng: StdRng,
}

/// The live game world.
pub struct World {
    config: GameConfig,
    started_at: Instant,
    state: RwLock<WorldState>,
}

impl World {
    /// Create the world on the first map of the rotation.
    ///
    /// Fails if the rotation is empty.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, HostError> {
        let map = config.maps.first().cloned().ok_or_else(|| HostError::Config {
            message: String::from("game.maps must list at least one map"),
        })?;
        let mut rng = StdRng::seed_from_u64(seed);
        let players = config
            .bots
            .iter()
            .zip(TEAMS.iter().cycle())
            .map(|(name, team)| PlayerStatus {
                name: name.clone(),
                latency: rng.random_range(20..160),
                client: String::from(CLIENTS.choose(&mut rng).copied().unwrap_or("unknown")),
                kills: 0,
                team: String::from(*team),
            })
            .collect();

        let state = WorldState {
            tick: 0,
            map_index: 0,
            terrain: Terrain::generate(&MapIdentity::from(map.name.as_str())),
            map,
            players,
            scores: TeamScores {
                max_score: config.max_score,
                ..TeamScores::default()
            },
            rng,
        };

        Ok(Self {
            config,
            started_at: Instant::now(),
            state: RwLock::new(state),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, WorldState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WorldState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current tick number.
    pub fn current_tick(&self) -> u64 {
        self.read().tick
    }

    /// Advance the simulation by one tick.
    pub fn tick(&self) {
        let mut guard = self.write();
        let state = &mut *guard;
        state.tick = state.tick.saturating_add(1);

        for player in &mut state.players {
            let jitter: i32 = state.rng.random_range(-6..=6);
            player.latency = player.latency.saturating_add_signed(jitter).clamp(15, 400);
        }

        if state.rng.random_bool(0.3) && !state.players.is_empty() {
            let shooter = state.rng.random_range(0..state.players.len());
            if let Some(player) = state.players.get_mut(shooter) {
                player.kills = player.kills.saturating_add(1);
                debug!(tick = state.tick, player = %player.name, "Kill");
            }
        }

        if state.tick % CRATER_EVERY == 0 {
            let (x, y) = (state.rng.random_range(0..EDGE), state.rng.random_range(0..EDGE));
            let radius = state.rng.random_range(6..24);
            state.terrain.carve(x, y, radius);
        }

        if state.rng.random_bool(0.05) {
            if state.rng.random_bool(0.5) {
                state.scores.current_blue_score = state.scores.current_blue_score.saturating_add(1);
            } else {
                state.scores.current_green_score =
                    state.scores.current_green_score.saturating_add(1);
            }
        }

        let max = state.scores.max_score;
        if state.scores.current_blue_score >= max || state.scores.current_green_score >= max {
            self.advance_map(state);
        }
    }

    /// Switch to the next map in the rotation and start a fresh game.
    pub fn rotate_map(&self) {
        let mut guard = self.write();
        self.advance_map(&mut guard);
    }

    fn advance_map(&self, state: &mut WorldState) {
        let next = state
            .map_index
            .checked_add(1)
            .filter(|&i| i < self.config.maps.len())
            .unwrap_or(0);
        if let Some(map) = self.config.maps.get(next) {
            state.map_index = next;
            state.map = map.clone();
            state.terrain = Terrain::generate(&MapIdentity::from(map.name.as_str()));
        }
        state.scores.current_blue_score = 0;
        state.scores.current_green_score = 0;
        for player in &mut state.players {
            player.kills = 0;
        }
        info!(tick = state.tick, map = %state.map.name, "Map rotated");
    }
}

impl GameStateProvider for World {
    fn current_map(&self) -> MapIdentity {
        MapIdentity::from(self.read().map.name.as_str())
    }

    fn snapshot(&self) -> GameStateSnapshot {
        let state = self.read();
        GameStateSnapshot {
            server_identifier: format!("aos://16777343:{}", self.config.game_port),
            server_name: self.config.name.clone(),
            server_version: String::from(env!("CARGO_PKG_VERSION")),
            server_uptime: self.started_at.elapsed().as_secs_f64(),
            game_mode: self.config.game_mode.clone(),
            map: MapInfo {
                name: MapIdentity::from(state.map.name.as_str()),
                version: state.map.version.clone(),
                author: state.map.author.clone(),
            },
            players: state.players.clone(),
            max_players: self.config.max_players,
            scores: state.scores,
        }
    }
}

impl MapRenderer for World {
    fn render(&self) -> BoxFuture<'_, Result<RgbaImage, RenderError>> {
        let image = self.read().terrain.render();
        futures::future::ready(Ok(image)).boxed()
    }
}
