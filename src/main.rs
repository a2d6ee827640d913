//! Tailstorm headless runner
//!
//! Plays one run on autopilot and prints a JSON summary. Usage:
//! `tailstorm [settings.json] [minutes]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use serde::Serialize;

    use tailstorm::Settings;
    use tailstorm::consts::*;
    use tailstorm::sim::{GamePhase, GameState, SimEvent, TickInput, tick};

    /// What the run produced
    #[derive(Debug, Serialize)]
    pub struct RunSummary {
        pub seed: u64,
        pub play_time: f32,
        pub score: u64,
        pub kills: u32,
        pub gold: u64,
        pub level: u32,
        pub tail_length: usize,
        pub bosses: u32,
        pub game_over: bool,
    }

    /// Fixed-step driver fed by frame times
    pub struct Runner {
        pub state: GameState,
        accumulator: f32,
        bosses: u32,
    }

    impl Runner {
        pub fn new(settings: Settings) -> Self {
            Self {
                state: GameState::new(settings),
                accumulator: 0.0,
                bosses: 0,
            }
        }

        /// Advance by one frame of `dt` seconds
        pub fn frame(&mut self, dt: f32) {
            let input = TickInput {
                idle_mode: true,
                ..TickInput::default()
            };
            self.accumulator += dt;
            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                tick(&mut self.state, &input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;
            }
            // Drop time we could not catch up on
            if substeps == MAX_SUBSTEPS {
                self.accumulator = 0.0;
            }

            for event in self.state.drain_events() {
                match event {
                    SimEvent::BossSpawned { id } => {
                        self.bosses += 1;
                        log::info!("Boss {id} spawned at {:.1}s", self.state.play_time());
                    }
                    SimEvent::LevelUp { level } => log::debug!("Reached level {level}"),
                    SimEvent::SegmentMerged { kind, tier } => log::debug!("Merged into {kind:?} tier {tier}"),
                    SimEvent::PlayerRevived => log::info!("Revived"),
                    _ => {}
                }
            }
        }

        pub fn finished(&self) -> bool {
            self.state.phase() == GamePhase::GameOver
        }

        pub fn summary(&self) -> RunSummary {
            let player = self.state.player();
            RunSummary {
                seed: self.state.seed,
                play_time: self.state.play_time(),
                score: self.state.score(),
                kills: self.state.kills,
                gold: self.state.gold(),
                level: player.stats.level,
                tail_length: self.state.tail().len(),
                bosses: self.bosses,
                game_over: self.finished(),
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Tailstorm (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => tailstorm::Settings::load_or_default(path),
        None => tailstorm::Settings::default(),
    };
    let minutes: f32 = args.next().and_then(|m| m.parse().ok()).unwrap_or(10.0);

    let mut runner = headless::Runner::new(settings);
    let frames = (minutes * 60.0 / tailstorm::consts::SIM_DT) as u64;
    for _ in 0..frames {
        runner.frame(tailstorm::consts::SIM_DT);
        if runner.finished() {
            break;
        }
    }

    let summary = runner.summary();
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to encode summary: {e}"),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation is consumed as a library on the web
}
