//! Wave/spawn director
//!
//! Play time selects the active window from an ordered, non-overlapping
//! schedule. Inside a window a spawn timer accumulates `dt` and releases one
//! enemy each time it reaches the window's interval. A boss window releases
//! exactly one boss per run.

use serde::{Deserialize, Serialize};

use super::entities::EnemyKind;

/// Shortest spawn interval after difficulty scaling (seconds)
pub const MIN_SPAWN_INTERVAL: f32 = 0.05;

/// One entry of the spawn schedule, active for `start <= t < end`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnWindow {
    pub start: f32,
    pub end: f32,
    /// Seconds between spawns
    pub interval: f32,
    pub enemy: EnemyKind,
}

impl SpawnWindow {
    pub const fn new(start: f32, end: f32, interval: f32, enemy: EnemyKind) -> Self {
        Self {
            start,
            end,
            interval,
            enemy,
        }
    }

    #[inline]
    pub fn contains(&self, t: f32) -> bool {
        t >= self.start && t < self.end
    }
}

/// Ten minutes of escalating waves with a boss at 5:00
pub fn default_schedule() -> Vec<SpawnWindow> {
    vec![
        SpawnWindow::new(0.0, 60.0, 2.0, EnemyKind::Basic),
        SpawnWindow::new(60.0, 120.0, 1.2, EnemyKind::Basic),
        SpawnWindow::new(120.0, 180.0, 1.0, EnemyKind::Fast),
        SpawnWindow::new(180.0, 240.0, 0.8, EnemyKind::Basic),
        SpawnWindow::new(240.0, 300.0, 1.5, EnemyKind::Tank),
        SpawnWindow::new(300.0, 305.0, 1.0, EnemyKind::Boss),
        SpawnWindow::new(305.0, 360.0, 0.6, EnemyKind::Fast),
        SpawnWindow::new(360.0, 420.0, 1.0, EnemyKind::Tank),
        SpawnWindow::new(420.0, 480.0, 0.4, EnemyKind::Basic),
        SpawnWindow::new(480.0, 540.0, 0.35, EnemyKind::Fast),
        SpawnWindow::new(540.0, 600.0, 0.6, EnemyKind::Tank),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Director {
    schedule: Vec<SpawnWindow>,
    /// Multiplies every window interval (difficulty)
    interval_scale: f32,
    play_time: f32,
    spawn_timer: f32,
    /// Index of the window last active (or the next one to open)
    wave_index: usize,
    boss_spawned: bool,
}

impl Director {
    pub fn new(schedule: Vec<SpawnWindow>, interval_scale: f32) -> Self {
        Self {
            schedule,
            interval_scale: interval_scale.max(f32::EPSILON),
            play_time: 0.0,
            spawn_timer: 0.0,
            wave_index: 0,
            boss_spawned: false,
        }
    }

    /// Start a new run
    pub fn reset(&mut self) {
        self.play_time = 0.0;
        self.spawn_timer = 0.0;
        self.wave_index = 0;
        self.boss_spawned = false;
    }

    #[inline]
    pub fn play_time(&self) -> f32 {
        self.play_time
    }

    #[inline]
    pub fn wave_index(&self) -> usize {
        self.wave_index
    }

    #[inline]
    pub fn boss_spawned(&self) -> bool {
        self.boss_spawned
    }

    /// Window active at the current play time
    pub fn active_window(&self) -> Option<&SpawnWindow> {
        self.schedule.get(self.wave_index).filter(|w| w.contains(self.play_time))
    }

    /// Advance by `dt`; returns the enemy to spawn this tick, if any
    pub fn update(&mut self, dt: f32) -> Option<EnemyKind> {
        if dt.is_nan() || dt <= 0.0 {
            return None;
        }
        self.play_time += dt;

        let previous = self.wave_index;
        while self
            .schedule
            .get(self.wave_index)
            .is_some_and(|w| self.play_time >= w.end)
        {
            self.wave_index += 1;
        }
        if self.wave_index != previous {
            self.spawn_timer = 0.0;
            if let Some(next) = self.schedule.get(self.wave_index) {
                log::info!(
                    "Wave {} ({:?} every {:.2}s) from {:.0}s",
                    self.wave_index + 1,
                    next.enemy,
                    next.interval * self.interval_scale,
                    next.start
                );
            } else {
                log::info!("Spawn schedule exhausted at {:.0}s", self.play_time);
            }
        }

        let window = *self.active_window()?;
        if window.enemy == EnemyKind::Boss {
            if self.boss_spawned {
                return None;
            }
            self.boss_spawned = true;
            return Some(EnemyKind::Boss);
        }

        self.spawn_timer += dt;
        let interval = (window.interval * self.interval_scale).max(MIN_SPAWN_INTERVAL);
        if self.spawn_timer >= interval {
            self.spawn_timer = 0.0;
            return Some(window.enemy);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(director: &mut Director, seconds: f32, dt: f32) -> Vec<EnemyKind> {
        let steps = (seconds / dt).round() as usize;
        (0..steps).filter_map(|_| director.update(dt)).collect()
    }

    #[test]
    fn test_single_window_spawn_count() {
        let mut director = Director::new(vec![SpawnWindow::new(0.0, 60.0, 2.0, EnemyKind::Basic)], 1.0);
        let spawns = run(&mut director, 60.0, 1.0 / 60.0);
        assert!((29..=31).contains(&spawns.len()), "spawned {}", spawns.len());
        assert!(spawns.iter().all(|k| *k == EnemyKind::Basic));
    }

    #[test]
    fn test_boss_is_latched_until_reset() {
        let schedule = vec![
            SpawnWindow::new(0.0, 1.0, 10.0, EnemyKind::Basic),
            SpawnWindow::new(1.0, 5.0, 0.1, EnemyKind::Boss),
        ];
        let mut director = Director::new(schedule, 1.0);
        let spawns = run(&mut director, 5.0, 0.1);
        assert_eq!(spawns.iter().filter(|k| **k == EnemyKind::Boss).count(), 1);
        assert!(director.boss_spawned());

        director.reset();
        assert_eq!(director.play_time(), 0.0);
        assert_eq!(director.wave_index(), 0);
        assert!(!director.boss_spawned());
        let spawns = run(&mut director, 5.0, 0.1);
        assert_eq!(spawns.iter().filter(|k| **k == EnemyKind::Boss).count(), 1);
    }

    #[test]
    fn test_gaps_and_end_of_schedule_are_quiet() {
        let schedule = vec![
            SpawnWindow::new(0.0, 1.0, 0.1, EnemyKind::Fast),
            SpawnWindow::new(3.0, 4.0, 0.1, EnemyKind::Tank),
        ];
        let mut director = Director::new(schedule, 1.0);
        run(&mut director, 1.05, 0.05);
        assert!(run(&mut director, 1.8, 0.05).is_empty());
        let tanks = run(&mut director, 1.5, 0.05);
        assert!(!tanks.is_empty() && tanks.iter().all(|k| *k == EnemyKind::Tank));
        assert!(run(&mut director, 10.0, 0.05).is_empty());
        assert!(director.active_window().is_none());
    }

    #[test]
    fn test_interval_scale_speeds_up_spawns() {
        let window = vec![SpawnWindow::new(0.0, 10.0, 1.0, EnemyKind::Basic)];
        let normal = run(&mut Director::new(window.clone(), 1.0), 10.0, 0.01).len();
        let hard = run(&mut Director::new(window, 0.5), 10.0, 0.01).len();
        assert!(hard > normal + 5, "normal {normal}, hard {hard}");
    }

    #[test]
    fn test_default_schedule_is_ordered() {
        let schedule = default_schedule();
        for pair in schedule.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(schedule.iter().filter(|w| w.enemy == EnemyKind::Boss).count(), 1);
    }
}
