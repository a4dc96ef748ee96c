//! Colony Jobs - Headless demo colony. Logs task traffic and a summary.
//!
//! Usage: colony_jobs [settings.json]

use std::path::PathBuf;

use bevy::app::TaskPoolPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use colony_jobs::agent::AgentPool;
use colony_jobs::build_app;
use colony_jobs::components::AgentKind;
use colony_jobs::constants::RUBBLE_HARDNESS;
use colony_jobs::messages::*;
use colony_jobs::operable::{OperableSet, Turret};
use colony_jobs::scheduler::TaskManager;
use colony_jobs::settings::{SchedulerSettings, load_settings};
use colony_jobs::task::Priority;
use colony_jobs::world::{LandmarkKind, VoxelWorld};

const DEMO_TICKS: u64 = 1200;
const DEMO_SEED: u64 = 7;
const RUBBLE_PILES: usize = 6;

fn demo_world(rng: &mut StdRng) -> VoxelWorld {
    let mut world = VoxelWorld::new(IVec3::new(24, 6, 24));
    // a walled yard with a gate
    world.fill_walls(IVec3::new(8, 0, 8), IVec3::new(15, 1, 8));
    world.fill_walls(IVec3::new(8, 0, 9), IVec3::new(8, 1, 15));
    world.clear_block(IVec3::new(8, 0, 12));
    world.clear_block(IVec3::new(8, 1, 12));
    world.add_landmark(LandmarkKind::HealingStation, IVec3::new(2, 0, 2));

    let mut placed = 0;
    while placed < RUBBLE_PILES {
        let cell = IVec3::new(rng.random_range(0..24), 0, rng.random_range(16..24));
        if world.block(cell).is_none() && world.place_rubble(cell, RUBBLE_HARDNESS) {
            placed += 1;
        }
    }
    world
}

fn main() {
    let mut app = App::new();
    app.add_plugins((TaskPoolPlugin::default(), LogPlugin::default()));
    info!("colony_jobs build {}", env!("BUILD_COMMIT"));

    let settings = std::env::args()
        .nth(1)
        .map(|path| load_settings(&PathBuf::from(path)))
        .unwrap_or_else(SchedulerSettings::default);
    let mut rng = StdRng::seed_from_u64(DEMO_SEED);
    let world = demo_world(&mut rng);
    let rubble: Vec<IVec3> = (0..24)
        .flat_map(|x| (16..24).map(move |z| IVec3::new(x, 0, z)))
        .filter(|cell| world.block(*cell).is_some())
        .collect();

    app.insert_resource(settings);
    app.insert_resource(world);
    build_app(&mut app);

    let mut turret = Turret::new(IVec3::new(12, 0, 12));
    turret.set_alert(true);
    app.world_mut().resource_mut::<OperableSet>().insert(turret);

    for (kind, cell) in [
        (AgentKind::Colonist, IVec3::new(1, 0, 1)),
        (AgentKind::Colonist, IVec3::new(3, 0, 1)),
        (AgentKind::Colonist, IVec3::new(5, 0, 1)),
        (AgentKind::Drone, IVec3::new(1, 2, 5)),
        (AgentKind::Sentry, IVec3::new(20, 0, 2)),
    ] {
        app.world_mut().write_message(SpawnAgentMsg { kind, cell });
    }
    for x in 16..21 {
        app.world_mut().write_message(DesignateMsg { cell: IVec3::new(x, 0, 4), work: WorkKind::Build, priority: Priority::Medium });
    }
    for cell in rubble {
        app.world_mut().write_message(DesignateMsg { cell, work: WorkKind::Dig, priority: Priority::Low });
    }

    for tick in 0..DEMO_TICKS {
        if tick == 300 {
            // a raid hurts the first colonist badly
            let victim = app.world().resource::<AgentPool>().ids().next();
            if let Some(agent) = victim {
                app.world_mut().write_message(DamageMsg { agent, amount: 70.0 });
            }
        }
        app.update();
    }

    let manager = app.world().resource::<TaskManager>();
    let stats = manager.stats();
    info!(
        "{} ticks: {} registered, {} assignments, {} preemptions, {} pruned, {} ended, {} still open",
        DEMO_TICKS, stats.registered, stats.assignments, stats.preemptions, stats.pruned, stats.ended, manager.live_count()
    );
    for (id, agent) in app.world().resource::<AgentPool>().iter() {
        info!(
            "  {} {:?} at {:?}, {:.0} hp, busy {} / idle {} ticks",
            agent.kind().name(), id, agent.occupied_cell(), agent.health.current, agent.busy_ticks, agent.idle_ticks
        );
    }
}
