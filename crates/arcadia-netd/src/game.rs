//! Default game content and progression rules.

use arcadia_netproto::constants::{
    DEFAULT_CREDENTIAL_TYPE, EXPERIENCE_PER_LEVEL, TUTORIAL_TASK_ID,
};
use arcadia_netproto::state::{
    GameMap, GameState, GameStatus, MapObject, Objective, Position, Reward, Task, TaskStatus,
};
use serde_json::{Map, Value};

pub mod tasks;

pub use tasks::{TaskTransition, transition_task};

const MAP_WIDTH: u32 = 800;
const MAP_HEIGHT: u32 = 600;
const TILE_ROWS: usize = 60;
const TILE_COLS: usize = 80;

const SPAWN_POINTS: [Position; 3] = [
    Position::new(100.0, 100.0),
    Position::new(200.0, 200.0),
    Position::new(300.0, 300.0),
];

/// Level reached with `experience` total points.
pub const fn level_for_experience(experience: u32) -> u32 {
    1 + experience / EXPERIENCE_PER_LEVEL
}

/// Fresh state for a newly created room.
pub fn default_game_state() -> GameState {
    GameState {
        status: GameStatus::Waiting,
        map: default_map(),
        tasks: vec![tutorial_task()],
        events: Vec::new(),
    }
}

fn default_map() -> GameMap {
    let mut spawn_props = Map::new();
    spawn_props.insert("name".into(), Value::String("main_spawn".into()));

    GameMap {
        width: MAP_WIDTH,
        height: MAP_HEIGHT,
        tiles: vec![vec![0; TILE_COLS]; TILE_ROWS],
        objects: vec![MapObject {
            id: "spawn1".into(),
            kind: "spawn_point".into(),
            position: SPAWN_POINTS[0],
            width: 32,
            height: 32,
            properties: spawn_props,
        }],
        spawn_points: SPAWN_POINTS.to_vec(),
    }
}

fn tutorial_task() -> Task {
    let mut metadata = Map::new();
    metadata.insert("difficulty".into(), Value::String("easy".into()));
    metadata.insert("category".into(), Value::String("tutorial".into()));

    Task {
        id: TUTORIAL_TASK_ID.into(),
        name: "First Steps".into(),
        description: "Learn the basics by exploring the map".into(),
        status: TaskStatus::Available,
        objectives: vec![Objective {
            id: "move".into(),
            description: "Move around the map".into(),
            current: 0,
            required: 1,
            completed: false,
        }],
        rewards: vec![
            Reward::Credential {
                credential_type: DEFAULT_CREDENTIAL_TYPE.into(),
                metadata,
            },
            Reward::Experience { amount: 100 },
        ],
    }
}

/// Spawn point for the member that brought the room to `members` occupants.
///
/// Cycles through the map's spawn points; a map without spawn points
/// spawns everyone at the origin.
pub fn spawn_position(map: &GameMap, members: usize) -> Position {
    if map.spawn_points.is_empty() {
        return Position::default();
    }
    map.spawn_points[members % map.spawn_points.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_has_available_tutorial() {
        let state = default_game_state();
        assert_eq!(state.status, GameStatus::Waiting);
        assert_eq!(state.map.tiles.len(), TILE_ROWS);
        assert_eq!(state.map.spawn_points.len(), 3);
        assert!(state.events.is_empty());

        let tutorial = state.task(TUTORIAL_TASK_ID).unwrap();
        assert_eq!(tutorial.status, TaskStatus::Available);
        assert_eq!(tutorial.rewards.len(), 2);
    }

    #[test]
    fn spawn_cycles_deterministically() {
        let map = default_map();
        assert_eq!(spawn_position(&map, 1), Position::new(200.0, 200.0));
        assert_eq!(spawn_position(&map, 2), Position::new(300.0, 300.0));
        assert_eq!(spawn_position(&map, 3), Position::new(100.0, 100.0));
        assert_eq!(spawn_position(&map, 4), spawn_position(&map, 1));

        let empty = GameMap {
            spawn_points: Vec::new(),
            ..map
        };
        assert_eq!(spawn_position(&empty, 7), Position::default());
    }

    #[test]
    fn level_grows_every_hundred_points() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(99), 1);
        assert_eq!(level_for_experience(100), 2);
        assert_eq!(level_for_experience(350), 4);
    }
}
