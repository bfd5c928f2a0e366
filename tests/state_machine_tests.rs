//! State machine tests - lifecycle, budgets and deadlock recovery

use tile_blast::{
    Archetype, BoardEvents, ColorId, GameEvents, GamePhase, GameStateMachine, LevelConfig,
    NullEvents, SelectOutcome,
};

#[derive(Default)]
struct Recorder {
    states: Vec<(GamePhase, GamePhase)>,
    budgets: Vec<(Option<u32>, Option<u32>)>,
    cleared: Vec<(ColorId, usize)>,
    statics: Vec<(ColorId, usize, usize)>,
}

impl BoardEvents for Recorder {
    fn group_cleared(&mut self, color: ColorId, size: usize) {
        self.cleared.push((color, size));
    }

    fn static_collected(&mut self, color: ColorId, collected: usize, total: usize) {
        self.statics.push((color, collected, total));
    }
}

impl GameEvents for Recorder {
    fn state_changed(&mut self, from: GamePhase, to: GamePhase) {
        self.states.push((from, to));
    }

    fn budget_changed(&mut self, moves_left: Option<u32>, time_left_ms: Option<u32>) {
        self.budgets.push((moves_left, time_left_ms));
    }
}

fn small_config() -> LevelConfig {
    LevelConfig {
        columns: 5,
        rows: 5,
        colors: 3,
        icons: vec![0, 1, 2],
        ..LevelConfig::default()
    }
}

fn started_machine(config: LevelConfig) -> GameStateMachine {
    let mut machine = GameStateMachine::new(config).unwrap();
    machine.start(&mut NullEvents);
    machine.complete_all_drops(&mut NullEvents);
    assert_eq!(machine.phase(), GamePhase::WaitingInput);
    machine
}

/// Park the machine on a hand-built board: two adjacent color-0 tiles plus
/// whatever `extra` places, everything else empty.
fn scripted_board(
    machine: &mut GameStateMachine,
    extra: impl FnOnce(&mut tile_blast::BoardEngine),
) {
    let engine = machine.engine_mut();
    engine.clear_board();
    engine.place_tile(0, 4, 0, Archetype::Regular);
    engine.place_tile(1, 4, 0, Archetype::Regular);
    extra(engine);
    engine.rebuild_groups();
}

#[test]
fn test_lifecycle_generate_spawn_waiting() {
    let mut rec = Recorder::default();
    let mut machine = GameStateMachine::new(small_config()).unwrap();
    machine.start(&mut rec);

    assert_eq!(rec.states[0], (GamePhase::GenerateLevel, GamePhase::SpawningBlocks));
    assert_eq!(machine.pending_drops(), 25);

    machine.complete_all_drops(&mut rec);
    assert_eq!(machine.phase(), GamePhase::WaitingInput);
    assert_eq!(
        rec.states.last().copied().unwrap().1,
        GamePhase::WaitingInput
    );
}

#[test]
fn test_valid_selection_runs_fall_and_spawn_round() {
    let mut machine = started_machine(small_config());
    scripted_board(&mut machine, |_| {});

    let mut rec = Recorder::default();
    let origin = machine.engine().board().index_of(0, 4).unwrap();
    let outcome = machine.select(origin, &mut rec);

    assert!(matches!(outcome, SelectOutcome::GroupCleared { size: 2, .. }));
    assert_eq!(rec.cleared, vec![(0, 2)]);

    // selection cascades WaitingInput -> Falling -> SpawningBlocks and then
    // waits for the refill batch to drop
    let phases: Vec<GamePhase> = rec.states.iter().map(|&(_, to)| to).collect();
    assert_eq!(
        phases,
        vec![GamePhase::Falling, GamePhase::SpawningBlocks]
    );
    assert_eq!(machine.phase(), GamePhase::SpawningBlocks);
    assert_eq!(machine.pending_drops(), 25);

    machine.complete_all_drops(&mut rec);
    assert_eq!(machine.phase(), GamePhase::WaitingInput);
    assert_eq!(machine.engine().pool().live_count(), 25);
}

#[test]
fn test_invalid_selection_stays_in_waiting() {
    let mut machine = started_machine(small_config());
    scripted_board(&mut machine, |engine| {
        engine.place_tile(4, 0, 1, Archetype::Regular);
    });

    let mut rec = Recorder::default();
    let loner = machine.engine().board().index_of(4, 0).unwrap();
    assert_eq!(machine.select(loner, &mut rec), SelectOutcome::Invalid);

    assert!(rec.states.is_empty());
    assert!(rec.budgets.is_empty());
    assert_eq!(machine.phase(), GamePhase::WaitingInput);
}

#[test]
fn test_move_budget_reaches_lose() {
    let mut config = small_config();
    config.move_limit = Some(1);
    let mut machine = started_machine(config);
    scripted_board(&mut machine, |_| {});

    let mut rec = Recorder::default();
    let origin = machine.engine().board().index_of(0, 4).unwrap();
    machine.select(origin, &mut rec);

    assert_eq!(machine.phase(), GamePhase::Lose);
    assert_eq!(rec.budgets, vec![(Some(0), None)]);
    assert_eq!(
        rec.states.last().copied().unwrap(),
        (GamePhase::WaitingInput, GamePhase::Lose)
    );

    // terminal: no more play
    assert_eq!(machine.select(origin, &mut rec), SelectOutcome::Invalid);
}

#[test]
fn test_collecting_last_static_wins() {
    let mut machine = started_machine(small_config());
    scripted_board(&mut machine, |engine| {
        engine.place_tile(2, 4, 1, Archetype::Static);
    });
    assert_eq!(machine.engine().statics_total(), 1);

    let mut rec = Recorder::default();
    let origin = machine.engine().board().index_of(1, 4).unwrap();
    machine.select(origin, &mut rec);

    assert_eq!(machine.phase(), GamePhase::Win);
    assert_eq!(rec.statics, vec![(1, 1, 1)]);
    assert_eq!(
        rec.states.last().copied().unwrap(),
        (GamePhase::WaitingInput, GamePhase::Win)
    );
}

#[test]
fn test_deadlock_recovery_round_trip() {
    let mut machine = started_machine(small_config());

    // hand-build a deadlocked full board
    {
        let engine = machine.engine_mut();
        engine.clear_board();
        for y in 0..5 {
            for x in 0..5 {
                let color = ((x + 2 * y) % 3) as ColorId;
                engine.place_tile(x as i32, y as i32, color, Archetype::Regular);
            }
        }
        engine.rebuild_groups();
    }
    assert!(!machine.engine().has_valid_move());

    let mut rec = Recorder::default();
    machine.check_deadlock(&mut rec);

    // the machine dipped into Deadlock and recovered with a playable board
    assert_eq!(machine.phase(), GamePhase::WaitingInput);
    assert!(machine.engine().has_valid_move());
    let phases: Vec<GamePhase> = rec.states.iter().map(|&(_, to)| to).collect();
    assert_eq!(phases, vec![GamePhase::Deadlock, GamePhase::WaitingInput]);
}

#[test]
fn test_deadlock_after_spawn_resolution() {
    // colors=6 on a tiny board makes an all-distinct refill plausible; force
    // it deterministically instead by scripting the board mid-spawn is not
    // possible, so drive the recovery through check_deadlock on a sparse
    // non-adjacent layout where shuffle fails and regeneration kicks in.
    let mut machine = started_machine(LevelConfig {
        columns: 4,
        rows: 4,
        colors: 6,
        icons: vec![0, 1, 2, 3, 4, 5],
        ..LevelConfig::default()
    });

    {
        let engine = machine.engine_mut();
        engine.clear_board();
        engine.place_tile(0, 0, 0, Archetype::Regular);
        engine.place_tile(2, 1, 1, Archetype::Regular);
        engine.place_tile(0, 3, 2, Archetype::Regular);
        engine.rebuild_groups();
    }

    let mut rec = Recorder::default();
    machine.check_deadlock(&mut rec);

    // shuffle could not help (no color pair), regeneration saved the round
    assert_eq!(machine.phase(), GamePhase::WaitingInput);
    assert!(machine.engine().has_valid_move());
    assert_eq!(machine.engine().pool().live_count(), 16);
}

#[test]
fn test_budget_events_on_tick() {
    let mut config = small_config();
    config.time_limit_ms = Some(2_000);
    let mut machine = started_machine(config);

    let mut rec = Recorder::default();
    machine.tick(500, &mut rec);
    assert_eq!(rec.budgets, vec![(None, Some(1_500))]);
    assert_eq!(machine.phase(), GamePhase::WaitingInput);
}

#[test]
fn test_pause_round_trip_events() {
    let mut machine = started_machine(small_config());

    let mut rec = Recorder::default();
    machine.pause(&mut rec);
    machine.resume(&mut rec);

    assert_eq!(
        rec.states,
        vec![
            (GamePhase::WaitingInput, GamePhase::Pause),
            (GamePhase::Pause, GamePhase::WaitingInput),
        ]
    );
}
