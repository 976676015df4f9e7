use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use duoblock::core::types::{GameAction, Lean, State, MAX_CHUNKS};
use duoblock::core::{GravityResolver, GravityStrategy, Grid, Lock, Offset, Piece};
use duoblock::engine::{Game, GameBuilder, GameConfig, Host};
use duoblock::rules::{StandardCollision, StandardLock};

struct CountingAlloc;

static COUNT_ENABLED: AtomicBool = AtomicBool::new(false);
static ALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNT_ENABLED.load(Ordering::Relaxed) {
            ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if COUNT_ENABLED.load(Ordering::Relaxed) {
            ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        System.realloc(ptr, layout, new_size)
    }
}

// Both tests share the counter, so they run under one lock.
static GATE: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn with_alloc_counting<F: FnOnce()>(f: F) -> usize {
    ALLOC_COUNT.store(0, Ordering::Relaxed);
    COUNT_ENABLED.store(true, Ordering::Relaxed);
    f();
    COUNT_ENABLED.store(false, Ordering::Relaxed);
    ALLOC_COUNT.load(Ordering::Relaxed)
}

/// Drive `game` one transition at a time, dropping each piece somewhere
/// along the grid as soon as it falls
fn play(game: &mut Game, until: u64) {
    let mut acted_in = None;
    while game.cycle() < until && !game.is_lost() {
        if game.current_state() == State::Falling && acted_in != Some(game.cycle()) {
            let cycle = game.cycle();
            let shift = if cycle / 6 % 2 == 0 {
                GameAction::MoveLeft
            } else {
                GameAction::MoveRight
            };
            for _ in 0..cycle % 6 {
                let _ = game.apply_action(shift);
            }
            let _ = game.apply_action(GameAction::TurnCw(Lean::None));
            let _ = game.apply_action(GameAction::Drop);
            acted_in = Some(cycle);
        }
        game.step().unwrap();
        let _ = game.slice();
    }
}

/// Host that skips every delay and records nothing
struct Untimed;

impl Host for Untimed {
    fn should_use_timing_system(&self) -> bool {
        false
    }
}

#[test]
fn resolver_does_not_allocate() {
    let _gate = GATE.lock().unwrap_or_else(|e| e.into_inner());

    let mut grid = Grid::from_ascii(
        6,
        &[
            "......", //
            ".00...",
            "......",
            "...11.",
            "......",
            "#.....",
            "......",
            "0....1",
        ],
    );
    let mut lock = StandardLock::new(8, 6);
    let mut pieces = vec![Piece::with_capacity(8, 6); MAX_CHUNKS];
    let mut start = vec![Offset::default(); MAX_CHUNKS];
    let count = lock.unlock_grid(&mut grid, &mut pieces, &mut start, 0);
    assert_eq!(count, 3);

    let mut offsets = start.clone();
    let mut resolvers = [
        GravityResolver::new(GravityStrategy::General, 8, 6),
        GravityResolver::new(GravityStrategy::Efficient, 8, 6),
        GravityResolver::new(GravityStrategy::SuperEfficient, 8, 6),
    ];

    let allocs = with_alloc_counting(|| {
        for resolver in resolvers.iter_mut() {
            for _ in 0..20 {
                offsets.copy_from_slice(&start);
                resolver
                    .resolve(&StandardCollision, &lock, &grid, &pieces[..count], &mut offsets)
                    .unwrap();
            }
        }
    });

    assert_eq!(allocs, 0);
    assert!(offsets[..count].iter().zip(&start).all(|(a, b)| a.y < b.y));
}

#[test]
fn steady_state_steps_do_not_allocate() {
    let _gate = GATE.lock().unwrap_or_else(|e| e.into_inner());

    let config = GameConfig {
        rows: 40,
        cols: 16,
        seed: 11,
        ..GameConfig::default()
    };
    let mut game = GameBuilder::new(config)
        .host(Box::new(Untimed))
        .build()
        .unwrap();
    game.start();

    // Warm-up outside counting.
    play(&mut game, 12);

    let allocs = with_alloc_counting(|| {
        play(&mut game, 30);
    });

    assert_eq!(allocs, 0);
    assert!(game.cycle() >= 12);
}
