//! Traffic Light State Machine
//!
//! This example demonstrates a cyclic machine driven frame by frame.
//!
//! Key concepts:
//! - Cyclic state transitions (states repeat)
//! - Guarded wires (each light holds for a number of frames)
//! - Update callbacks requesting the next state
//! - Driving machines through a Runner
//!
//! Run with: cargo run --example traffic_light

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use wirestate::engine::{StateMachine, TransitionMode};
use wirestate::runner::Runner;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum TrafficLight {
    Red,
    Green,
    Yellow,
}

impl TrafficLight {
    fn next(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }

    fn hold_frames(self) -> u32 {
        match self {
            Self::Red => 3,
            Self::Green => 3,
            Self::Yellow => 1,
        }
    }
}

fn main() {
    println!("=== Traffic Light State Machine ===\n");

    let light = Arc::new(StateMachine::new(TransitionMode::Immediate, false));
    let frames = Arc::new(AtomicU32::new(0));

    for color in [TrafficLight::Red, TrafficLight::Green, TrafficLight::Yellow] {
        let (entered, ticked) = (Arc::clone(&frames), Arc::clone(&frames));
        light
            .state(color)
            .on_enter(move |_| {
                entered.store(0, Ordering::SeqCst);
                println!("  -> {color:?}");
                Ok(())
            })
            .on_update(move |machine| {
                ticked.fetch_add(1, Ordering::SeqCst);
                // Guarded wires reject the request until the hold time is up.
                let _ = machine.request_transition(color.next());
                Ok(())
            });

        let held = Arc::clone(&frames);
        light
            .wire(color, color.next())
            .on_condition(move || held.load(Ordering::SeqCst) >= color.hold_frames());
    }

    println!(
        "Declared {} states and {} wires",
        light.state_count(),
        light.wire_count()
    );
    println!("Graph valid: {}\n", light.validate().is_success());

    let mut runner = Runner::new();
    runner.add(light.clone());

    light
        .request_transition(TrafficLight::Red)
        .expect("first transition needs no wire");

    println!("Running 16 frames:");
    for _ in 0..16 {
        for error in runner.tick_all() {
            eprintln!("  tick failed: {error:#}");
        }
    }

    println!("\nFinal state: {:?}", light.current_key());
    println!("Transitions committed: {}", light.snapshot().commits);

    println!("\nKey Characteristics:");
    println!("- Wires only allow Red -> Green -> Yellow -> Red");
    println!("- Conditions are re-checked on every request");
    println!("- No final state (cycles indefinitely)");

    println!("\n=== Example Complete ===");
}
