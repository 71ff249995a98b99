use std::sync::Arc;
use std::time::Duration;
use turnstile::{AdmissionGateBuilder, Decision, ManualClock};

fn main() {
    // Simulated time so the demo runs instantly
    let clock = ManualClock::new();
    let gate = AdmissionGateBuilder::new()
        .capacity(4)
        .refill_rate(2.0)
        .sweep_interval(Duration::from_secs(60))
        .idle_threshold(Duration::from_secs(180))
        .clock(Arc::new(clock.clone()))
        .build()
        .expect("valid configuration");

    let clients = ["192.168.1.1", "192.168.1.2", "192.168.1.3"];

    for client in &clients {
        for i in 1..=6 {
            match gate.admit(client) {
                Decision::Allow => println!("{} - request {} allowed", client, i),
                Decision::Reject => println!("{} - request {} BLOCKED (429)", client, i),
            }
        }
        println!();
    }

    clock.advance(Duration::from_millis(500));
    println!("After 0.5s: {} -> {}", clients[0], gate.admit(clients[0]));
    println!("Immediately: {} -> {}", clients[0], gate.admit(clients[0]));

    clock.advance(Duration::from_secs(240));
    println!("\nAfter 4 idle minutes, sweep evicted {} clients", gate.sweep_now());
    println!("{} -> {} (fresh burst)", clients[1], gate.admit(clients[1]));

    println!("\n{}", gate.metrics());
}
