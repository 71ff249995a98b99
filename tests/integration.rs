use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use turnstile::{
    AdmissionGate, AdmissionGateBuilder, Clock, Decision, LimiterConfig, ManualClock,
};

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn manual_gate(config: LimiterConfig) -> (AdmissionGate, ManualClock) {
    let clock = ManualClock::new();
    let gate = AdmissionGate::with_clock(config, Arc::new(clock.clone())).unwrap();
    (gate, clock)
}

#[test]
fn test_capacity_plus_one() {
    for capacity in [1u64, 2, 7, 64] {
        let (gate, _clock) = manual_gate(LimiterConfig::new(capacity, 1.0));

        for i in 0..capacity {
            assert_eq!(
                gate.admit("client"),
                Decision::Allow,
                "call {} of capacity {}",
                i + 1,
                capacity
            );
        }
        assert_eq!(gate.admit("client"), Decision::Reject);
    }
}

#[test]
fn test_refill_after_one_token_interval() {
    let config = LimiterConfig::new(3, 4.0);
    let token_time = config.time_per_token().unwrap();
    let (gate, clock) = manual_gate(config);

    for _ in 0..3 {
        assert!(gate.admit("client").is_allowed());
    }
    assert!(gate.admit("client").is_rejected());

    for _ in 0..5 {
        clock.advance(token_time);
        assert!(gate.admit("client").is_allowed());
        assert!(gate.admit("client").is_rejected());
    }
}

#[test]
fn test_identities_are_independent() {
    let (gate, _clock) = manual_gate(LimiterConfig::new(2, 1.0));

    assert!(gate.admit("A").is_allowed());
    assert!(gate.admit("A").is_allowed());
    assert!(gate.admit("A").is_rejected());

    assert!(gate.admit("B").is_allowed());
    assert!(gate.admit("B").is_allowed());
    assert!(gate.admit("B").is_rejected());
    assert!(gate.admit("A").is_rejected());
}

#[test]
fn test_explicit_time_and_flag() {
    let (gate, clock) = manual_gate(LimiterConfig::new(4, 2.0));
    let t0 = clock.now();

    use Decision::{Allow, Reject};
    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(gate.check("203.0.113.9", true, t0));
    }
    let t1 = t0 + Duration::from_millis(500);
    seen.push(gate.check("203.0.113.9", true, t1));
    seen.push(gate.check("203.0.113.9", true, t1));
    assert_eq!(seen, vec![Allow, Allow, Allow, Allow, Reject, Allow, Reject]);

    // Disabled flag wins regardless of history
    assert_eq!(gate.check("203.0.113.9", false, t1), Allow);
}

#[test]
fn test_eviction_resets_burst_allowance() {
    let config = LimiterConfig::new(3, 0.001)
        .with_idle_threshold(Duration::from_secs(180))
        .with_sweep_interval(Duration::from_secs(60));
    let (gate, clock) = manual_gate(config);

    for _ in 0..3 {
        assert!(gate.admit("client").is_allowed());
    }
    assert!(gate.admit("client").is_rejected());

    // Not yet idle long enough
    clock.advance(Duration::from_secs(120));
    assert_eq!(gate.sweep_now(), 0);

    // The rejected call above was the last activity; 181s have now passed
    clock.advance(Duration::from_secs(61));
    assert_eq!(gate.sweep_now(), 1);
    assert!(!gate.registry().contains("client"));

    for _ in 0..3 {
        assert!(gate.admit("client").is_allowed());
    }
    assert!(gate.admit("client").is_rejected());
}

#[test]
fn test_concurrent_exact_admission() {
    let n = 64usize;
    let (gate, _clock) = manual_gate(LimiterConfig::new(n as u64, 1.0));
    let gate = Arc::new(gate);
    let barrier = Arc::new(Barrier::new(n));

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let gate = gate.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                gate.admit("same-client")
            })
        })
        .collect();

    let decisions: Vec<Decision> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let allowed = decisions.iter().filter(|d| d.is_allowed()).count();

    assert_eq!(allowed, n);
    assert_eq!(decisions.len() - allowed, 0);
    assert!(gate.admit("same-client").is_rejected());
}

#[test]
fn test_many_clients_under_contention() {
    let (gate, _clock) = manual_gate(LimiterConfig::new(5, 1.0));
    let gate = Arc::new(gate);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let gate = gate.clone();
            thread::spawn(move || {
                let mut allowed = 0;
                for client in 0..100 {
                    // Every thread hits every client; each bucket holds 5
                    let identity = format!("10.0.{}.{}", client % 7, client);
                    if gate.admit(&identity).is_allowed() {
                        allowed += 1;
                    }
                }
                (t, allowed)
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap().1).sum();

    // 100 clients x 5 tokens, 800 attempts
    assert_eq!(total, 500);
    let metrics = gate.metrics();
    assert_eq!(metrics.active_clients, 100);
    assert_eq!(metrics.total_allowed, 500);
    assert_eq!(metrics.total_rejected, 300);
}

#[test]
fn test_reaper_lifecycle() {
    let clock = ManualClock::new();
    let gate = Arc::new(
        AdmissionGateBuilder::new()
            .capacity(10)
            .refill_rate(10.0)
            .sweep_interval(Duration::from_millis(20))
            .idle_threshold(Duration::from_secs(180))
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap(),
    );

    // Phase 1: 50 clients show up
    for i in 0..50 {
        assert!(gate.admit(&format!("192.168.1.{}", i)).is_allowed());
    }
    assert_eq!(gate.registry().len(), 50);

    // Phase 2: start the reaper
    let reaper = gate.spawn_reaper().unwrap();
    thread::sleep(Duration::from_millis(80));
    assert_eq!(gate.registry().len(), 50);

    // Phase 3: two minutes pass, ten clients stay active
    clock.advance(Duration::from_secs(120));
    for i in 0..10 {
        let _ = gate.admit(&format!("192.168.1.{}", i));
    }

    // Phase 4: another two minutes; the silent forty are now idle
    clock.advance(Duration::from_secs(120));
    assert!(wait_until(Duration::from_secs(5), || gate.registry().len() == 10));

    assert_eq!(gate.registry().len(), 10);
    assert!(gate.registry().contains("192.168.1.0"));
    assert!(!gate.registry().contains("192.168.1.49"));

    // Phase 5: stop
    reaper.stop().unwrap();

    let metrics = gate.metrics();
    assert_eq!(metrics.total_created, 50);
    assert_eq!(metrics.total_evicted, 40);
}

#[test]
fn test_sustained_rate_real_clock() {
    let gate = Arc::new(
        AdmissionGate::new(LimiterConfig::new(10, 100.0)).unwrap(),
    );

    let started = std::time::Instant::now();
    let mut allowed = 0u64;
    while started.elapsed() < Duration::from_millis(500) {
        if gate.admit("steady").is_allowed() {
            allowed += 1;
        }
        thread::sleep(Duration::from_millis(1));
    }
    let elapsed = started.elapsed().as_secs_f64();

    // Burst of 10 plus at most 100/s over the elapsed time
    let ceiling = 10.0 + 100.0 * elapsed + 1.0;
    assert!(allowed as f64 <= ceiling, "allowed {} > {}", allowed, ceiling);
    assert!(allowed > 10);
}
