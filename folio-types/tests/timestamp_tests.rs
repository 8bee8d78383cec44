use folio_types::{MonotonicClock, now_millis};
use proptest::prelude::*;

#[test]
fn now_millis_is_after_2020() {
    assert!(now_millis() > 1_577_836_800_000);
}

#[test]
fn tick_uses_wall_clock_when_it_moved_forward() {
    let clock = MonotonicClock::starting_after(1_000);
    assert_eq!(clock.tick_at(5_000), 5_000);
    assert_eq!(clock.last(), 5_000);
}

#[test]
fn tick_bumps_when_wall_clock_stalls() {
    let clock = MonotonicClock::new();
    assert_eq!(clock.tick_at(2_000), 2_000);
    assert_eq!(clock.tick_at(2_000), 2_001);
    assert_eq!(clock.tick_at(1_500), 2_002);
}

#[test]
fn observe_raises_the_floor() {
    let clock = MonotonicClock::new();
    clock.observe(10_000);
    assert_eq!(clock.tick_at(9_000), 10_001);
    clock.observe(5);
    assert_eq!(clock.last(), 10_001);
}

#[test]
fn rapid_ticks_never_repeat() {
    let clock = MonotonicClock::new();
    let mut seen: Vec<i64> = (0..500).map(|_| clock.tick()).collect();
    let len = seen.len();
    seen.dedup();
    assert_eq!(seen.len(), len);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

proptest! {
    #[test]
    fn ticks_strictly_increase_for_any_wall_clock(nows in prop::collection::vec(0i64..10_000, 1..50)) {
        let clock = MonotonicClock::new();
        let mut last = i64::MIN;
        for now in nows {
            let ts = clock.tick_at(now);
            prop_assert!(ts > last);
            prop_assert!(ts >= now);
            last = ts;
        }
    }
}
