//! Timing and phase behaviour of the beat scheduler, driven by a manual clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use metronome::{
    BeatEvent, BeatScheduler, Clock, IntervalTimer, ManualClock, MetronomeError, TimeSignature,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type TestScheduler = BeatScheduler<IntervalTimer<ManualClock>>;

struct Harness {
    clock: ManualClock,
    scheduler: TestScheduler,
    beats: Rc<RefCell<Vec<(u64, BeatEvent)>>>,
}

impl Harness {
    fn new() -> Self {
        let clock = ManualClock::new();
        let mut scheduler = BeatScheduler::new(IntervalTimer::new(clock.clone()));
        let beats = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&beats);
        let stamp = clock.clone();
        scheduler.on_beat(move |event| {
            sink.borrow_mut().push((stamp.now().as_millis() as u64, *event));
        });
        Self {
            clock,
            scheduler,
            beats,
        }
    }

    /// Advances one millisecond at a time, pumping like a host loop would.
    fn run_for(&mut self, ms: u64) {
        for _ in 0..ms {
            self.clock.advance_ms(1);
            self.scheduler.pump();
        }
    }

    fn phases(&self) -> Vec<u32> {
        self.beats.borrow().iter().map(|(_, e)| e.phase).collect()
    }

    fn first_flags(&self) -> Vec<bool> {
        self.beats.borrow().iter().map(|(_, e)| e.is_first_beat).collect()
    }

    fn times(&self) -> Vec<u64> {
        self.beats.borrow().iter().map(|(t, _)| *t).collect()
    }
}

#[test]
fn test_every_valid_tempo_sets_truncated_interval() {
    let mut h = Harness::new();
    for bpm in 30..=240u32 {
        h.scheduler.set_tempo(bpm).unwrap();
        assert_eq!(h.scheduler.tempo().bpm(), bpm);
        assert_eq!(h.scheduler.interval(), Duration::from_millis(60_000 / bpm as u64));
    }
}

#[test]
fn test_invalid_tempos_leave_state_unchanged() {
    let mut h = Harness::new();
    h.scheduler.set_tempo(100).unwrap();
    h.scheduler.set_time_signature(TimeSignature::FiveFour);
    h.scheduler.start();

    for bpm in (0..30u32).chain(241..=400).chain([u32::MAX]) {
        let err = h.scheduler.set_tempo(bpm).unwrap_err();
        assert_eq!(
            err,
            MetronomeError::OutOfRange {
                bpm,
                min: 30,
                max: 240
            }
        );
        assert_eq!(h.scheduler.tempo().bpm(), 100);
        assert_eq!(h.scheduler.time_signature(), TimeSignature::FiveFour);
        assert!(h.scheduler.is_running());
    }
}

#[test]
fn test_four_four_cycles_with_accent_on_one() {
    let mut h = Harness::new();
    h.scheduler.set_tempo(240).unwrap();
    h.scheduler.start();
    h.run_for(250 * 10);

    assert_eq!(h.phases(), vec![1, 2, 3, 4, 1, 2, 3, 4, 1, 2]);
    for (phase, first) in h.phases().into_iter().zip(h.first_flags()) {
        assert_eq!(first, phase == 1);
    }
}

#[test]
fn test_waltz_at_120() {
    let mut h = Harness::new();
    h.scheduler.set_tempo(120).unwrap();
    h.scheduler.set_time_signature(TimeSignature::ThreeFour);
    h.scheduler.start();
    h.run_for(3000);

    assert_eq!(h.phases(), vec![1, 2, 3, 1, 2, 3]);
    assert_eq!(h.first_flags(), vec![true, false, false, true, false, false]);
    assert_eq!(h.times(), vec![500, 1000, 1500, 2000, 2500, 3000]);
}

#[test]
fn test_61_bpm_truncates_to_983ms() {
    let mut h = Harness::new();
    h.scheduler.set_tempo(61).unwrap();
    assert_eq!(h.scheduler.interval(), Duration::from_millis(983));

    h.scheduler.start();
    h.run_for(983 * 3);
    assert_eq!(h.times(), vec![983, 1966, 2949]);
}

#[test]
fn test_signature_change_restarts_measure_from_any_phase() {
    for beats_before in 1..=6u64 {
        for sig in TimeSignature::ALL {
            let mut h = Harness::new();
            h.scheduler.set_tempo(240).unwrap();
            h.scheduler.set_time_signature(TimeSignature::SixEight);
            h.scheduler.start();
            h.run_for(250 * beats_before);

            h.scheduler.set_time_signature(sig);
            h.run_for(250);

            let last = h.beats.borrow().last().map(|(_, e)| *e).unwrap();
            assert_eq!(
                last,
                BeatEvent {
                    phase: 1,
                    is_first_beat: true
                },
                "after {} beats, switching to {}",
                beats_before,
                sig
            );
        }
    }
}

#[test]
fn test_signature_change_does_not_tick() {
    let mut h = Harness::new();
    h.scheduler.start();
    h.run_for(1500);
    assert_eq!(h.beats.borrow().len(), 1);

    h.scheduler.set_time_signature(TimeSignature::ThreeFour);
    h.scheduler.pump();
    assert_eq!(h.beats.borrow().len(), 1);

    // The pending beat keeps its deadline.
    h.run_for(500);
    assert_eq!(h.times(), vec![1000, 2000]);
}

#[test]
fn test_stop_start_preserves_phase_and_skips_stopped_time() {
    let mut h = Harness::new();
    h.scheduler.set_tempo(120).unwrap();
    h.scheduler.start();
    h.run_for(1000);
    assert_eq!(h.phases(), vec![1, 2]);

    h.scheduler.stop();
    h.run_for(5000);
    assert_eq!(h.phases(), vec![1, 2]);
    assert_eq!(h.scheduler.phase(), Some(2));

    h.scheduler.start();
    h.run_for(499);
    assert_eq!(h.phases().len(), 2);
    h.run_for(1);
    assert_eq!(h.phases(), vec![1, 2, 3]);
    assert_eq!(h.times().last().copied(), Some(6500));
}

#[test]
fn test_tempo_change_while_running_does_not_replay_missed_beat() {
    let mut h = Harness::new();
    h.scheduler.set_tempo(60).unwrap();
    h.scheduler.start();
    h.run_for(1000);

    h.run_for(800);
    h.scheduler.set_tempo(240).unwrap();
    h.run_for(250);
    assert_eq!(h.times(), vec![1000, 2050]);
}

#[test]
fn test_random_operation_sequences_keep_phase_in_bounds() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..20 {
        let mut h = Harness::new();
        let mut expected_next = 1u32;
        let mut seen = 0usize;

        for _ in 0..200 {
            match rng.gen_range(0..10) {
                0 => {
                    let sig = TimeSignature::ALL[rng.gen_range(0..TimeSignature::ALL.len())];
                    h.scheduler.set_time_signature(sig);
                    expected_next = 1;
                }
                1 => {
                    let bpm = rng.gen_range(0..300u32);
                    let before = h.scheduler.tempo();
                    let result = h.scheduler.set_tempo(bpm);
                    assert_eq!(result.is_ok(), (30..=240).contains(&bpm));
                    if result.is_err() {
                        assert_eq!(h.scheduler.tempo(), before);
                    }
                }
                2 => h.scheduler.stop(),
                3 => h.scheduler.start(),
                _ => h.run_for(rng.gen_range(1..600)),
            }

            let beats = h.beats.borrow();
            let per_measure = h.scheduler.time_signature().beats_per_measure();
            for (_, event) in &beats[seen..] {
                assert_eq!(event.phase, expected_next);
                assert_eq!(event.is_first_beat, event.phase == 1);
                expected_next = if event.phase == per_measure { 1 } else { event.phase + 1 };
            }
            seen = beats.len();

            if let Some(phase) = h.scheduler.phase() {
                assert!((1..=per_measure).contains(&phase));
            }
        }
    }
}
