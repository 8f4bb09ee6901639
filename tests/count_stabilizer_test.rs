//! Debounce behaviour of the count stabilizer

use inmoov_vision::count_stabilizer::{CountStabilizer, Retrigger, StabilizerState};
use proptest::prelude::*;

fn run(stabilizer: &CountStabilizer, frames: &[Vec<u32>]) -> Vec<(usize, String)> {
    let mut state = StabilizerState::new();
    frames
        .iter()
        .enumerate()
        .filter_map(|(i, counts)| stabilizer.update(&mut state, counts).map(|text| (i, text)))
        .collect()
}

#[test]
fn test_single_hand_announces_on_third_frame() {
    let frames = vec![vec![2], vec![2], vec![2]];
    assert_eq!(run(&CountStabilizer::default(), &frames), vec![(2, "2".to_string())]);
}

#[test]
fn test_multi_hand_announcement() {
    let frames = vec![vec![2, 3, 1]; 3];
    assert_eq!(
        run(&CountStabilizer::default(), &frames),
        vec![(2, "2 plus 3 plus 1 equals 6".to_string())]
    );
}

#[test]
fn test_multi_hand_compares_totals() {
    // Different splits of the same total keep the run going
    let frames = vec![vec![2, 3], vec![3, 2], vec![1, 4]];
    assert_eq!(
        run(&CountStabilizer::default(), &frames),
        vec![(2, "1 plus 4 equals 5".to_string())]
    );
}

#[test]
fn test_zero_matches_clear_history() {
    let stabilizer = CountStabilizer::default();
    let mut state = StabilizerState::new();
    stabilizer.update(&mut state, &[3]);
    stabilizer.update(&mut state, &[3]);
    assert_eq!(stabilizer.update(&mut state, &[]), None);
    assert!(state.window().is_empty());
    assert_eq!(state.run_length(), 0);

    // The run starts over after the blank frame
    assert_eq!(stabilizer.update(&mut state, &[3]), None);
    assert_eq!(stabilizer.update(&mut state, &[3]), None);
    assert_eq!(stabilizer.update(&mut state, &[3]).as_deref(), Some("3"));
}

#[test]
fn test_new_run_after_change_announces_again() {
    let frames = vec![vec![1], vec![1], vec![1], vec![2], vec![2], vec![2], vec![1], vec![1], vec![1]];
    let said: Vec<String> = run(&CountStabilizer::default(), &frames)
        .into_iter()
        .map(|(_, text)| text)
        .collect();
    assert_eq!(said, vec!["1", "2", "1"]);
}

#[test]
fn test_longer_required_run() {
    let stabilizer = CountStabilizer::new(5, Retrigger::OncePerRun);
    let frames = vec![vec![4]; 6];
    assert_eq!(run(&stabilizer, &frames), vec![(4, "4".to_string())]);
}

proptest! {
    #[test]
    fn test_window_holds_only_identical_readings(readings in prop::collection::vec(0u32..4, 0..60)) {
        let stabilizer = CountStabilizer::default();
        let mut state = StabilizerState::new();
        for reading in readings {
            let counts: Vec<u32> = if reading == 0 { Vec::new() } else { vec![reading] };
            stabilizer.update(&mut state, &counts);
            prop_assert!(state.window().len() <= stabilizer.required_run());
            if let Some(&first) = state.window().front() {
                prop_assert!(state.window().iter().all(|&r| r == first));
            }
        }
    }

    #[test]
    fn test_once_per_run_never_repeats_back_to_back(readings in prop::collection::vec(1u32..3, 0..60)) {
        let stabilizer = CountStabilizer::default();
        let mut state = StabilizerState::new();
        let mut last_announced_at: Option<usize> = None;
        for (i, reading) in readings.iter().enumerate() {
            if stabilizer.update(&mut state, &[*reading]).is_some() {
                if let Some(previous) = last_announced_at {
                    prop_assert!(i - previous >= stabilizer.required_run());
                }
                last_announced_at = Some(i);
            }
        }
    }
}
