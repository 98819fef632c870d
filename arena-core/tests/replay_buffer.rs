use arena_core::replay_buffer::{PrioritizedReplayBuffer, PRIORITY_EPS};

fn add(buffer: &mut PrioritizedReplayBuffer, v: f32) {
    buffer.add(vec![v, -v], vec![1.0, 0.0, 1.0], v as f64, vec![v + 1.0, -v - 1.0], false);
}

fn filled(capacity: usize, n: usize) -> PrioritizedReplayBuffer {
    let mut buffer = PrioritizedReplayBuffer::new(capacity, 42).unwrap();
    for i in 0..n {
        add(&mut buffer, i as f32);
    }
    buffer
}

#[test]
fn test_capacity_invariant() {
    let mut buffer = PrioritizedReplayBuffer::new(7, 0).unwrap();
    for i in 0..20 {
        add(&mut buffer, i as f32);
        assert_eq!(buffer.len(), (i + 1).min(7));
        assert_eq!(buffer.priorities().len(), buffer.entries().len());
        assert!(buffer.cursor() < buffer.capacity());
    }
}

#[test]
fn test_fifo_eviction() {
    let mut buffer = PrioritizedReplayBuffer::new(3, 0).unwrap();
    for i in 1..=5 {
        add(&mut buffer, i as f32);
    }
    let rewards: Vec<f64> = buffer.entries().iter().map(|t| t.reward).collect();
    assert_eq!(rewards, vec![4.0, 5.0, 3.0]);
    assert_eq!(buffer.cursor(), 2);
}

#[test]
fn test_uniform_at_alpha_zero() {
    let mut buffer = filled(4, 4);
    buffer.update_priorities(&[0, 1, 2, 3], &[100.0, 0.001, 5.0, 0.0]);

    let n = 40_000;
    let batch = buffer.sample(n, 0.0, 0.7);
    let mut counts = [0usize; 4];
    for &ix in batch.indices.iter() {
        counts[ix] += 1;
    }
    for c in counts.iter() {
        let freq = *c as f64 / n as f64;
        assert!((freq - 0.25).abs() < 0.02, "{:?}", counts);
    }
    assert!(batch.weights.iter().all(|&w| (w - 1.0).abs() < 1e-12));
}

#[test]
fn test_importance_weights_bounded() {
    let mut buffer = filled(16, 16);
    let indices: Vec<usize> = (0..16).collect();
    let errors: Vec<f64> = (0..16).map(|i| (i as f64 * 0.37).sin() * 3.0).collect();
    buffer.update_priorities(&indices, &errors);

    for beta in [0.0, 0.4, 1.0] {
        let batch = buffer.sample(64, 0.6, beta);
        assert_eq!(batch.len(), 64);
        assert_eq!(batch.weights.len(), 64);
        let w_max = batch.weights.iter().copied().fold(f64::MIN, f64::max);
        assert_eq!(w_max, 1.0);
        assert!(batch.weights.iter().all(|&w| w > 0.0 && w <= 1.0));
    }
}

#[test]
fn test_empty_buffer_samples_nothing() {
    let mut buffer = PrioritizedReplayBuffer::new(8, 0).unwrap();
    assert!(buffer.sample(32, 0.6, 0.4).is_empty());
    assert!(buffer.sample_mixed(32, 0.5, 0.6, 0.4).is_empty());
}

#[test]
fn test_priority_update_law() {
    let mut buffer = filled(4, 4);
    buffer.update_priorities(&[0, 2, 0], &[0.5, -1.5, 2.0]);
    assert_eq!(buffer.priorities()[0], 2.0 + PRIORITY_EPS);
    assert_eq!(buffer.priorities()[2], 1.5 + PRIORITY_EPS);
    assert_eq!(buffer.priorities()[1], 1.0);

    // The new maximum is given to new entries.
    let mut buffer = filled(5, 4);
    buffer.update_priorities(&[3], &[-7.0]);
    add(&mut buffer, 10.0);
    assert_eq!(buffer.priorities()[4], 7.0 + PRIORITY_EPS);
}

#[test]
fn test_serialized_round_trip() {
    let mut buffer = filled(5, 8);
    buffer.update_priorities(&[1, 4], &[0.25, 3.0]);

    let json = serde_json::to_string(&buffer).unwrap();
    let mut restored: PrioritizedReplayBuffer = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.capacity(), buffer.capacity());
    assert_eq!(restored.cursor(), buffer.cursor());
    assert_eq!(restored.entries(), buffer.entries());
    assert_eq!(restored.priorities(), buffer.priorities());
    assert_eq!(restored.max_priority(), buffer.max_priority());

    add(&mut buffer, 20.0);
    add(&mut restored, 20.0);
    assert_eq!(restored.entries(), buffer.entries());
    assert_eq!(restored.priorities(), buffer.priorities());
}

#[test]
fn test_prioritized_draws() {
    let mut buffer = filled(4, 4);
    buffer.update_priorities(&[0, 1, 2, 3], &[0.1, 0.9, 0.05, 0.5]);
    let expected = [0.10001, 0.90001, 0.05001, 0.50001];
    for (p, e) in buffer.priorities().iter().zip(expected.iter()) {
        assert!((p - e).abs() < 1e-12);
    }

    let batch = buffer.sample(1000, 0.6, 0.4);
    let n1 = batch.indices.iter().filter(|&&ix| ix == 1).count();
    assert!(n1 > 250, "index 1 drawn {} times", n1);

    // The most frequent index has the smallest weight.
    let pos = batch.indices.iter().position(|&ix| ix == 1).unwrap();
    assert!(batch
        .weights
        .iter()
        .all(|&w| w >= batch.weights[pos] - 1e-12));
}

#[test]
fn test_draw_frequencies_follow_priorities() {
    let mut buffer = filled(4, 4);
    assert_eq!(buffer.priorities(), &[1.0; 4]);

    buffer.update_priorities(&[0, 1, 2, 3], &[0.1, 0.9, 0.05, 0.5]);
    let priorities = buffer.priorities().to_vec();
    let total: f64 = priorities.iter().sum();

    let n = 1000;
    let batch = buffer.sample(n, 1.0, 0.0);
    assert_eq!(batch.len(), n);
    assert!(batch.weights.iter().all(|&w| w == 1.0));

    let mut counts = [0usize; 4];
    for &ix in batch.indices.iter() {
        counts[ix] += 1;
    }
    assert!(counts[1] > n / 4, "{:?}", counts);
    for (c, p) in counts.iter().zip(priorities.iter()) {
        let freq = *c as f64 / n as f64;
        assert!((freq - p / total).abs() < 0.05, "{:?}", counts);
    }
}
