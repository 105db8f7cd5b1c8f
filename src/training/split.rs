use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use super::TrainingError;

/// Index sets produced by [`stratified_split`].
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles each class separately with a seeded RNG and moves
/// `round(class_size * test_fraction)` members of every class to the test
/// set, so both sides keep the corpus class balance.
pub fn stratified_split(
    labels: &[u8],
    test_fraction: f64,
    seed: u64,
) -> Result<Split, TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidTestFraction(test_fraction));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == class)
            .map(|(idx, _)| idx)
            .collect();
        if members.len() < 2 {
            return Err(TrainingError::SingleClass {
                spam: labels.iter().filter(|&&l| l == 1).count(),
                ham: labels.iter().filter(|&&l| l == 0).count(),
            });
        }

        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    tracing::debug!(
        target: "train",
        train = train.len(),
        test = test.len(),
        "stratified split"
    );
    Ok(Split { train, test })
}
