pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 0 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f64>()
                / count as f64;

            Some(variance.sqrt())
        }
        _ => None,
    }
}

/// Index and value of the quickest time; the earliest wins a tie.
pub fn fastest(data: &[f64]) -> Option<(usize, f64)> {
    data.iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, value)| match best {
            Some((_, best_value)) if best_value <= value => best,
            _ => Some((idx, value)),
        })
}
