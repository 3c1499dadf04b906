/// Cosine similarity of two vectors; 0.0 when either has zero length
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Greedy maximal marginal relevance.
///
/// Returns the indices of up to `k` candidates, starting with the one most
/// similar to `query` and then repeatedly taking the candidate maximising
/// `lambda_mult * sim(query, c) - (1 - lambda_mult) * max sim(c, selected)`.
#[inline]
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda_mult: f32,
) -> Vec<usize> {
    let limit = k.min(candidates.len());
    if limit == 0 {
        return Vec::new();
    }

    let query_similarity: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut selected = Vec::with_capacity(limit);
    let Some(first) = argmax(query_similarity.iter().copied().enumerate()) else {
        return selected;
    };
    selected.push(first);

    while selected.len() < limit {
        let scores = (0..candidates.len())
            .filter(|i| !selected.contains(i))
            .map(|i| {
                let redundancy = selected
                    .iter()
                    .map(|&j| cosine_similarity(&candidates[i], &candidates[j]))
                    .fold(f32::NEG_INFINITY, f32::max);
                let score =
                    lambda_mult.mul_add(query_similarity[i], -(1.0 - lambda_mult) * redundancy);
                (i, score)
            });

        match argmax(scores) {
            Some(best) => selected.push(best),
            None => break,
        }
    }

    selected
}

/// First index holding the highest score
fn argmax(scores: impl Iterator<Item = (usize, f32)>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, score) in scores {
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}
