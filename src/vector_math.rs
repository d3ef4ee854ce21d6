use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::core::errors::RagError;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, RagError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(RagError::InvalidInput(
            "Vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(RagError::InvalidInput(format!(
            "Vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let query_view = ArrayView1::from(query);
    let candidate_view = ArrayView1::from(candidate);

    let dot = query_view.dot(&candidate_view);
    let denom = l2_norm(query_view) * l2_norm(candidate_view);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}

/// Stable descending sort by score; NaN sorts last.
pub fn sort_scores_descending<T, F>(items: &mut [T], score: F)
where
    F: Fn(&T) -> f32,
{
    items.sort_by(|left, right| {
        let (l, r) = (score(left), score(right));
        match (l.is_nan(), r.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => r.partial_cmp(&l).unwrap_or(Ordering::Equal),
        }
    });
}

/// Scales `vector` to unit length in place; zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = l2_norm(ArrayView1::from(&*vector));
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

fn l2_norm(view: ArrayView1<'_, f32>) -> f32 {
    view.dot(&view).sqrt()
}
