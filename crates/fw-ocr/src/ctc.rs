//! CTC greedy decoding of recognition logits.
//!
//! The model emits `[T, C]` logits where class 0 is the CTC blank and the
//! remaining classes index the glyph dictionary. Greedy decoding collapses
//! consecutive duplicate argmax classes and drops blanks.

/// Decode a `[T, C]` logits tensor (row-major) into text and a mean
/// per-glyph confidence.
///
/// A class of `glyphs.len() + 1` maps to a plain space (the dictionary
/// does not carry one). Confidence per emitted glyph is the stable softmax
/// probability of the argmax; the overall confidence is the mean, or 0.0
/// when nothing was emitted.
pub fn greedy_decode(logits: &[f32], timesteps: usize, classes: usize, glyphs: &[String]) -> (String, f32) {
    let mut text = String::new();
    let mut confidences = Vec::new();
    let mut previous = 0usize;

    for t in 0..timesteps {
        let row = &logits[t * classes..(t + 1) * classes];
        let (argmax, max) = row
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |(bi, bv), (i, v)| {
                if v > bv {
                    (i, v)
                } else {
                    (bi, bv)
                }
            });

        if argmax != 0 && argmax != previous {
            if argmax == glyphs.len() + 1 {
                text.push(' ');
            } else if let Some(glyph) = glyphs.get(argmax - 1) {
                text.push_str(glyph);
            }
            confidences.push(softmax_of_max(row, max));
        }
        previous = argmax;
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };
    (text, confidence)
}

/// Stable softmax probability of the maximum entry:
/// `1 / sum(exp(v - max))`.
fn softmax_of_max(row: &[f32], max: f32) -> f32 {
    let denom: f32 = row.iter().map(|&v| (v - max).exp()).sum();
    1.0 / denom
}
