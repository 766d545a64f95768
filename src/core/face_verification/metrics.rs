use crate::utils::error::{PipelineError, Result};

fn check_lengths(y_true: &[bool], y_pred: &[bool]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::ShapeMismatch {
            name: "y_pred".to_string(),
            expected: vec![y_true.len()],
            actual: vec![y_pred.len()],
        });
    }
    if y_true.is_empty() {
        return Err(PipelineError::ProcessingError {
            message: "Cannot score an empty prediction set".to_string(),
        });
    }
    Ok(())
}

/// Harmonic mean of precision and recall; 0 when there is no true positive.
pub fn f1_score(y_true: &[bool], y_pred: &[bool]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&truth, &pred) in y_true.iter().zip(y_pred) {
        match (truth, pred) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    if tp == 0 {
        return Ok(0.0);
    }
    Ok(2.0 * tp as f64 / (2 * tp + fp + fn_) as f64)
}

pub fn accuracy(y_true: &[bool], y_pred: &[bool]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}
