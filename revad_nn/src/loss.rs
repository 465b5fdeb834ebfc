//! Loss functions.
//!
//! Losses reduce to a scalar with `mean`, so gradients are already scaled
//! by the batch size.

use revad_tensor::{Error, Numeric, Tensor};

/// Mean squared error: `mean((prediction - target)^2)`.
pub fn mse_loss<E: Numeric>(prediction: &Tensor<E>, target: &Tensor<E>) -> Result<Tensor<E>, Error> {
    let diff = prediction.sub(target)?;
    Ok(diff.mul(&diff)?.mean(None, false))
}

/// Binary cross entropy on raw logits.
///
/// Uses the stable form `relu(l) - l*t + log(1 + exp(-|l|))`, which never
/// exponentiates a large positive value.
pub fn binary_cross_entropy_with_logits<E: Numeric>(
    logits: &Tensor<E>,
    targets: &Tensor<E>,
) -> Result<Tensor<E>, Error> {
    let one = Tensor::scalar(E::ONE);
    // |l| = relu(l) + relu(-l) keeps the magnitude inside the graph
    let abs = logits.relu().add(&logits.neg().relu())?;
    let log_term = one.add(&abs.neg().exp()?)?.log()?;
    logits
        .relu()
        .sub(&logits.mul(targets)?)?
        .add(&log_term)
        .map(|t| t.mean(None, false))
}
