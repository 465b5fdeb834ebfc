//! Reverse-mode automatic differentiation.
//!
//! The backward pass walks the recorded graph in reverse topological order
//! (DFS postorder, reversed). A node's local gradients fire exactly once,
//! after every consumer has summed its contribution into the node's
//! adjoint; fan-out therefore accumulates by addition, never by overwrite.
//! Traversal terminates at leaves. Gradients come back as plain untracked
//! tensors.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::error::Error;
use crate::node::{NodeId, TensorOp};
use crate::numeric::Numeric;
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Gradient tensors computed during a backward pass.
pub struct Gradients<E: Numeric> {
    /// Map from node ID to accumulated adjoint.
    adjoints: HashMap<NodeId, Tensor<E>>,
    /// Map from variable name to (NodeId, gradient) pairs.
    name_to_grads: HashMap<String, Vec<(NodeId, Tensor<E>)>>,
}

impl<E: Numeric> Gradients<E> {
    /// Get gradient with respect to a tensor expression.
    pub fn wrt(&self, expr: &Tensor<E>) -> Option<&Tensor<E>> {
        self.adjoints.get(&expr.id())
    }

    /// Get gradient by variable name (first match if multiple).
    pub fn by_name(&self, name: &str) -> Option<&Tensor<E>> {
        self.name_to_grads
            .get(name)
            .and_then(|grads| grads.first().map(|(_, g)| g))
    }

    /// Get all named gradients.
    pub fn all_named(&self) -> &HashMap<String, Vec<(NodeId, Tensor<E>)>> {
        &self.name_to_grads
    }
}

/// Compute gradients of `output`, seeding its adjoint with ones.
pub fn backward<E: Numeric>(output: &Tensor<E>) -> Result<Gradients<E>, Error> {
    backward_with(output, &Tensor::ones(output.shape()))
}

/// Compute gradients of `output` with a caller-supplied upstream gradient.
/// The seed's shape must equal the output's shape.
pub fn backward_with<E: Numeric>(
    output: &Tensor<E>,
    seed: &Tensor<E>,
) -> Result<Gradients<E>, Error> {
    if seed.shape() != output.shape() {
        return Err(Error::shape_mismatch("backward", output.shape(), seed.shape()));
    }

    let topo_order = topological_sort(output);
    debug!(
        "backward from {} node {:?} over {} nodes",
        output.op().name(),
        output.id(),
        topo_order.len()
    );

    let mut adjoints: HashMap<NodeId, Tensor<E>> = HashMap::new();
    adjoints.insert(output.id(), seed.value_leaf());

    for expr in topo_order.iter().rev() {
        let Some(adjoint) = adjoints.get(&expr.id()) else {
            continue;
        };
        if expr.children().is_empty() {
            continue;
        }
        let adjoint = adjoint.clone();
        trace!(
            "propagating through {} node {:?}, adjoint shape {}",
            expr.op().name(),
            expr.id(),
            adjoint.shape()
        );

        let child_grads = local_gradients(expr, &adjoint)?;
        for (child, grad) in expr.children().iter().zip(child_grads) {
            if !child.requires_grad() {
                continue;
            }
            let updated = match adjoints.get(&child.id()) {
                Some(existing) => existing.add(&grad)?,
                None => grad,
            };
            adjoints.insert(child.id(), updated);
        }
    }

    let mut name_to_grads: HashMap<String, Vec<(NodeId, Tensor<E>)>> = HashMap::new();
    for expr in &topo_order {
        if let Some(name) = expr.var_name() {
            if let Some(grad) = adjoints.get(&expr.id()) {
                name_to_grads
                    .entry(name.to_string())
                    .or_default()
                    .push((expr.id(), grad.clone()));
            }
        }
    }

    Ok(Gradients {
        adjoints,
        name_to_grads,
    })
}

/// Local gradients of a node with respect to each child, in child order.
///
/// All tensors involved are untracked value leaves, so none of this grows
/// the graph being differentiated.
fn local_gradients<E: Numeric>(
    expr: &Tensor<E>,
    upstream: &Tensor<E>,
) -> Result<Vec<Tensor<E>>, Error> {
    let children = expr.children();

    match expr.op() {
        TensorOp::Const | TensorOp::Var { .. } => Ok(vec![]),

        // === Unary element-wise ===
        TensorOp::Neg => Ok(vec![upstream.neg()]),

        TensorOp::Exp => {
            // d(exp(x))/dx = exp(x) = output
            Ok(vec![upstream.mul(&expr.value_leaf())?])
        }

        TensorOp::Log => {
            // d(ln(x))/dx = 1/x
            Ok(vec![upstream.div(&children[0].value_leaf())?])
        }

        TensorOp::Sqrt => {
            // d(sqrt(x))/dx = 1 / (2 * sqrt(x))
            let two = Tensor::scalar(E::ONE + E::ONE);
            Ok(vec![upstream.div(&two.mul(&expr.value_leaf())?)?])
        }

        TensorOp::Tanh => {
            // d(tanh(x))/dx = 1 - tanh(x)^2
            let out = expr.value_leaf();
            let one = Tensor::scalar(E::ONE);
            Ok(vec![upstream.mul(&one.sub(&out.mul(&out)?)?)?])
        }

        TensorOp::Relu => {
            // passes gradient where the input was positive
            let mask = children[0].mask(|v| v > E::ZERO);
            Ok(vec![upstream.mul(&mask)?])
        }

        TensorOp::Sin => Ok(vec![upstream.mul(&children[0].value_leaf().cos()?)?]),

        TensorOp::Cos => Ok(vec![upstream.mul(&children[0].value_leaf().sin()?)?.neg()]),

        TensorOp::Tan => {
            // d(tan(x))/dx = 1 + tan(x)^2
            let out = expr.value_leaf();
            let one = Tensor::scalar(E::ONE);
            Ok(vec![upstream.mul(&one.add(&out.mul(&out)?)?)?])
        }

        // === Binary element-wise; gradients reduce back over broadcast dims ===
        TensorOp::Add => Ok(vec![
            upstream.sum_to_shape(children[0].shape()),
            upstream.sum_to_shape(children[1].shape()),
        ]),

        TensorOp::Sub => Ok(vec![
            upstream.sum_to_shape(children[0].shape()),
            upstream.neg().sum_to_shape(children[1].shape()),
        ]),

        TensorOp::Mul => {
            let a = children[0].value_leaf();
            let b = children[1].value_leaf();
            Ok(vec![
                upstream.mul(&b)?.sum_to_shape(children[0].shape()),
                upstream.mul(&a)?.sum_to_shape(children[1].shape()),
            ])
        }

        TensorOp::Div => {
            // d(a/b)/da = 1/b, d(a/b)/db = -a/b^2
            let a = children[0].value_leaf();
            let b = children[1].value_leaf();
            let grad_a = upstream.div(&b)?.sum_to_shape(children[0].shape());
            let grad_b = upstream
                .mul(&a.div(&b.mul(&b)?)?)?
                .neg()
                .sum_to_shape(children[1].shape());
            Ok(vec![grad_a, grad_b])
        }

        TensorOp::Maximum => {
            // lhs wins ties, matching the forward kernel
            let a = children[0].value_leaf();
            let b = children[1].value_leaf();
            let mask_a = a.mask_where(&b, |x, y| x >= y)?;
            let mask_b = b.mask_where(&a, |y, x| y > x)?;
            Ok(vec![
                upstream.mul(&mask_a)?.sum_to_shape(children[0].shape()),
                upstream.mul(&mask_b)?.sum_to_shape(children[1].shape()),
            ])
        }

        TensorOp::Minimum => {
            let a = children[0].value_leaf();
            let b = children[1].value_leaf();
            let mask_a = a.mask_where(&b, |x, y| x <= y)?;
            let mask_b = b.mask_where(&a, |y, x| y < x)?;
            Ok(vec![
                upstream.mul(&mask_a)?.sum_to_shape(children[0].shape()),
                upstream.mul(&mask_b)?.sum_to_shape(children[1].shape()),
            ])
        }

        // === Reductions ===
        TensorOp::Sum { axes, keepdims } => {
            let input_shape = children[0].shape();
            let expanded = expand_reduced(upstream, input_shape, axes.as_deref(), *keepdims);
            Ok(vec![expanded.broadcast_to_shape(input_shape)])
        }

        TensorOp::Mean { axes, keepdims } => {
            let input_shape = children[0].shape();
            let expanded = expand_reduced(upstream, input_shape, axes.as_deref(), *keepdims);
            let grad = expanded.broadcast_to_shape(input_shape);
            let count = input_shape.numel() / expanded.numel();
            Ok(vec![grad.div(&Tensor::scalar(E::from_usize(count)))?])
        }

        // === Linear algebra ===
        TensorOp::Matmul {
            transpose_lhs,
            transpose_rhs,
        } => {
            // C = op(A) @ op(B):
            //   d(opA) = dC @ op(B)^T   folded into the rhs flag
            //   d(opB) = op(A)^T @ dC   folded into the lhs flag
            // and an outer transpose maps d(opX) back to the stored dX.
            let a = children[0].value_leaf();
            let b = children[1].value_leaf();

            let mut grad_a = upstream.matmul_t(&b, false, !transpose_rhs)?;
            if *transpose_lhs {
                grad_a = grad_a.transposed()?;
            }

            let mut grad_b = a.matmul_t(upstream, !transpose_lhs, false)?;
            if *transpose_rhs {
                grad_b = grad_b.transposed()?;
            }

            Ok(vec![grad_a, grad_b])
        }

        // === Shape operations ===
        TensorOp::Transpose => Ok(vec![upstream.transposed()?]),

        TensorOp::View { original } => Ok(vec![upstream.with_shape(original.clone())]),
    }
}

/// Reinterpret a reduced adjoint under the keepdims shape of the reduction,
/// so it broadcasts back over the input.
fn expand_reduced<E: Numeric>(
    upstream: &Tensor<E>,
    input_shape: &Shape,
    axes: Option<&[usize]>,
    keepdims: bool,
) -> Tensor<E> {
    if keepdims {
        return upstream.value_leaf();
    }
    let keep_shape = match axes {
        None => Shape::new(vec![1; input_shape.ndim()]),
        Some(axes) => {
            let mut dims = input_shape.dims().to_vec();
            for &ax in axes {
                dims[ax] = 1;
            }
            Shape::new(dims)
        }
    };
    upstream.with_shape(keep_shape)
}

/// Reverse topological order via DFS postorder; children are visited in
/// recorded operand order, so the result is deterministic for a given graph.
fn topological_sort<E: Numeric>(root: &Tensor<E>) -> Vec<Tensor<E>> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();

    fn dfs<E: Numeric>(
        expr: &Tensor<E>,
        visited: &mut HashSet<NodeId>,
        order: &mut Vec<Tensor<E>>,
    ) {
        if !visited.insert(expr.id()) {
            return;
        }
        for child in expr.children() {
            dfs(child, visited, order);
        }
        order.push(expr.clone());
    }

    dfs(root, &mut visited, &mut order);
    order
}

/// Central-difference gradient estimate of `f` at `at`, for validating
/// autodiff results in tests and demos.
pub fn finite_diff_grad<E: Numeric>(f: impl Fn(&[E]) -> E, at: &[E], eps: E) -> Vec<E> {
    let two = E::ONE + E::ONE;
    let mut point = at.to_vec();
    let mut grads = Vec::with_capacity(at.len());
    for i in 0..at.len() {
        point[i] = at[i] + eps;
        let up = f(&point);
        point[i] = at[i] - eps;
        let down = f(&point);
        point[i] = at[i];
        grads.push((up - down) / (two * eps));
    }
    grads
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn grad_of(grads: &Gradients<f64>, x: &Tensor<f64>) -> Vec<f64> {
        grads.wrt(x).unwrap().to_vec()
    }

    #[test]
    fn test_simple_chain() {
        // y = sum(x * x), dy/dx = 2x
        let x = Tensor::var("x", vec![1.0, 2.0, 3.0], vec![3]);
        let y = x.mul(&x).unwrap().sum(None, false);
        let grads = y.backward().unwrap();
        assert_eq!(grad_of(&grads, &x), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_fan_out_sums_contributions() {
        // z = x*y + x, dz/dx = y + 1, reached through two paths
        let x = Tensor::var("x", vec![3.0], vec![1]);
        let y = Tensor::var("y", vec![4.0], vec![1]);
        let z = x.mul(&y).unwrap().add(&x).unwrap().sum(None, false);
        let grads = z.backward().unwrap();
        assert_eq!(grad_of(&grads, &x), vec![5.0]);
        assert_eq!(grad_of(&grads, &y), vec![3.0]);
    }

    #[test]
    fn test_gradients_are_untracked() {
        let x = Tensor::var("x", vec![2.0], vec![1]);
        let y = x.mul(&x).unwrap().sum(None, false);
        let grads = y.backward().unwrap();
        let g = grads.wrt(&x).unwrap();
        assert!(g.is_leaf());
        assert!(!g.requires_grad());
    }

    #[test]
    fn test_seed_shape_checked() {
        let x = Tensor::var("x", vec![1.0, 2.0], vec![2]);
        let y = x.relu();
        let bad_seed = Tensor::ones(vec![3]);
        assert!(matches!(
            backward_with(&y, &bad_seed),
            Err(Error::ShapeMismatch { op: "backward", .. })
        ));

        let seed = Tensor::from_vec(vec![10.0, 100.0], vec![2]);
        let grads = backward_with(&y, &seed).unwrap();
        assert_eq!(grad_of(&grads, &x), vec![10.0, 100.0]);
    }

    #[test]
    fn test_broadcast_gradient_reduces_back() {
        // m: (2,3), row: (3,) broadcast up; d(sum(m+row))/drow sums rows
        let m = Tensor::var("m", vec![1.0; 6], vec![2, 3]);
        let row = Tensor::var("row", vec![1.0, 2.0, 3.0], vec![3]);
        let y = m.add(&row).unwrap().sum(None, false);
        let grads = y.backward().unwrap();
        assert_eq!(grad_of(&grads, &m), vec![1.0; 6]);
        assert_eq!(grad_of(&grads, &row), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_detach_blocks_flow() {
        let x = Tensor::var("x", vec![3.0], vec![1]);
        let y = x.mul(&x).unwrap();
        let d = y.detach();
        let z = d.mul(&d).unwrap().sum(None, false);
        let grads = z.backward().unwrap();
        // gradient reaches the detached leaf, not the original variable
        assert!(grads.wrt(&x).is_none());
        assert_eq!(grad_of(&grads, &d), vec![18.0]);
    }

    #[test]
    fn test_matmul_backward_plain() {
        // hand-checked 2x3 @ 3x4
        let a_vals = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b_vals: Vec<f64> = (1..=12).map(|v| v as f64).collect();
        let a = Tensor::var("a", a_vals, vec![2, 3]);
        let b = Tensor::var("b", b_vals, vec![3, 4]);
        let y = a.matmul(&b).unwrap().sum(None, false);
        let grads = y.backward().unwrap();

        // dA = ones(2,4) @ B^T: each row is the row sums of B
        assert_eq!(
            grad_of(&grads, &a),
            vec![10.0, 26.0, 42.0, 10.0, 26.0, 42.0]
        );
        // dB = A^T @ ones(2,4): each column is the column sums of A
        assert_eq!(
            grad_of(&grads, &b),
            vec![5.0, 5.0, 5.0, 5.0, 7.0, 7.0, 7.0, 7.0, 9.0, 9.0, 9.0, 9.0]
        );
    }

    #[test]
    fn test_matmul_backward_transpose_flag_symmetry() {
        // the same product computed with and without flags must produce the
        // same gradients, modulo the storage transpose
        let a_vals = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b_vals: Vec<f64> = (1..=12).map(|v| v as f64).collect();

        let a = Tensor::var("a", a_vals.clone(), vec![2, 3]);
        let b = Tensor::var("b", b_vals.clone(), vec![3, 4]);
        let y = a.matmul_t(&b, false, false).unwrap().sum(None, false);
        let grads_plain = y.backward().unwrap();

        // a stored transposed as (3,2), flagged
        let a_t_vals = vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let at = Tensor::var("at", a_t_vals, vec![3, 2]);
        let b2 = Tensor::var("b", b_vals.clone(), vec![3, 4]);
        let y2 = at.matmul_t(&b2, true, false).unwrap().sum(None, false);
        assert_eq!(y2.item(), y.item());
        let grads_flagged = y2.backward().unwrap();

        let da = grads_plain.wrt(&a).unwrap();
        let dat = grads_flagged.wrt(&at).unwrap();
        // dat is da transposed into (3,2) storage
        assert_eq!(dat.to_vec(), da.transposed().unwrap().to_vec());
        assert_eq!(
            grads_flagged.wrt(&b2).unwrap().to_vec(),
            grads_plain.wrt(&b).unwrap().to_vec()
        );

        // b stored transposed as (4,3), flagged
        let bt_vals = vec![
            1.0, 5.0, 9.0, 2.0, 6.0, 10.0, 3.0, 7.0, 11.0, 4.0, 8.0, 12.0,
        ];
        let a3 = Tensor::var("a", a_vals, vec![2, 3]);
        let bt = Tensor::var("bt", bt_vals, vec![4, 3]);
        let y3 = a3.matmul_t(&bt, false, true).unwrap().sum(None, false);
        assert_eq!(y3.item(), y.item());
        let grads_rhs = y3.backward().unwrap();
        assert_eq!(
            grads_rhs.wrt(&bt).unwrap().to_vec(),
            grads_plain.wrt(&b).unwrap().transposed().unwrap().to_vec()
        );
    }

    #[test]
    fn test_view_backward_restores_shape() {
        let x = Tensor::var("x", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let y = x.view(&[3, 2]).unwrap().sum(Some(&[0]), false);
        let grads = y.sum(None, false).backward().unwrap();
        let g = grads.wrt(&x).unwrap();
        assert_eq!(g.shape().dims(), &[2, 3]);
        assert_eq!(g.to_vec(), vec![1.0; 6]);
    }

    #[test]
    fn test_reduction_backward_with_axes() {
        let x = Tensor::var("x", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let y = x.mean(Some(&[1]), false); // (2,)
        let grads = y.sum(None, false).backward().unwrap();
        assert_eq!(grad_of(&grads, &x), vec![1.0 / 3.0; 6]);
    }

    #[test]
    fn test_maximum_ties_go_left() {
        let a = Tensor::var("a", vec![2.0, 5.0], vec![2]);
        let b = Tensor::var("b", vec![2.0, 1.0], vec![2]);
        let y = a.maximum(&b).unwrap().sum(None, false);
        let grads = y.backward().unwrap();
        assert_eq!(grad_of(&grads, &a), vec![1.0, 1.0]);
        assert_eq!(grad_of(&grads, &b), vec![0.0, 0.0]);
    }

    #[test]
    fn test_by_name_lookup() {
        let w = Tensor::var("w", vec![2.0], vec![1]);
        let y = w.mul(&w).unwrap().sum(None, false);
        let grads = y.backward().unwrap();
        assert_eq!(grads.by_name("w").unwrap().to_vec(), vec![4.0]);
        assert!(grads.by_name("missing").is_none());
    }

    #[test]
    fn test_gradcheck_composite() {
        // f(x) = sum(tanh(x) * exp(-x) + sqrt(x))
        let at = [0.5, 1.0, 2.0, 3.0];
        let f = |vals: &[f64]| {
            let x = Tensor::from_vec(vals.to_vec(), vec![vals.len()]);
            let y = x
                .tanh()
                .unwrap()
                .mul(&x.neg().exp().unwrap())
                .unwrap()
                .add(&x.sqrt().unwrap())
                .unwrap()
                .sum(None, false);
            y.item()
        };
        let numeric = finite_diff_grad(f, &at, 1e-6);

        let x = Tensor::var("x", at.to_vec(), vec![4]);
        let y = x
            .tanh()
            .unwrap()
            .mul(&x.neg().exp().unwrap())
            .unwrap()
            .add(&x.sqrt().unwrap())
            .unwrap()
            .sum(None, false);
        let grads = y.backward().unwrap();
        let analytic = grad_of(&grads, &x);

        for (a, n) in analytic.iter().zip(&numeric) {
            assert_relative_eq!(a, n, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_gradcheck_trig() {
        let at = [0.3, -0.7, 1.2];
        let f = |vals: &[f64]| {
            let x = Tensor::from_vec(vals.to_vec(), vec![vals.len()]);
            x.sin()
                .unwrap()
                .mul(&x.cos().unwrap())
                .unwrap()
                .add(&x.tan().unwrap())
                .unwrap()
                .sum(None, false)
                .item()
        };
        let numeric = finite_diff_grad(f, &at, 1e-6);

        let x = Tensor::var("x", at.to_vec(), vec![3]);
        let y = x
            .sin()
            .unwrap()
            .mul(&x.cos().unwrap())
            .unwrap()
            .add(&x.tan().unwrap())
            .unwrap()
            .sum(None, false);
        let grads = y.backward().unwrap();
        for (a, n) in grad_of(&grads, &x).iter().zip(&numeric) {
            assert_relative_eq!(a, n, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_gradcheck_matmul_mlp_style() {
        // scalar loss through two matmuls and a relu
        let w1_at: Vec<f64> = vec![0.1, -0.2, 0.3, 0.4, -0.5, 0.6];
        let x_data = vec![1.0, 2.0];
        let w2_data = vec![0.7, -0.8, 0.9];

        let loss_at = |w1_vals: &[f64]| {
            let x = Tensor::from_vec(x_data.clone(), vec![1, 2]);
            let w1 = Tensor::from_vec(w1_vals.to_vec(), vec![2, 3]);
            let w2 = Tensor::from_vec(w2_data.clone(), vec![3, 1]);
            let h = x.matmul(&w1).unwrap().relu();
            h.matmul(&w2).unwrap().sum(None, false).item()
        };
        let numeric = finite_diff_grad(loss_at, &w1_at, 1e-6);

        let x = Tensor::from_vec(x_data.clone(), vec![1, 2]);
        let w1 = Tensor::var("w1", w1_at.clone(), vec![2, 3]);
        let w2 = Tensor::from_vec(w2_data.clone(), vec![3, 1]);
        let loss = x
            .matmul(&w1)
            .unwrap()
            .relu()
            .matmul(&w2)
            .unwrap()
            .sum(None, false);
        let grads = loss.backward().unwrap();
        for (a, n) in grad_of(&grads, &w1).iter().zip(&numeric) {
            assert_relative_eq!(a, n, epsilon = 1e-3);
        }
    }
}
