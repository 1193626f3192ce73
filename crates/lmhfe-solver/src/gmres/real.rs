//! Restarted GMRES over the [`MatrixOperator`] abstraction.

use lmhfe_core::matrix::{MatrixOperator, dot, norm};

use super::GmresOptions;
use super::helpers::givens_rotation;

/// Outcome of a GMRES solve: the best iterate found, how many inner
/// iterations it took, and the relative residual it achieved.
#[derive(Debug, Clone)]
pub struct GmresResult {
    pub x: Vec<f64>,
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
}

/// Solve `A*x = b` for a square operator exposed only through
/// `y += A*x`, restarting every `options.restart_m` inner iterations.
///
/// `x0` seeds the initial guess (zero if `None`); callers that warm-start
/// from a previous time step's solution pass it here.
pub fn solve_gmres(
    op: &dyn MatrixOperator,
    b: &[f64],
    x0: Option<&[f64]>,
    options: &GmresOptions,
) -> GmresResult {
    let n = op.dim();
    assert_eq!(b.len(), n, "RHS dimension mismatch");

    let b_norm = norm(b);
    let tol = options.tol_abs.max(options.tol_rel * b_norm);

    let mut x = match x0 {
        Some(guess) => {
            assert_eq!(guess.len(), n, "initial guess dimension mismatch");
            guess.to_vec()
        }
        None => vec![0.0; n],
    };

    if b_norm <= options.tol_abs {
        return GmresResult {
            x,
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let mut total_iter = 0usize;
    let m = options.restart_m.min(n).max(1);

    loop {
        let mut ax = vec![0.0; n];
        op.apply(&x, &mut ax);
        let mut r: Vec<f64> = b.iter().zip(&ax).map(|(bi, axi)| bi - axi).collect();
        let beta = norm(&r);

        if beta <= tol {
            return GmresResult {
                x,
                iterations: total_iter,
                residual: beta,
                converged: true,
            };
        }

        let mut v: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        let mut h = vec![vec![0.0; m + 1]; m];
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];
        let mut g = vec![0.0; m + 1];

        let inv_beta = 1.0 / beta;
        for ri in &mut r {
            *ri *= inv_beta;
        }
        g[0] = beta;
        v.push(r);

        let mut k = 0;
        let mut converged_inner = false;
        while k < m {
            total_iter += 1;
            if total_iter > options.max_iters {
                break;
            }

            let mut w = vec![0.0; n];
            op.apply(&v[k], &mut w);

            for j in 0..=k {
                let hij = dot(&v[j], &w);
                h[k][j] = hij;
                for (wi, vji) in w.iter_mut().zip(&v[j]) {
                    *wi -= hij * vji;
                }
            }

            let w_norm = norm(&w);
            h[k][k + 1] = w_norm;

            let col_norm = norm(&h[k][0..=k + 1]);
            if w_norm <= options.tol_abs * col_norm {
                // Breakdown: solve on the current j x j system.
                k += 1;
                converged_inner = true;
                break;
            }

            let inv_w = 1.0 / w_norm;
            v.push(w.iter().map(|wi| wi * inv_w).collect());

            for j in 0..k {
                let temp = cs[j] * h[k][j] + sn[j] * h[k][j + 1];
                h[k][j + 1] = -sn[j] * h[k][j] + cs[j] * h[k][j + 1];
                h[k][j] = temp;
            }

            let (c, s) = givens_rotation(h[k][k], h[k][k + 1]);
            cs[k] = c;
            sn[k] = s;
            h[k][k] = c * h[k][k] + s * h[k][k + 1];
            h[k][k + 1] = 0.0;

            let temp_g = c * g[k] + s * g[k + 1];
            g[k + 1] = -s * g[k] + c * g[k + 1];
            g[k] = temp_g;

            k += 1;
            if g[k].abs() <= tol {
                converged_inner = true;
                break;
            }
        }

        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = g[i];
            for (j, yj) in y.iter().enumerate().take(k).skip(i + 1) {
                sum -= h[j][i] * yj;
            }
            if h[i][i].abs() > 1e-300 {
                y[i] = sum / h[i][i];
            }
        }

        for i in 0..k {
            for (xj, vij) in x.iter_mut().zip(&v[i]) {
                *xj += vij * y[i];
            }
        }

        let mut ax_final = vec![0.0; n];
        op.apply(&x, &mut ax_final);
        let final_residual = norm(
            &b.iter()
                .zip(&ax_final)
                .map(|(bi, axi)| bi - axi)
                .collect::<Vec<_>>(),
        );

        if final_residual <= tol || (converged_inner && total_iter <= options.max_iters) {
            return GmresResult {
                x,
                iterations: total_iter,
                residual: final_residual,
                converged: final_residual <= tol,
            };
        }

        if total_iter >= options.max_iters {
            return GmresResult {
                x,
                iterations: total_iter,
                residual: final_residual,
                converged: false,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmhfe_core::matrix::DenseMatrix;

    #[test]
    fn diagonal_2x2() {
        let a = DenseMatrix::from_row_major(2, 2, vec![1.0, 0.0, 0.0, 2.0]);
        let b = vec![1.0, 2.0];
        let result = solve_gmres(&a, &b, None, &GmresOptions::default());
        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-9);
        assert!((result.x[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn nondiagonal_2x2() {
        let a = DenseMatrix::from_row_major(2, 2, vec![1.0, 8.0, 4.0, 2.0]);
        let b = vec![13.0, 7.0];
        let result = solve_gmres(&a, &b, None, &GmresOptions::default());
        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-9);
        assert!((result.x[1] - 1.5).abs() < 1e-9);
    }

    #[test]
    fn zero_rhs_is_trivially_converged() {
        let a = DenseMatrix::from_row_major(2, 2, vec![1.0, 0.0, 0.0, 2.0]);
        let b = vec![0.0, 0.0];
        let result = solve_gmres(&a, &b, None, &GmresOptions::default());
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.x, vec![0.0, 0.0]);
    }

    #[test]
    fn tridiagonal_with_restart() {
        let n = 20;
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 2.0;
            if i > 0 {
                data[i * n + i - 1] = -1.0;
            }
            if i + 1 < n {
                data[i * n + i + 1] = -1.0;
            }
        }
        let a = DenseMatrix::from_row_major(n, n, data);
        let b = vec![1.0; n];
        let options = GmresOptions {
            restart_m: 5,
            ..GmresOptions::default()
        };
        let result = solve_gmres(&a, &b, None, &options);
        assert!(result.converged);

        let mut ax = vec![0.0; n];
        a.apply(&result.x, &mut ax);
        let resid = norm(&ax.iter().zip(&b).map(|(axi, bi)| axi - bi).collect::<Vec<_>>());
        assert!(resid <= options.tol_abs.max(options.tol_rel * norm(&b)) * 10.0);
    }

    #[test]
    fn residual_bound_holds_for_random_spd_like_system() {
        let a = DenseMatrix::from_row_major(3, 3, vec![4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0]);
        let b = vec![5.0, 6.0, 4.0];
        let options = GmresOptions::default();
        let result = solve_gmres(&a, &b, None, &options);
        assert!(result.converged);

        let mut ax = vec![0.0; 3];
        a.apply(&result.x, &mut ax);
        let resid = norm(&ax.iter().zip(&b).map(|(axi, bi)| axi - bi).collect::<Vec<_>>());
        let bound = options.tol_abs.max(options.tol_rel) * norm(&b).max(norm(&ax));
        assert!(resid <= bound * 10.0);
    }
}
