//! k-fold cross-validation
//!
//! Folds are contiguous slices of one random permutation and are not
//! stratified by class.

use crate::core::{LinearError, Parameter, Problem, ProblemView, Result};
use crate::train::train_view;
use crate::utils::random::Random;
use log::{info, warn};

/// Predict every instance with a model trained on the other folds.
///
/// Returns the predicted labels indexed by original instance position. The
/// permutation and all solver shuffles are drawn from `rng`, so resetting it
/// replays the run exactly.
pub fn cross_validation(
    problem: &Problem,
    param: &Parameter,
    nr_fold: usize,
    rng: &mut Random,
) -> Result<Vec<i32>> {
    if nr_fold < 2 {
        return Err(LinearError::InvalidParameter(format!(
            "n-fold cross validation: n must be >= 2, got: {nr_fold}"
        )));
    }
    let full = problem.view();
    full.validate()?;

    let l = problem.len();
    let nr_fold = if nr_fold > l {
        warn!("# folds > # data. Will use # folds = # data instead (leave-one-out cross validation)");
        l
    } else {
        nr_fold
    };

    let mut perm: Vec<usize> = (0..l).collect();
    for i in 0..l {
        let j = i + rng.next_index(l - i);
        perm.swap(i, j);
    }
    let fold_start: Vec<usize> = (0..=nr_fold).map(|i| i * l / nr_fold).collect();

    let mut target = vec![0; l];
    for fold in 0..nr_fold {
        let begin = fold_start[fold];
        let end = fold_start[fold + 1];
        info!("cross validation fold {}/{}: holding out {} instances", fold + 1, nr_fold, end - begin);

        let kept = perm[..begin].iter().chain(&perm[end..]);
        let subprob = ProblemView {
            n: full.n,
            bias: full.bias,
            x: kept.clone().map(|&i| full.x[i]).collect(),
            y: kept.map(|&i| full.y[i]).collect(),
        };
        let submodel = train_view(&subprob, param, rng)?;

        for &i in &perm[begin..end] {
            target[i] = submodel.predict(full.x[i]);
        }
    }

    Ok(target)
}
