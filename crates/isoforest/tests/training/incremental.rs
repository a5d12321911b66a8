use approx::assert_abs_diff_eq;
use isoforest::data::DatasetView;
use isoforest::model::{ConfigError, ImputeParams, IsoForestConfig, OutputParams, SplitParams};
use isoforest::repr::{Imputer, MissingAction};
use isoforest::testing::data::{inject_missing, random_dense_f64};
use isoforest::training::{CancellationToken, FitError, FitStatus, ImputedValue, IsoForestTrainer};

use crate::splits;

fn trainer(n_trees: usize, build_imputer: bool) -> IsoForestTrainer {
    let config = IsoForestConfig::builder()
        .n_trees(n_trees)
        .impute(ImputeParams {
            build_imputer,
            ..Default::default()
        })
        .build()
        .unwrap();
    IsoForestTrainer::new(config)
}

#[test]
fn add_tree_grows_forest_and_imputer_together() {
    let mut x = random_dense_f64(100, 3, 31, 0.0, 1.0);
    inject_missing(&mut x, 0.05, 32);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let trainer = trainer(3, true);

    let output = trainer.fit(&data).unwrap();
    let mut forest = output.forest;
    let mut imputer = output.imputer.unwrap();
    for expected in 4..=6 {
        trainer.add_tree(&data, &mut forest, Some(&mut imputer)).unwrap();
        assert_eq!(forest.n_trees(), expected);
        assert_eq!(imputer.n_trees(), expected);
    }
    forest.validate().unwrap();

    let last = &forest.iso_trees().unwrap()[5];
    assert_eq!(imputer.tree(5).len(), last.n_leaves());
}

#[test]
fn add_tree_ignores_fit_time_outputs() {
    let x = random_dense_f64(80, 2, 33, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(2)
        .output(OutputParams {
            depths: true,
            distances: true,
            ..Default::default()
        })
        .build()
        .unwrap();
    let trainer = IsoForestTrainer::new(config);

    let mut forest = trainer.fit(&data).unwrap().forest;
    trainer.add_tree(&data, &mut forest, None).unwrap();
    assert_eq!(forest.n_trees(), 3);
}

#[test]
fn add_tree_rejects_a_different_column_layout() {
    let x = random_dense_f64(60, 3, 34, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let trainer = trainer(2, false);
    let mut forest = trainer.fit(&data).unwrap().forest;

    let narrow = random_dense_f64(60, 2, 35, 0.0, 1.0);
    let narrow = DatasetView::from_dense(narrow.view()).unwrap();
    let err = trainer.add_tree(&narrow, &mut forest, None).unwrap_err();
    assert!(matches!(
        err,
        FitError::Config(ConfigError::ForestColumnsMismatch {
            expected: (3, 0),
            got: (2, 0)
        })
    ));
    assert_eq!(forest.n_trees(), 2);
}

#[test]
fn add_tree_rejects_a_stale_imputer() {
    let x = random_dense_f64(60, 2, 36, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let trainer = trainer(2, true);
    let mut forest = trainer.fit(&data).unwrap().forest;

    let mut imputer = Imputer::new(vec![0.5, 0.5], Vec::new());
    let err = trainer.add_tree(&data, &mut forest, Some(&mut imputer)).unwrap_err();
    assert!(matches!(
        err,
        FitError::Config(ConfigError::ImputerTreeCountMismatch { imputer: 0, forest: 2 })
    ));
    assert_eq!(forest.n_trees(), 2);
    assert_eq!(imputer.n_trees(), 0);
}

#[test]
fn add_tree_rejects_a_different_model() {
    let x = random_dense_f64(60, 3, 37, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let mut forest = trainer(2, false).fit(&data).unwrap().forest;

    let extended = IsoForestTrainer::new(
        IsoForestConfig::builder()
            .split(SplitParams::extended(2))
            .build()
            .unwrap(),
    );
    let err = extended.add_tree(&data, &mut forest, None).unwrap_err();
    assert!(matches!(err, FitError::Config(ConfigError::ForestKindMismatch { .. })));
}

#[test]
fn add_tree_after_interruption_uses_a_fresh_seed() {
    let x = random_dense_f64(80, 3, 38, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let interrupted = trainer(3, false).fit_with_cancellation(&data, &cancel).unwrap();
    assert_eq!(interrupted.status, FitStatus::Interrupted);
    assert_eq!(interrupted.forest.meta().next_tree_idx, 3);

    let mut forest = interrupted.forest;
    trainer(3, false).add_tree(&data, &mut forest, None).unwrap();
    trainer(3, false).add_tree(&data, &mut forest, None).unwrap();
    assert_eq!(forest.meta().next_tree_idx, 5);

    // Appended trees continue after the configured count, never reusing
    // the seed of a tree the interrupted fit may have kept.
    let full = trainer(5, false).fit(&data).unwrap().forest;
    assert_eq!(forest.iso_trees().unwrap(), &full.iso_trees().unwrap()[3..]);
}

#[test]
fn add_tree_extends_a_hyperplane_forest() {
    let mut x = random_dense_f64(120, 4, 39, -1.0, 1.0);
    inject_missing(&mut x, 0.05, 40);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = |n_trees| {
        IsoForestConfig::builder()
            .n_trees(n_trees)
            .split(SplitParams::extended(2))
            .impute(ImputeParams {
                build_imputer: true,
                ..Default::default()
            })
            .build()
            .unwrap()
    };

    let output = IsoForestTrainer::new(config(2)).fit(&data).unwrap();
    let mut forest = output.forest;
    let mut imputer = output.imputer.unwrap();
    let trainer = IsoForestTrainer::new(config(2));
    trainer.add_tree(&data, &mut forest, Some(&mut imputer)).unwrap();
    trainer.add_tree(&data, &mut forest, Some(&mut imputer)).unwrap();

    forest.validate().unwrap();
    assert_eq!(imputer.n_trees(), 4);
    let trees = forest.hyperplane_trees().unwrap();
    for (idx, tree) in trees.iter().enumerate() {
        assert_eq!(imputer.tree(idx).len(), tree.n_leaves());
    }

    let full = IsoForestTrainer::new(config(4)).fit(&data).unwrap();
    assert_eq!(trees, full.forest.hyperplane_trees().unwrap());
    assert_eq!(imputer, full.imputer.unwrap());
}

#[test]
fn add_tree_with_divide_keeps_fractions_and_fills() {
    let mut x = random_dense_f64(200, 3, 41, 0.0, 1.0);
    inject_missing(&mut x, 0.1, 42);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(4)
        .missing_action(MissingAction::Divide)
        .impute(ImputeParams {
            build_imputer: true,
            min_imp_obs: 2,
            ..Default::default()
        })
        .output(OutputParams {
            impute_at_fit: true,
            ..Default::default()
        })
        .build()
        .unwrap();
    let trainer = IsoForestTrainer::new(config);

    let output = trainer.fit(&data).unwrap();
    let imputed = output.imputed.unwrap();
    assert!(!imputed.is_empty());
    for cell in imputed.cells() {
        match cell.value {
            ImputedValue::Numeric(v) => assert!(v.is_finite(), "imputed {v}"),
            ImputedValue::Category(_) => panic!("no categorical columns"),
        }
    }

    let mut forest = output.forest;
    let mut imputer = output.imputer.unwrap();
    trainer.add_tree(&data, &mut forest, Some(&mut imputer)).unwrap();

    let tree = &forest.iso_trees().unwrap()[4];
    for split in splits(tree) {
        assert!(split.pct_left > 0.0 && split.pct_left < 1.0);
        assert_abs_diff_eq!(split.pct_left + split.pct_right(), 1.0, epsilon = 1e-12);
    }
    // Divided rows carry fractional weight, restored on unwind, so the
    // leaves still account for every row exactly once.
    let total_weight: f64 = tree.leaves().map(|(_, leaf)| leaf.weight).sum();
    assert_abs_diff_eq!(total_weight, 200.0, epsilon = 1e-9);

    let nodes = imputer.tree(4);
    assert_eq!(nodes.len(), tree.n_leaves());
    for node in nodes {
        for (&fill, &weight) in node.num_fill.iter().zip(&node.num_weight) {
            assert!(weight >= 0.0);
            if weight > 0.0 {
                assert!(fill.is_finite(), "fill {fill} backed by {weight}");
            }
        }
    }
}
