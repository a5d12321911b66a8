use approx::assert_abs_diff_eq;
use isoforest::data::{DatasetMut, DatasetView, is_missing};
use isoforest::model::{ConfigError, ImputeParams, IsoForestConfig, OutputParams, SamplingParams};
use isoforest::repr::MissingAction;
use isoforest::testing::data::{inject_missing, random_dense_f64};
use isoforest::training::{CancellationToken, FitError, ImputedValue, IsoForestTrainer};

use crate::splits;

fn imputing_config(n_trees: usize) -> IsoForestConfig {
    IsoForestConfig::builder()
        .n_trees(n_trees)
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
        .unwrap()
}

#[test]
fn divide_sends_missing_rows_both_ways() {
    let mut x = random_dense_f64(200, 3, 8, 0.0, 1.0);
    inject_missing(&mut x, 0.1, 9);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(20)
        .missing_action(MissingAction::Divide)
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    output.forest.validate().unwrap();
    for tree in output.forest.iso_trees().unwrap() {
        assert!(tree.subtree_rows(0) >= 200);
        for split in splits(tree) {
            assert!(split.pct_left > 0.0 && split.pct_left < 1.0);
            assert_abs_diff_eq!(split.pct_left + split.pct_right(), 1.0, epsilon = 1e-12);
        }
        let total_weight: f64 = tree.leaves().map(|(_, leaf)| leaf.weight).sum();
        assert_abs_diff_eq!(total_weight, 200.0, epsilon = 1e-9);
    }
}

#[test]
fn impute_routes_each_row_once() {
    let mut x = random_dense_f64(150, 3, 1, 0.0, 1.0);
    inject_missing(&mut x, 0.2, 2);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(20)
        .missing_action(MissingAction::Impute)
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    for tree in output.forest.iso_trees().unwrap() {
        assert_eq!(tree.subtree_rows(0), 150);
    }
}

#[test]
fn imputer_aligns_with_leaves() {
    let mut x = random_dense_f64(120, 2, 3, 0.0, 1.0);
    inject_missing(&mut x, 0.1, 4);
    let data = DatasetView::from_dense(x.view()).unwrap();

    let output = IsoForestTrainer::new(imputing_config(10)).fit(&data).unwrap();
    let imputer = output.imputer.unwrap();
    let trees = output.forest.iso_trees().unwrap();
    assert_eq!(imputer.n_trees(), trees.len());
    for (t, tree) in trees.iter().enumerate() {
        let leaf_ids: Vec<_> = tree.leaves().map(|(id, _)| id).collect();
        let node_ids: Vec<_> = imputer.tree(t).iter().map(|node| node.tree_node).collect();
        assert_eq!(leaf_ids, node_ids);
    }
    assert_eq!(imputer.col_means().len(), 2);
}

#[test]
fn fit_time_imputation_covers_every_missing_cell() {
    let mut x = random_dense_f64(200, 3, 5, 10.0, 20.0);
    inject_missing(&mut x, 0.05, 6);
    let n_missing = x.iter().filter(|v| is_missing(**v)).count();
    assert!(n_missing > 0);
    let data = DatasetView::from_dense(x.view()).unwrap();

    let output = IsoForestTrainer::new(imputing_config(25)).fit(&data).unwrap();
    let imputed = output.imputed.unwrap();
    assert_eq!(imputed.len(), n_missing);
    for cell in imputed.cells() {
        assert!(data.is_missing(cell.row, cell.column));
        match cell.value {
            ImputedValue::Numeric(v) => assert!((10.0..20.0).contains(&v), "imputed {v}"),
            ImputedValue::Category(_) => panic!("no categorical columns"),
        }
    }
}

#[test]
fn fit_in_place_fills_missing_values() {
    let mut x = random_dense_f64(100, 2, 7, 0.0, 1.0);
    inject_missing(&mut x, 0.1, 8);
    let output = {
        let mut data = DatasetMut::from_dense(x.view_mut()).unwrap();
        IsoForestTrainer::new(imputing_config(10))
            .fit_in_place(&mut data, &CancellationToken::new())
            .unwrap()
    };
    assert!(output.imputed.is_some_and(|v| !v.is_empty()));
    assert!(x.iter().all(|v| v.is_finite()));
}

#[test]
fn fit_in_place_requires_impute_at_fit() {
    let mut x = random_dense_f64(30, 2, 7, 0.0, 1.0);
    let mut data = DatasetMut::from_dense(x.view_mut()).unwrap();
    let err = IsoForestTrainer::new(IsoForestConfig::default())
        .fit_in_place(&mut data, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, FitError::Config(ConfigError::InPlaceWithoutImputeAtFit)));
}

#[test]
fn fit_time_imputation_needs_every_row() {
    let x = random_dense_f64(100, 2, 7, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let mut config = imputing_config(5);
    config.sampling = SamplingParams {
        sample_size: Some(50),
        ..Default::default()
    };
    let err = IsoForestTrainer::new(config).fit(&data).unwrap_err();
    assert!(matches!(
        err,
        FitError::Config(ConfigError::OutputNeedsFullSample {
            output: "impute_at_fit"
        })
    ));
}
