use isoforest::data::{ColumnRef, DatasetView};
use isoforest::model::{DepthLimit, IsoForestConfig, OutputParams, SamplingParams, SplitParams};
use isoforest::repr::SplitCondition;
use isoforest::testing::data::{random_dense_f64, with_outliers};
use isoforest::training::IsoForestTrainer;

use crate::splits;

#[test]
fn uniform_rows_with_sub_sampling() {
    let x = random_dense_f64(1000, 3, 42, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(100)
        .sampling(SamplingParams {
            sample_size: Some(256),
            ..Default::default()
        })
        .output(OutputParams {
            depths: true,
            standardize_depth: false,
            ..Default::default()
        })
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    let forest = &output.forest;
    forest.validate().unwrap();
    assert_eq!(forest.n_trees(), 100);
    assert_eq!(forest.meta().sample_size, 256);

    for tree in forest.iso_trees().unwrap() {
        assert_eq!(tree.subtree_rows(0), 256);
        assert!(tree.n_leaves() <= 256);
    }

    let depths = output.depths.unwrap();
    assert_eq!(depths.len(), 1000);
    assert!(depths.iter().all(|d| d.is_finite() && *d > 0.0));
}

#[test]
fn constant_column_is_never_split() {
    let mut x = random_dense_f64(200, 3, 3, 0.0, 1.0);
    x.row_mut(1).fill(5.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(30)
        .split(SplitParams {
            prob_pick_pooled_gain: 0.5,
            ntry: 3,
            max_depth: DepthLimit::Unlimited,
            ..Default::default()
        })
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    for tree in output.forest.iso_trees().unwrap() {
        assert!(splits(tree).all(|s| s.column != ColumnRef::Numeric(1)));
    }
}

#[test]
fn min_gain_makes_nodes_terminal() {
    let x = random_dense_f64(50, 2, 9, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(5)
        .split(SplitParams {
            prob_pick_pooled_gain: 1.0,
            min_gain: 1.0,
            ..Default::default()
        })
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    for tree in output.forest.iso_trees().unwrap() {
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.subtree_rows(0), 50);
    }
}

#[test]
fn unlimited_depth_isolates_every_row() {
    let x = random_dense_f64(64, 2, 1, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(4)
        .split(SplitParams {
            max_depth: DepthLimit::Unlimited,
            ..Default::default()
        })
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    for tree in output.forest.iso_trees().unwrap() {
        assert_eq!(tree.n_leaves(), 64);
        assert!(tree.leaves().all(|(_, leaf)| leaf.n_rows == 1 && leaf.remainder == 0.0));
        for split in splits(tree) {
            assert!(matches!(split.condition, SplitCondition::Threshold(t) if t.is_finite()));
        }
    }
}

#[test]
fn depth_limit_bounds_tree_size() {
    let x = random_dense_f64(100, 2, 4, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(10)
        .split(SplitParams {
            max_depth: DepthLimit::Fixed(1),
            ..Default::default()
        })
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    for tree in output.forest.iso_trees().unwrap() {
        assert_eq!(tree.n_nodes(), 3);
        for (_, leaf) in tree.leaves() {
            assert_eq!(leaf.depth, 1);
            assert_eq!(leaf.remainder > 0.0, leaf.n_rows > 1);
        }
    }
}

#[test]
fn outliers_isolate_faster() {
    let (x, outliers) = with_outliers(300, 4, 2, 21);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(100)
        .output(OutputParams {
            depths: true,
            standardize_depth: false,
            ..Default::default()
        })
        .build()
        .unwrap();

    let depths = IsoForestTrainer::new(config).fit(&data).unwrap().depths.unwrap();
    let mut inlier: Vec<f64> = depths.iter().take(300).copied().collect();
    inlier.sort_by(f64::total_cmp);
    let median = inlier[150];
    for row in outliers {
        assert!(depths[row] < median, "outlier {row} depth {} vs median {median}", depths[row]);
    }
}
