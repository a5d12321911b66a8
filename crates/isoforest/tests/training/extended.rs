use isoforest::data::DatasetView;
use isoforest::model::{CoefType, HyperplaneParams, IsoForestConfig, SamplingParams, SplitParams};
use isoforest::repr::{ForestKind, HyperplaneSplit, HyperplaneTerm, HyperplaneTree, MissingAction, Node};
use isoforest::testing::data::{inject_missing, random_dense_f64};
use isoforest::training::IsoForestTrainer;
use rstest::rstest;

fn hyperplanes(tree: &HyperplaneTree) -> impl Iterator<Item = &HyperplaneSplit> {
    tree.nodes().iter().filter_map(|node| match node {
        Node::Internal { split, .. } => Some(split),
        Node::Leaf(_) => None,
    })
}

#[rstest]
#[case::random(SplitParams::extended(3))]
#[case::pooled(SplitParams { ndim: 3, prob_pick_pooled_gain: 1.0, ..Default::default() })]
#[case::averaged(SplitParams { ndim: 3, prob_pick_avg_gain: 1.0, ntry: 4, ..Default::default() })]
fn hyperplane_trees_combine_up_to_ndim_columns(#[case] split: SplitParams) {
    let x = random_dense_f64(256, 5, 51, -1.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(15)
        .split(split)
        .sampling(SamplingParams {
            sample_size: Some(128),
            ..Default::default()
        })
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    assert_eq!(output.forest.kind(), ForestKind::Hyperplane);
    assert!(output.forest.iso_trees().is_none());
    output.forest.validate().unwrap();

    for tree in output.forest.hyperplane_trees().unwrap() {
        assert_eq!(tree.subtree_rows(0), 128);
        assert!(tree.n_nodes() > 1);
        for split in hyperplanes(tree) {
            assert!((1..=3).contains(&split.terms.len()));
            assert!(split.threshold.is_finite());
        }
    }
}

#[test]
fn ndim_is_capped_by_the_column_count() {
    let x = random_dense_f64(100, 2, 52, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(5)
        .split(SplitParams::extended(6))
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    for tree in output.forest.hyperplane_trees().unwrap() {
        assert!(hyperplanes(tree).all(|split| split.terms.len() <= 2));
    }
}

#[test]
fn missing_values_are_filled_in_combinations() {
    let mut x = random_dense_f64(150, 3, 53, 0.0, 1.0);
    inject_missing(&mut x, 0.1, 54);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(10)
        .split(SplitParams::extended(2))
        .missing_action(MissingAction::Impute)
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    for tree in output.forest.hyperplane_trees().unwrap() {
        assert_eq!(tree.subtree_rows(0), 150);
        for split in hyperplanes(tree) {
            for row in 0..150 {
                assert!(split.value(&data, row).is_finite());
            }
        }
    }
}

#[test]
fn uniform_coefficients_stay_in_range() {
    let x = random_dense_f64(100, 4, 55, 0.0, 10.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(10)
        .split(SplitParams::extended(4))
        .hyperplane(HyperplaneParams {
            coef_type: CoefType::Uniform,
            standardize_data: false,
            ..Default::default()
        })
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    for tree in output.forest.hyperplane_trees().unwrap() {
        for split in hyperplanes(tree) {
            for term in &split.terms {
                if let HyperplaneTerm::Numeric { coef, .. } = term {
                    assert!((-1.0..1.0).contains(coef));
                }
            }
        }
    }
}
