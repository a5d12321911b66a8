use isoforest::data::{CategoricalColumns, ColumnRef, DatasetView, NumericColumns};
use isoforest::model::{CategoricalParams, IsoForestConfig, SplitParams};
use isoforest::repr::{CategoricalSplit, CategoryBranch, HyperplaneTerm, NewCategoryAction, Node, SplitCondition};
use isoforest::testing::data::{random_categorical, random_dense_f64};
use isoforest::training::IsoForestTrainer;
use ndarray::Array2;
use rstest::rstest;

use crate::splits;

const N_CATEGORIES: [usize; 3] = [3, 5, 8];

fn mixed_data() -> (Array2<f64>, Array2<i32>) {
    let x = random_dense_f64(300, 1, 21, 0.0, 1.0);
    let codes = random_categorical(300, &N_CATEGORIES, 22, 0.0);
    (x, codes)
}

fn categorical_config(categorical: CategoricalParams, split: SplitParams) -> IsoForestConfig {
    IsoForestConfig::builder()
        .n_trees(30)
        .categorical(categorical)
        .split(split)
        .build()
        .unwrap()
}

#[rstest]
#[case::random(SplitParams::random())]
#[case::pooled(SplitParams { prob_pick_pooled_gain: 1.0, ..Default::default() })]
#[case::pooled_all_perm(SplitParams { prob_pick_pooled_gain: 1.0, all_perm: true, ..Default::default() })]
#[case::averaged(SplitParams { prob_pick_avg_gain: 1.0, ..Default::default() })]
fn subset_splits_assign_every_category(#[case] split: SplitParams) {
    let (x, codes) = mixed_data();
    let cats = CategoricalColumns::new(codes.view(), &N_CATEGORIES).unwrap();
    let data = DatasetView::new(NumericColumns::Dense(x.view()), Some(cats)).unwrap();

    let output = IsoForestTrainer::new(categorical_config(CategoricalParams::default(), split))
        .fit(&data)
        .unwrap();
    output.forest.validate().unwrap();

    let mut n_categorical = 0;
    for tree in output.forest.iso_trees().unwrap() {
        for split in splits(tree) {
            let ColumnRef::Categorical(col) = split.column else {
                continue;
            };
            n_categorical += 1;
            let SplitCondition::Subset(branches) = &split.condition else {
                panic!("subset split expected, got {:?}", split.condition);
            };
            assert_eq!(branches.len(), N_CATEGORIES[col]);
            assert!(branches.contains(&CategoryBranch::Left));
            assert!(branches.contains(&CategoryBranch::Right));
        }
    }
    assert!(n_categorical > 0);
}

#[test]
fn single_category_splits_pick_a_valid_code() {
    let (x, codes) = mixed_data();
    let cats = CategoricalColumns::new(codes.view(), &N_CATEGORIES).unwrap();
    let data = DatasetView::new(NumericColumns::Dense(x.view()), Some(cats)).unwrap();
    let categorical = CategoricalParams {
        split_type: CategoricalSplit::SingleCategory,
        ..Default::default()
    };

    let output = IsoForestTrainer::new(categorical_config(categorical, SplitParams::default()))
        .fit(&data)
        .unwrap();
    assert_eq!(output.forest.meta().categorical_split, CategoricalSplit::SingleCategory);

    for tree in output.forest.iso_trees().unwrap() {
        for split in splits(tree) {
            if let ColumnRef::Categorical(col) = split.column {
                let SplitCondition::Single(code) = split.condition else {
                    panic!("single-category split expected");
                };
                assert!((0..N_CATEGORIES[col] as i32).contains(&code));
            }
        }
    }
}

#[rstest]
#[case::smallest(NewCategoryAction::Smallest)]
#[case::random(NewCategoryAction::Random)]
fn unseen_categories_are_resolved_at_fit(#[case] action: NewCategoryAction) {
    // Deep trees on few rows leave categories absent at most nodes.
    let x = random_dense_f64(40, 1, 3, 0.0, 1.0);
    let codes = random_categorical(40, &N_CATEGORIES, 4, 0.0);
    let cats = CategoricalColumns::new(codes.view(), &N_CATEGORIES).unwrap();
    let data = DatasetView::new(NumericColumns::Dense(x.view()), Some(cats)).unwrap();
    let categorical = CategoricalParams {
        new_category_action: action,
        ..Default::default()
    };

    let output = IsoForestTrainer::new(categorical_config(categorical, SplitParams::default()))
        .fit(&data)
        .unwrap();
    for tree in output.forest.iso_trees().unwrap() {
        for split in splits(tree) {
            if let SplitCondition::Subset(branches) = &split.condition {
                assert!(!branches.contains(&CategoryBranch::Unseen));
            }
        }
    }
}

#[test]
fn missing_categories_follow_the_heavier_branch() {
    let x = random_dense_f64(200, 1, 5, 0.0, 1.0);
    let codes = random_categorical(200, &N_CATEGORIES, 6, 0.1);
    let cats = CategoricalColumns::new(codes.view(), &N_CATEGORIES).unwrap();
    let data = DatasetView::new(NumericColumns::Dense(x.view()), Some(cats)).unwrap();

    let output = IsoForestTrainer::new(categorical_config(CategoricalParams::default(), SplitParams::default()))
        .fit(&data)
        .unwrap();
    for tree in output.forest.iso_trees().unwrap() {
        assert_eq!(tree.subtree_rows(0), 200);
    }
}

#[rstest]
#[case::subset(CategoricalSplit::SubSet)]
#[case::single(CategoricalSplit::SingleCategory)]
fn hyperplanes_mix_numeric_and_categorical_terms(#[case] split_type: CategoricalSplit) {
    let (x, codes) = mixed_data();
    let cats = CategoricalColumns::new(codes.view(), &N_CATEGORIES).unwrap();
    let data = DatasetView::new(NumericColumns::Dense(x.view()), Some(cats)).unwrap();
    let categorical = CategoricalParams {
        split_type,
        ..Default::default()
    };

    let output = IsoForestTrainer::new(categorical_config(categorical, SplitParams::extended(4)))
        .fit(&data)
        .unwrap();
    let mut n_categorical_terms = 0;
    for tree in output.forest.hyperplane_trees().unwrap() {
        for node in tree.nodes() {
            let Node::Internal { split, .. } = node else {
                continue;
            };
            for term in &split.terms {
                match term {
                    HyperplaneTerm::Numeric { coef, .. } => assert!(coef.is_finite()),
                    HyperplaneTerm::CategoricalSubset { column, coefs, .. } => {
                        assert_eq!(split_type, CategoricalSplit::SubSet);
                        assert_eq!(coefs.len(), N_CATEGORIES[*column]);
                        n_categorical_terms += 1;
                    }
                    HyperplaneTerm::CategoricalSingle { column, category, .. } => {
                        assert_eq!(split_type, CategoricalSplit::SingleCategory);
                        assert!((0..N_CATEGORIES[*column] as i32).contains(category));
                        n_categorical_terms += 1;
                    }
                }
            }
        }
    }
    assert!(n_categorical_terms > 0);
}
