use std::num::NonZeroUsize;

use isoforest::data::DatasetView;
use isoforest::model::{IsoForestConfig, SamplingParams, SplitParams};
use isoforest::testing::data::random_dense_f64;
use isoforest::training::IsoForestTrainer;
use rstest::rstest;

fn config(threads: usize, split: SplitParams) -> IsoForestConfig {
    IsoForestConfig::builder()
        .n_trees(24)
        .seed(7)
        .split(split)
        .sampling(SamplingParams {
            sample_size: Some(64),
            ..Default::default()
        })
        .n_threads(NonZeroUsize::new(threads).unwrap())
        .build()
        .unwrap()
}

#[rstest]
#[case::random(SplitParams::random())]
#[case::gain(SplitParams { prob_pick_pooled_gain: 0.5, prob_pick_avg_gain: 0.3, ntry: 3, ..Default::default() })]
#[case::kurtosis(SplitParams { weigh_by_kurtosis: true, ..Default::default() })]
#[case::extended(SplitParams { ndim: 3, prob_pick_avg_gain: 0.5, ..Default::default() })]
fn identical_forests_across_thread_counts(#[case] split: SplitParams) {
    let x = random_dense_f64(300, 4, 11, -2.0, 2.0);
    let data = DatasetView::from_dense(x.view()).unwrap();

    let sequential = IsoForestTrainer::new(config(1, split.clone())).fit(&data).unwrap();
    let parallel = IsoForestTrainer::new(config(4, split)).fit(&data).unwrap();

    assert_eq!(sequential.forest, parallel.forest);
}

#[test]
fn seed_changes_the_forest() {
    let x = random_dense_f64(200, 3, 2, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();

    let a = IsoForestTrainer::new(config(1, SplitParams::random())).fit(&data).unwrap();
    let mut other = config(1, SplitParams::random());
    other.seed = 8;
    let b = IsoForestTrainer::new(other).fit(&data).unwrap();

    assert_ne!(a.forest, b.forest);
}

#[test]
fn repeated_fits_are_identical() {
    let x = random_dense_f64(150, 3, 5, 0.0, 10.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let trainer = IsoForestTrainer::new(config(2, SplitParams::random()));
    assert_eq!(trainer.fit(&data).unwrap().forest, trainer.fit(&data).unwrap().forest);
}
