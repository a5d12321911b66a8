use approx::assert_abs_diff_eq;
use isoforest::data::{CscView, DatasetView};
use isoforest::model::{ConfigError, InterruptBehavior, IsoForestConfig, OutputParams, SamplingParams};
use isoforest::testing::data::{random_csc, random_dense_f64};
use isoforest::training::{CancellationToken, FitError, FitStatus, IsoForestTrainer, n_pairs, tmat_to_dense};
use ndarray::Array1;

fn output_config(output: OutputParams) -> IsoForestConfig {
    IsoForestConfig::builder().n_trees(20).output(output).build().unwrap()
}

#[test]
fn distances_form_a_symmetric_matrix() {
    let x = random_dense_f64(50, 3, 41, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let output = IsoForestTrainer::new(output_config(OutputParams {
        distances: true,
        ..Default::default()
    }))
    .fit(&data)
    .unwrap();

    let dist = output.distances.unwrap();
    assert_eq!(dist.len(), n_pairs(50));
    assert!(dist.iter().all(|&d| d > 0.0 && d <= 1.0));

    let dense = tmat_to_dense(&dist, 50, 0.0);
    for i in 0..50 {
        assert_eq!(dense[[i, i]], 0.0);
        for j in 0..50 {
            assert_eq!(dense[[i, j]], dense[[j, i]]);
        }
    }
}

#[test]
fn raw_distances_are_average_separation_depths() {
    let x = random_dense_f64(40, 2, 42, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let output = IsoForestTrainer::new(output_config(OutputParams {
        distances: true,
        standardize_dist: false,
        ..Default::default()
    }))
    .fit(&data)
    .unwrap();

    // Every pair is separated somewhere below the root.
    let dist = output.distances.unwrap();
    assert!(dist.iter().all(|&d| d.is_finite() && d >= 0.0));
    assert!(dist.iter().any(|&d| d > 0.0));
}

#[test]
fn distances_reject_sample_weights() {
    let x = random_dense_f64(30, 2, 43, 0.0, 1.0);
    let weights = Array1::from_elem(30, 1.0);
    let data = DatasetView::from_dense(x.view())
        .unwrap()
        .with_sample_weights(weights.view())
        .unwrap();
    let err = IsoForestTrainer::new(output_config(OutputParams {
        distances: true,
        ..Default::default()
    }))
    .fit(&data)
    .unwrap_err();
    assert!(matches!(err, FitError::Config(ConfigError::DistancesWithSampleWeights)));
}

#[test]
fn standardized_depths_are_scores() {
    let x = random_dense_f64(120, 3, 44, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let output = IsoForestTrainer::new(output_config(OutputParams {
        depths: true,
        ..Default::default()
    }))
    .fit(&data)
    .unwrap();

    let depths = output.depths.unwrap();
    assert_eq!(depths.len(), 120);
    assert!(depths.iter().all(|&d| d > 0.0 && d <= 1.0));
    // Uniform data scores close to 0.5 on average.
    let mean = depths.mean().unwrap();
    assert!(mean > 0.3 && mean < 0.7, "mean score {mean}");
}

#[test]
fn rows_never_drawn_have_no_depth() {
    let x = random_dense_f64(200, 2, 45, 0.0, 1.0);
    let weights = Array1::from_shape_fn(200, |i| if i < 20 { 0.0 } else { 1.0 });
    let data = DatasetView::from_dense(x.view())
        .unwrap()
        .with_sample_weights(weights.view())
        .unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(30)
        .sampling(SamplingParams {
            sample_size: Some(100),
            ..Default::default()
        })
        .output(OutputParams {
            depths: true,
            standardize_depth: false,
            ..Default::default()
        })
        .build()
        .unwrap();

    let depths = IsoForestTrainer::new(config).fit(&data).unwrap().depths.unwrap();
    assert!(depths.iter().take(20).all(|d| d.is_nan()));
    assert!(depths.iter().skip(20).all(|d| d.is_finite()));
}

#[test]
fn rows_outside_every_sample_have_no_depth() {
    let x = random_dense_f64(200, 2, 50, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let config = |standardize_depth| {
        IsoForestConfig::builder()
            .n_trees(1)
            .sampling(SamplingParams {
                sample_size: Some(10),
                ..Default::default()
            })
            .output(OutputParams {
                depths: true,
                standardize_depth,
                ..Default::default()
            })
            .build()
            .unwrap()
    };

    // One tree over 10 of 200 rows: the other 190 were never drawn.
    for standardize in [false, true] {
        let depths = IsoForestTrainer::new(config(standardize)).fit(&data).unwrap().depths.unwrap();
        assert_eq!(depths.len(), 200);
        assert_eq!(depths.iter().filter(|d| d.is_finite()).count(), 10);
        assert_eq!(depths.iter().filter(|d| d.is_nan()).count(), 190);
    }
}

#[test]
fn density_weights_scale_leaf_weights() {
    let x = random_dense_f64(100, 2, 46, 0.0, 1.0);
    let weights = Array1::from_shape_fn(100, |i| if i % 2 == 0 { 3.0 } else { 1.0 });
    let data = DatasetView::from_dense(x.view())
        .unwrap()
        .with_sample_weights(weights.view())
        .unwrap();
    let config = IsoForestConfig::builder()
        .n_trees(10)
        .sampling(SamplingParams {
            weights_as_sample_prob: false,
            ..Default::default()
        })
        .output(OutputParams {
            depths: true,
            ..Default::default()
        })
        .build()
        .unwrap();

    let output = IsoForestTrainer::new(config).fit(&data).unwrap();
    assert!(output.depths.unwrap().iter().all(|d| d.is_finite()));
    for tree in output.forest.iso_trees().unwrap() {
        // Weights are rescaled to sum to the sample size.
        let total: f64 = tree.leaves().map(|(_, leaf)| leaf.weight).sum();
        assert_abs_diff_eq!(total, 100.0, epsilon = 1e-9);
    }
}

#[test]
fn sparse_input_fits() {
    let (values, row_indices, col_ptr) = random_csc(150, 4, 0.3, 47);
    let csc = CscView::new(&values, &row_indices, &col_ptr, 150).unwrap();
    let data = DatasetView::from_sparse(csc).unwrap();
    let output = IsoForestTrainer::new(output_config(OutputParams {
        depths: true,
        ..Default::default()
    }))
    .fit(&data)
    .unwrap();

    output.forest.validate().unwrap();
    assert_eq!(output.forest.n_trees(), 20);
    assert!(output.depths.unwrap().iter().all(|d| d.is_finite()));
}

#[test]
fn cancelled_fit_reports_interruption() {
    let x = random_dense_f64(100, 2, 48, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let output = IsoForestTrainer::new(output_config(OutputParams {
        depths: true,
        ..Default::default()
    }))
    .fit_with_cancellation(&data, &cancel)
    .unwrap();
    assert_eq!(output.status, FitStatus::Interrupted);
    assert!(output.is_interrupted());
    assert_eq!(output.forest.n_trees(), 0);
    assert!(output.depths.is_none());
}

#[test]
fn cancelled_fit_can_fail() {
    let x = random_dense_f64(100, 2, 49, 0.0, 1.0);
    let data = DatasetView::from_dense(x.view()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let config = IsoForestConfig::builder()
        .interrupt_behavior(InterruptBehavior::Error)
        .build()
        .unwrap();

    let err = IsoForestTrainer::new(config)
        .fit_with_cancellation(&data, &cancel)
        .unwrap_err();
    assert!(matches!(err, FitError::Interrupted));
}
