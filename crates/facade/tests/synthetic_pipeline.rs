use posthoc_tdp::{
    sign_flip_resamples, subset_bounds, AnalysisConfig, Calibrator, FieldConfig, Method,
    ResamplingConfig, TdpAnalysis,
};

fn smallest(pvalues: &[f64], count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pvalues.len()).collect();
    order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));
    order.truncate(count);
    order
}

#[test]
fn true_positive_bound_respects_ground_truth() {
    let alpha = 0.1;
    let seeds = 60u64;
    let mut violations = 0;
    let mut certified = 0;
    for seed in 0..seeds {
        let field = FieldConfig {
            num_subjects: 20,
            num_voxels: 300,
            fwhm: 2.0,
            signal_fraction: 0.1,
            effect_size: 1.5,
            seed,
        }
        .generate()
        .unwrap();
        let config = ResamplingConfig {
            num_resamples: 200,
            seed: 100 + seed,
            ..ResamplingConfig::default()
        };
        let resampled = sign_flip_resamples(field.data.view(), &config).unwrap();
        let calibration = Calibrator::default()
            .calibrate(&resampled.resamples, alpha)
            .unwrap();

        let subset = smallest(resampled.observed.as_slice(), 75);
        let bound = subset_bounds(&resampled.observed, &subset, &calibration.curve).unwrap();
        assert_eq!(bound.size, 75);
        certified += bound.true_positives;
        if bound.true_positives > field.count_active(&subset) {
            violations += 1;
        }
    }
    // Each seed overstates with probability at most alpha.
    let rate = violations as f64 / seeds as f64;
    let tolerance = 3.0 * (alpha * (1.0 - alpha) / seeds as f64).sqrt();
    assert!(
        rate <= alpha + tolerance,
        "{violations} of {seeds} seeds overstated the true positives"
    );
    assert!(certified > 0, "no true positives were ever certified");
}

#[test]
fn pipeline_detects_signal_with_every_method() {
    let field = FieldConfig {
        num_subjects: 20,
        num_voxels: 120,
        fwhm: 3.0,
        signal_fraction: 0.2,
        effect_size: 2.5,
        seed: 4,
    }
    .generate()
    .unwrap();
    let active: Vec<usize> = (0..24).collect();

    for method in [
        Method::SignFlip,
        Method::Bootstrap,
        Method::Notip { k_max: 30 },
    ] {
        let config = AnalysisConfig {
            alpha: 0.1,
            method,
            resampling: ResamplingConfig {
                num_resamples: 300,
                seed: 21,
                ..ResamplingConfig::default()
            },
            ..AnalysisConfig::default()
        };
        let analysis = TdpAnalysis::run(field.data.view(), &config).unwrap();
        let bound = analysis.bounds(&active).unwrap();
        assert!(bound.true_positives > 0);
        assert!(bound.tdp > 0.0 && bound.tdp <= 1.0);
        assert!((bound.fdp + bound.tdp - 1.0).abs() < 1e-12);
    }
}
