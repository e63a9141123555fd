use posthoc_tdp::{
    sign_flip_resamples, subset_bounds, Calibrator, FieldConfig, ResamplingConfig, VERSION,
};

fn main() {
    println!("posthoc-tdp {VERSION}");
    let field = FieldConfig {
        num_subjects: 30,
        num_voxels: 500,
        fwhm: 3.0,
        signal_fraction: 0.1,
        effect_size: 1.0,
        seed: 42,
    }
    .generate()
    .expect("synthetic field");

    let config = ResamplingConfig {
        num_resamples: 1000,
        seed: 1,
        ..ResamplingConfig::default()
    };
    let resampled = sign_flip_resamples(field.data.view(), &config).expect("resamples");

    let alpha = 0.1;
    let calibration = Calibrator::default()
        .calibrate(&resampled.resamples, alpha)
        .expect("calibration");
    println!("lambda* @ alpha={alpha}: {:.4}", calibration.lambda);

    let mut order: Vec<usize> = (0..field.active.len()).collect();
    let pvalues = resampled.observed.as_slice();
    order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));
    for size in [10, 25, 50, 75, 100] {
        let subset = &order[..size];
        let bound = subset_bounds(&resampled.observed, subset, &calibration.curve)
            .expect("bound");
        println!(
            "{size:>4} smallest: TP >= {:>3} (truth {:>3}), TDP >= {:.3}",
            bound.true_positives,
            field.count_active(subset),
            bound.tdp
        );
    }
}
