use posthoc_tdp::{AnalysisConfig, FieldConfig, Method, ResamplingConfig, TdpAnalysis};

fn main() {
    let field = FieldConfig {
        num_subjects: 20,
        num_voxels: 400,
        fwhm: 4.0,
        signal_fraction: 0.15,
        effect_size: 0.8,
        seed: 3,
    }
    .generate()
    .expect("synthetic field");

    let resampling = ResamplingConfig {
        num_resamples: 500,
        seed: 11,
        ..ResamplingConfig::default()
    };
    // A contiguous "cluster" straddling the signal boundary.
    let cluster: Vec<usize> = (40..80).collect();

    for (name, method) in [
        ("linear", Method::SignFlip),
        ("notip", Method::Notip { k_max: 100 }),
    ] {
        let config = AnalysisConfig {
            alpha: 0.1,
            method,
            resampling: resampling.clone(),
            ..AnalysisConfig::default()
        };
        let analysis = TdpAnalysis::run(field.data.view(), &config).expect("analysis");
        let bound = analysis.bounds(&cluster).expect("bound");
        println!(
            "{name:>6}: lambda*={:.4} TP >= {} of {} (truth {})",
            analysis.calibration.lambda,
            bound.true_positives,
            bound.size,
            field.count_active(&cluster)
        );
    }
}
