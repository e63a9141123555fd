use posthoc_tdp::{AnalysisConfig, FieldConfig, TdpAnalysis};

fn main() {
    let field = FieldConfig {
        num_voxels: 200,
        signal_fraction: 0.2,
        effect_size: 1.2,
        seed: 8,
        ..FieldConfig::default()
    }
    .generate()
    .expect("synthetic field");

    let analysis =
        TdpAnalysis::run(field.data.view(), &AnalysisConfig::default()).expect("analysis");
    let envelope = analysis.envelope().expect("envelope");
    for (i, fp) in envelope.iter().enumerate().step_by(20) {
        let size = i + 1;
        println!(
            "top {size:>3}: FP <= {fp:>3}, TDP >= {:.3}",
            1.0 - *fp as f64 / size as f64
        );
    }
}
