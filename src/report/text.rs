use crate::model::metrics::ConfusionMatrix;
use crate::report::{SummaryData, class_label, format_f64_4};

const CORNER: &str = "true\\pred";

pub fn render_report_text(data: &SummaryData, class_names: &[&str], elapsed_secs: f64) -> String {
    let mut out = String::new();

    out.push_str("Nested Bootstrap Accuracy Report\n");
    out.push_str("================================\n\n");

    out.push_str("1. Run\n");
    out.push_str(&format!("Tool: {} {}\n", data.tool, data.version));
    out.push_str(&format!("Classification task: {}\n", data.task));
    out.push_str(&format!("Seed: {}\n", data.seed));
    out.push_str(&format!("Bootstrap samples: {}\n", data.num_samples));
    out.push_str(&format!(
        "Candidate subjects: {} ({} unique)\n\n",
        data.n_candidates, data.n_unique_subjects
    ));

    out.push_str("2. Confidence interval\n");
    let coverage = data.upper_percentile - data.lower_percentile;
    out.push_str(&format!(
        "{}% interval ({} / {} percentiles): [{}, {}] width {}\n",
        format_f64_4(coverage),
        format_f64_4(data.lower_percentile),
        format_f64_4(data.upper_percentile),
        format_f64_4(data.interval.lower),
        format_f64_4(data.interval.upper),
        format_f64_4(data.interval.width())
    ));
    out.push_str(&format!(
        "Observed mean accuracy: {}\n",
        format_f64_4(data.observed_mean_accuracy)
    ));
    out.push_str(&format!(
        "Bootstrap mean: {} (sd {})\n\n",
        format_f64_4(data.sample_mean),
        format_f64_4(data.sample_std)
    ));

    out.push_str("3. Subjects\n");
    for s in &data.subjects {
        let val = s
            .val_accuracy
            .map(format_f64_4)
            .unwrap_or_else(|| "NA".to_string());
        out.push_str(&format!(
            "subject {}: chunks={} correct={} test_accuracy={} val_accuracy={}\n",
            s.subject,
            s.confusion.total(),
            s.confusion.correct(),
            format_f64_4(s.observed_accuracy),
            val
        ));
        out.push_str(&render_confusion(&s.confusion, class_names));
    }
    out.push('\n');

    out.push_str(&format!("program_time: {:.2} seconds\n", elapsed_secs));
    out
}

pub fn render_confusion(cm: &ConfusionMatrix, class_names: &[&str]) -> String {
    let labels: Vec<String> = (0..cm.n_classes)
        .map(|i| class_label(class_names, i))
        .collect();
    let width = labels.iter().map(String::len).max().unwrap_or(0).max(CORNER.len());

    let mut out = String::new();
    out.push_str(&format!("  {:>width$} |", CORNER));
    for label in &labels {
        out.push_str(&format!(" {:>width$}", label));
    }
    out.push('\n');
    for (i, row) in cm.counts.iter().enumerate() {
        out.push_str(&format!("  {:>width$} |", labels[i]));
        for count in row {
            out.push_str(&format!(" {:>width$}", count));
        }
        out.push('\n');
    }
    out
}
