use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::metrics::{ClassificationReport, LabelDistribution};
use crate::region::Region;

#[derive(Debug, Serialize)]
struct PredictionRow {
    id: usize,
    region: Region,
}

/// Writes test predictions as CSV with header `id,region`, ids counting
/// from 1 in input order.
///
/// # Arguments
/// * `writer` - Where the CSV goes.
/// * `predictions` - One region per test record.
pub fn write_predictions<W: Write>(writer: W, predictions: &[Region]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (i, &region) in predictions.iter().enumerate() {
        csv_writer.serialize(PredictionRow { id: i + 1, region })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes test predictions to a CSV file.
pub fn save_predictions(path: &Path, predictions: &[Region]) -> Result<()> {
    let file = File::create(path)?;
    write_predictions(BufWriter::new(file), predictions)
}

/// Dev-set scores of one classifier.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierEvaluation {
    pub classifier: String,
    pub report: ClassificationReport,
    pub predicted_distribution: LabelDistribution,
}

/// Everything an evaluation run measured, for logging and saving as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub num_features: usize,
    pub train_distribution: LabelDistribution,
    pub dev_distribution: LabelDistribution,
    /// Selected terms from the highest chi-squared score down.
    pub top_terms: Vec<String>,
    pub classifiers: Vec<ClassifierEvaluation>,
}

impl EvaluationReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// The evaluation with the best macro F1, the earliest on ties.
    pub fn best(&self) -> Option<&ClassifierEvaluation> {
        self.classifiers.iter().fold(None, |best, evaluation| match best {
            Some(b) if b.report.macro_f1 >= evaluation.report.macro_f1 => Some(b),
            _ => Some(evaluation),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::NamedTempFile;

    #[test]
    fn test_write_predictions() -> Result<()> {
        let mut buffer = Vec::new();
        write_predictions(&mut buffer, &[Region::West, Region::South, Region::West])?;
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "id,region\n1,WEST\n2,SOUTH\n3,WEST\n");
        Ok(())
    }

    #[test]
    fn test_save_predictions() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let file = NamedTempFile::new()?;
        save_predictions(file.path(), &[Region::Midwest])?;
        assert_eq!(fs::read_to_string(file.path())?, "id,region\n1,MIDWEST\n");
        Ok(())
    }

    #[test]
    fn test_best_and_save() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let actual = [Region::West, Region::South];
        let evaluation = |name: &str, predicted: &[Region]| ClassifierEvaluation {
            classifier: name.to_string(),
            report: ClassificationReport::new(predicted, &actual).unwrap(),
            predicted_distribution: LabelDistribution::from_labels(predicted),
        };
        let report = EvaluationReport {
            num_features: 2,
            train_distribution: LabelDistribution::from_labels(&actual),
            dev_distribution: LabelDistribution::from_labels(&actual),
            top_terms: vec!["hella".to_string()],
            classifiers: vec![
                evaluation("majority", &[Region::West, Region::West]),
                evaluation("naive-bayes", &[Region::West, Region::South]),
            ],
        };
        assert_eq!(report.best().map(|e| e.classifier.as_str()), Some("naive-bayes"));

        let file = NamedTempFile::new()?;
        report.save(file.path())?;
        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(file.path())?)?;
        assert_eq!(saved["classifiers"][1]["classifier"], "naive-bayes");
        assert_eq!(saved["top_terms"][0], "hella");
        Ok(())
    }
}
