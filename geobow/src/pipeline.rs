use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::info;

use crate::classifier::{Classifier, ClassifierKind, ClassifierOptions};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::metrics::{ClassificationReport, LabelDistribution};
use crate::region::Region;
use crate::report::{ClassifierEvaluation, EvaluationReport};
use crate::selector::{FeatureSelector, SelectedFeatures};
use crate::vocabulary::Vocabulary;

/// Number of terms kept by feature selection unless configured otherwise.
pub const DEFAULT_NUM_FEATURES: usize = 500;

/// Where a run reads its inputs and how it selects features and trains.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub vocabulary_path: PathBuf,
    pub train_path: PathBuf,
    pub dev_path: Option<PathBuf>,
    pub test_path: Option<PathBuf>,
    pub num_features: usize,
    pub classifier_options: ClassifierOptions,
}

impl PipelineConfig {
    pub fn new(vocabulary_path: PathBuf, train_path: PathBuf) -> Self {
        PipelineConfig {
            vocabulary_path,
            train_path,
            dev_path: None,
            test_path: None,
            num_features: DEFAULT_NUM_FEATURES,
            classifier_options: ClassifierOptions::default(),
        }
    }
}

/// The datasets of a run after projection onto the selected features.
#[derive(Debug)]
pub struct Prepared {
    pub vocabulary: Vocabulary,
    pub selected: SelectedFeatures,
    pub train: Dataset,
    pub dev: Option<Dataset>,
    pub test: Option<Dataset>,
}

impl Prepared {
    /// Selected terms in vocabulary order with their chi-squared scores.
    pub fn scored_terms(&self) -> Vec<(String, Option<f64>)> {
        self.selected
            .columns()
            .iter()
            .zip(self.selected.scores())
            .filter_map(|(&j, &score)| {
                self.vocabulary
                    .term_of(j)
                    .map(|term| (term.to_string(), score))
            })
            .collect()
    }

    /// Selected terms from the highest chi-squared score down.
    pub fn top_terms(&self, n: usize) -> Vec<String> {
        self.selected
            .ranked()
            .iter()
            .take(n)
            .filter_map(|&j| self.vocabulary.term_of(j).map(str::to_string))
            .collect()
    }
}

/// Pipeline runs the whole experiment: it decodes the three datasets
/// against one vocabulary, selects features on the training data only,
/// projects every dataset onto them, then fits and scores classifiers.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a new instance of [`Pipeline`].
    ///
    /// # Arguments
    /// * `config` - Input paths, number of features, and classifier options.
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads the vocabulary and every configured dataset, fits feature
    /// selection on the training set, and projects all datasets.
    ///
    /// # Returns
    /// Returns the projected datasets together with the vocabulary and the
    /// selected features.
    ///
    /// # Errors
    /// Returns an error if an input cannot be read or decoded, or if the
    /// number of features does not fit the vocabulary.
    pub fn prepare(&self) -> Result<Prepared> {
        let vocabulary = Vocabulary::from_path(&self.config.vocabulary_path)?;

        // The three builds only read the vocabulary, so they can run side by side.
        let (train, (dev, test)) = rayon::join(
            || Dataset::load("train", &self.config.train_path, &vocabulary, true),
            || {
                rayon::join(
                    || load_optional("dev", self.config.dev_path.as_deref(), &vocabulary, true),
                    || load_optional("test", self.config.test_path.as_deref(), &vocabulary, false),
                )
            },
        );
        let (train, dev, test) = (train?, dev?, test?);

        let distribution = train.label_distribution();
        let total = distribution.total() as f64;
        for (region, count) in distribution.iter() {
            info!(
                "train {}: {} ({:.1}%)",
                region,
                count,
                100.0 * count as f64 / total
            );
        }

        let selected = FeatureSelector::new(self.config.num_features)
            .fit(&train.matrix, &train.labels)?;

        let project = |dataset: &Dataset| -> Result<Dataset> {
            dataset.with_matrix(selected.transform(&dataset.matrix)?)
        };
        let train = project(&train)?;
        let dev = dev.as_ref().map(project).transpose()?;
        let test = test.as_ref().map(project).transpose()?;

        Ok(Prepared {
            vocabulary,
            selected,
            train,
            dev,
            test,
        })
    }

    /// Fits each classifier on the training set and scores it on the dev set.
    ///
    /// # Arguments
    /// * `prepared` - The output of [`Pipeline::prepare`]; it must hold a dev set.
    /// * `kinds` - The classifiers to compare.
    /// * `running` - Cleared to stop iterative training early.
    ///
    /// # Returns
    /// Returns the evaluation report with one entry per classifier.
    pub fn evaluate(
        &self,
        prepared: &Prepared,
        kinds: &[ClassifierKind],
        running: Arc<AtomicBool>,
    ) -> Result<EvaluationReport> {
        let dev = prepared
            .dev
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("evaluation needs a dev dataset".to_string()))?;

        let mut classifiers = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let classifier = self.fit(prepared, kind, running.clone())?;
            let predicted = classifier.predict(&dev.matrix)?;
            let report = ClassificationReport::new(&predicted, &dev.labels)?;
            info!(
                "{}: accuracy {:.4}, macro F1 {:.4}",
                kind, report.accuracy, report.macro_f1
            );
            classifiers.push(ClassifierEvaluation {
                classifier: kind.to_string(),
                predicted_distribution: LabelDistribution::from_labels(&predicted),
                report,
            });
        }

        Ok(EvaluationReport {
            num_features: prepared.selected.len(),
            train_distribution: prepared.train.label_distribution(),
            dev_distribution: dev.label_distribution(),
            top_terms: prepared.top_terms(20),
            classifiers,
        })
    }

    /// Fits one classifier on the training set and predicts the test set.
    ///
    /// # Returns
    /// Returns one predicted region per test record, in input order.
    pub fn predict(
        &self,
        prepared: &Prepared,
        kind: ClassifierKind,
        running: Arc<AtomicBool>,
    ) -> Result<Vec<Region>> {
        let test = prepared
            .test
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("prediction needs a test dataset".to_string()))?;

        let classifier = self.fit(prepared, kind, running)?;
        let predicted = classifier.predict(&test.matrix)?;
        info!("predicted {} test rows with {}", predicted.len(), kind);
        Ok(predicted)
    }

    fn fit(
        &self,
        prepared: &Prepared,
        kind: ClassifierKind,
        running: Arc<AtomicBool>,
    ) -> Result<Box<dyn Classifier>> {
        let mut classifier = kind.build(&self.config.classifier_options);
        info!(
            "fitting {} on {} rows x {} features",
            classifier.name(),
            prepared.train.len(),
            prepared.train.matrix.n_cols()
        );
        classifier.fit(&prepared.train.matrix, &prepared.train.labels, running)?;
        Ok(classifier)
    }
}

fn load_optional(
    name: &str,
    path: Option<&Path>,
    vocabulary: &Vocabulary,
    labelled: bool,
) -> Result<Option<Dataset>> {
    path.map(|path| Dataset::load(name, path, vocabulary, labelled))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn write_file(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        for line in lines {
            writeln!(file, "{}", line).expect("Failed to write line");
        }
        file
    }

    #[test]
    fn test_prepare_projects_all_datasets() -> Result<()> {
        let vocabulary = write_file(&["a\t0", "b\t1", "c\t2"]);
        let train = write_file(&["region,counts", "MIDWEST,\"[(0, 2), (2, 1)]\""]);
        let dev = write_file(&["region,counts", "SOUTH,\"[(1, 5), (2, 3)]\""]);
        let test = write_file(&["id,counts", "1,\"[(0, 1)]\""]);

        let mut config = PipelineConfig::new(
            vocabulary.path().to_path_buf(),
            train.path().to_path_buf(),
        );
        config.dev_path = Some(dev.path().to_path_buf());
        config.test_path = Some(test.path().to_path_buf());
        config.num_features = 2;

        let prepared = Pipeline::new(config).prepare()?;
        assert_eq!(prepared.selected.columns(), &[0, 2]);
        assert_eq!(prepared.train.matrix.row_to_dense(0), vec![2, 1]);

        let dev = prepared.dev.as_ref().unwrap();
        assert_eq!(dev.matrix.row_to_dense(0), vec![0, 3]);
        assert_eq!(dev.labels, vec![Region::South]);

        let test = prepared.test.as_ref().unwrap();
        assert_eq!(test.matrix.n_cols(), 2);
        assert!(test.labels.is_empty());
        assert_eq!(prepared.top_terms(5), vec!["a".to_string(), "c".to_string()]);

        // one training row: both selected columns score zero
        let scored = prepared.scored_terms();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].0, "a");
        assert_eq!(scored[1].0, "c");
        assert!(scored.iter().all(|(_, score)| score.map_or(false, |s| s.abs() < 1e-12)));
        Ok(())
    }

    #[test]
    fn test_prepare_rejects_large_k() {
        let vocabulary = write_file(&["a\t0"]);
        let train = write_file(&["region,counts", "WEST,\"[(0, 1)]\""]);
        let config = PipelineConfig::new(
            vocabulary.path().to_path_buf(),
            train.path().to_path_buf(),
        );

        assert!(matches!(
            Pipeline::new(config).prepare(),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_evaluate_without_dev() -> Result<()> {
        let vocabulary = write_file(&["a\t0", "b\t1"]);
        let train = write_file(&["region,counts", "WEST,\"[(0, 1)]\""]);
        let mut config = PipelineConfig::new(
            vocabulary.path().to_path_buf(),
            train.path().to_path_buf(),
        );
        config.num_features = 1;

        let pipeline = Pipeline::new(config);
        let prepared = pipeline.prepare()?;
        let running = Arc::new(AtomicBool::new(true));
        assert!(pipeline
            .evaluate(&prepared, &ClassifierKind::ALL, running.clone())
            .is_err());
        assert!(pipeline
            .predict(&prepared, ClassifierKind::Majority, running)
            .is_err());
        Ok(())
    }
}
