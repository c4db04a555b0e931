use crate::error::{AnalysisError, AnalysisResult};
use crate::nlp::TextCleaner;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tubesense_core::config::ModelConfig;
use tubesense_core::Sentiment;

/// Current on-disk format of [`PipelineArtifact`].
pub const PIPELINE_FORMAT_VERSION: u32 = 1;

/// Model type recorded in pipeline artifacts.
pub const PIPELINE_MODEL_TYPE: &str = "LogisticRegressionPipeline";

/// Serialized bag-of-words logistic-regression pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineArtifact {
    /// Artifact format version.
    pub format_version: u32,
    /// Model family name.
    pub model_type: String,
    /// Token to feature index.
    pub vocabulary: HashMap<String, usize>,
    /// One weight per feature.
    pub coefficients: Vec<f64>,
    /// Bias term.
    pub intercept: f64,
    /// Class values for negative and positive decision scores.
    pub classes: Vec<i64>,
    /// Lowercase text before tokenizing.
    #[serde(default = "default_true")]
    pub lowercase: bool,
}

fn default_true() -> bool {
    true
}

impl PipelineArtifact {
    /// Read an artifact from a JSON file.
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::ModelLoading(format!("failed to read {}: {}", path.display(), e))
        })?;
        let artifact: Self = serde_json::from_str(&raw).map_err(|e| {
            AnalysisError::ModelLoading(format!("failed to parse {}: {}", path.display(), e))
        })?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact as pretty JSON.
    pub fn save(&self, path: &Path) -> AnalysisResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Check internal consistency.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.format_version != PIPELINE_FORMAT_VERSION {
            return Err(AnalysisError::ModelLoading(format!(
                "unsupported pipeline format version {}",
                self.format_version
            )));
        }
        if self.classes.len() != 2 {
            return Err(AnalysisError::ModelLoading(format!(
                "expected 2 classes, found {}",
                self.classes.len()
            )));
        }
        if self.coefficients.len() != self.vocabulary.len() {
            return Err(AnalysisError::ModelLoading(format!(
                "coefficient count {} does not match vocabulary size {}",
                self.coefficients.len(),
                self.vocabulary.len()
            )));
        }
        if let Some((token, idx)) = self
            .vocabulary
            .iter()
            .find(|(_, idx)| **idx >= self.coefficients.len())
        {
            return Err(AnalysisError::ModelLoading(format!(
                "vocabulary index {} for '{}' is out of range",
                idx, token
            )));
        }
        Ok(())
    }
}

/// Optional word-index tokenizer exported next to the deep model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerArtifact {
    /// Word to sequence index.
    pub word_index: HashMap<String, usize>,
    /// Vocabulary cap used when the tokenizer was fitted.
    #[serde(default)]
    pub num_words: Option<usize>,
}

impl TokenizerArtifact {
    /// Read a tokenizer from a JSON file.
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            AnalysisError::ModelLoading(format!("failed to parse {}: {}", path.display(), e))
        })
    }
}

/// Token counter over a fixed vocabulary.
pub struct CountVectorizer {
    vocabulary: HashMap<String, usize>,
    lowercase: bool,
    token_regex: Regex,
}

impl CountVectorizer {
    /// Create a vectorizer over the given vocabulary.
    pub fn new(vocabulary: HashMap<String, usize>, lowercase: bool) -> AnalysisResult<Self> {
        Ok(Self {
            vocabulary,
            lowercase,
            token_regex: token_regex()?,
        })
    }

    /// Split text into tokens of two or more word characters.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize_with(&self.token_regex, text, self.lowercase)
    }

    /// Sparse count vector as sorted `(feature, count)` pairs.
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in self.tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        let mut features: Vec<_> = counts.into_iter().collect();
        features.sort_by_key(|(idx, _)| *idx);
        features
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    /// True when the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }
}

fn token_regex() -> AnalysisResult<Regex> {
    Regex::new(r"\b\w\w+\b").map_err(|e| AnalysisError::Nlp(e.to_string()))
}

fn tokenize_with(regex: &Regex, text: &str, lowercase: bool) -> Vec<String> {
    let text = if lowercase {
        text.to_lowercase()
    } else {
        text.to_string()
    };
    regex
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Trait for binary text classification models.
pub trait ClassificationModel: Send + Sync {
    /// Predict the class value for an already-cleaned text.
    fn predict(&self, text: &str) -> i64;

    /// Probability of each class, in class order.
    fn predict_proba(&self, text: &str) -> [f64; 2];

    /// Class values in probability order.
    fn classes(&self) -> [i64; 2];

    /// Number of input features.
    fn feature_count(&self) -> usize;

    /// Model family name.
    fn model_type(&self) -> &str;
}

/// Count vectorizer followed by logistic regression.
pub struct LogisticPipeline {
    vectorizer: CountVectorizer,
    coefficients: Vec<f64>,
    intercept: f64,
    classes: [i64; 2],
    model_type: String,
}

impl LogisticPipeline {
    /// Build a pipeline from a validated artifact.
    pub fn from_artifact(artifact: PipelineArtifact) -> AnalysisResult<Self> {
        artifact.validate()?;
        Ok(Self {
            vectorizer: CountVectorizer::new(artifact.vocabulary, artifact.lowercase)?,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
            classes: [artifact.classes[0], artifact.classes[1]],
            model_type: artifact.model_type,
        })
    }

    /// Load a pipeline artifact from disk.
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        Self::from_artifact(PipelineArtifact::load(path)?)
    }

    /// Raw decision score; positive values select the second class.
    pub fn decision(&self, text: &str) -> f64 {
        self.vectorizer
            .transform(text)
            .into_iter()
            .fold(self.intercept, |acc, (idx, count)| {
                acc + self.coefficients[idx] * count
            })
    }
}

impl ClassificationModel for LogisticPipeline {
    fn predict(&self, text: &str) -> i64 {
        if self.decision(text) > 0.0 {
            self.classes[1]
        } else {
            self.classes[0]
        }
    }

    fn predict_proba(&self, text: &str) -> [f64; 2] {
        let p1 = sigmoid(self.decision(text));
        [1.0 - p1, p1]
    }

    fn classes(&self) -> [i64; 2] {
        self.classes
    }

    fn feature_count(&self) -> usize {
        self.vectorizer.len()
    }

    fn model_type(&self) -> &str {
        &self.model_type
    }
}

/// Description of the loaded model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    /// Model family, `None` when nothing is loaded.
    pub model_type: Option<String>,
    /// Number of input features.
    pub feature_count: Option<usize>,
    /// Whether inference is available.
    pub model_loaded: bool,
    /// Whether the optional tokenizer artifact was found.
    pub tokenizer_loaded: bool,
}

/// Cleans comments and classifies them with the loaded model.
pub struct SentimentAnalyzer {
    cleaner: TextCleaner,
    model: Option<Arc<dyn ClassificationModel>>,
    tokenizer: Option<TokenizerArtifact>,
}

impl SentimentAnalyzer {
    /// Load the pipeline and optional tokenizer named by the configuration.
    ///
    /// A missing or broken pipeline leaves the analyzer unloaded instead of failing,
    /// so the service can still start and report the problem.
    pub fn load(config: &ModelConfig) -> AnalysisResult<Self> {
        let mut analyzer = Self::unloaded()?;

        let pipeline_path = config.pipeline_path();
        match LogisticPipeline::load(&pipeline_path) {
            Ok(pipeline) => {
                info!(
                    "Loaded sentiment pipeline from {} ({} features)",
                    pipeline_path.display(),
                    pipeline.feature_count()
                );
                analyzer.model = Some(Arc::new(pipeline));
            }
            Err(e) => warn!("Sentiment model not loaded: {}", e),
        }

        let tokenizer_path = config.tokenizer_path();
        if tokenizer_path.exists() {
            match TokenizerArtifact::load(&tokenizer_path) {
                Ok(tokenizer) => analyzer.tokenizer = Some(tokenizer),
                Err(e) => warn!("Ignoring unreadable tokenizer: {}", e),
            }
        }

        Ok(analyzer)
    }

    /// Analyzer with no model attached.
    pub fn unloaded() -> AnalysisResult<Self> {
        Ok(Self {
            cleaner: TextCleaner::new()?,
            model: None,
            tokenizer: None,
        })
    }

    /// Analyzer backed by the given model.
    pub fn with_model(model: Arc<dyn ClassificationModel>) -> AnalysisResult<Self> {
        let mut analyzer = Self::unloaded()?;
        analyzer.model = Some(model);
        Ok(analyzer)
    }

    /// Whether a model is available for inference.
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Apply the training-time cleaning pipeline.
    pub fn clean_text(&self, text: &str) -> String {
        self.cleaner.clean(text)
    }

    fn model(&self) -> AnalysisResult<&Arc<dyn ClassificationModel>> {
        self.model.as_ref().ok_or(AnalysisError::ModelNotLoaded)
    }

    /// Classify one comment. Text with nothing left after cleaning counts as positive.
    pub fn analyze(&self, text: &str) -> AnalysisResult<Sentiment> {
        let model = self.model()?;
        let cleaned = self.cleaner.clean(text);
        if cleaned.is_empty() {
            return Ok(Sentiment::Positive);
        }
        score_to_sentiment(model.predict(&cleaned))
    }

    /// Classify many comments, preserving order.
    pub fn analyze_batch<S: AsRef<str>>(&self, texts: &[S]) -> AnalysisResult<Vec<Sentiment>> {
        let model = self.model()?;
        texts
            .iter()
            .map(|text| {
                let cleaned = self.cleaner.clean(text.as_ref());
                if cleaned.is_empty() {
                    Ok(Sentiment::Positive)
                } else {
                    score_to_sentiment(model.predict(&cleaned))
                }
            })
            .collect()
    }

    /// Classify one comment and report the probability of the chosen class.
    pub fn analyze_with_confidence(&self, text: &str) -> AnalysisResult<(Sentiment, f64)> {
        let model = self.model()?;
        let cleaned = self.cleaner.clean(text);
        if cleaned.is_empty() {
            return Ok((Sentiment::Positive, 0.5));
        }
        let probabilities = model.predict_proba(&cleaned);
        let best = if probabilities[1] > probabilities[0] { 1 } else { 0 };
        let sentiment = score_to_sentiment(model.classes()[best])?;
        Ok((sentiment, probabilities[best]))
    }

    /// Describe the loaded model.
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_type: self.model.as_ref().map(|m| m.model_type().to_string()),
            feature_count: self.model.as_ref().map(|m| m.feature_count()),
            model_loaded: self.model.is_some(),
            tokenizer_loaded: self.tokenizer.is_some(),
        }
    }
}

fn score_to_sentiment(score: i64) -> AnalysisResult<Sentiment> {
    Sentiment::from_score(score)
        .ok_or_else(|| AnalysisError::InvalidInput(format!("model returned unknown class {}", score)))
}

/// One labelled training example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    /// Raw comment text.
    pub text: String,
    /// 0 for positive, 1 for negative.
    pub label: i64,
}

/// Hyper-parameters for [`train_pipeline`].
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    /// Full-batch gradient descent passes.
    pub epochs: usize,
    /// Step size.
    pub learning_rate: f64,
    /// L2 penalty strength.
    pub l2: f64,
    /// Tokens must appear in at least this many documents.
    pub min_document_frequency: usize,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 0.5,
            l2: 1e-3,
            min_document_frequency: 1,
        }
    }
}

/// Read JSON-lines training data (`{"text": ..., "label": 0|1}` per line).
pub fn load_training_samples(path: &Path) -> AnalysisResult<Vec<TrainingSample>> {
    let raw = std::fs::read_to_string(path)?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(lineno, line)| {
            serde_json::from_str::<TrainingSample>(line).map_err(|e| {
                AnalysisError::InvalidInput(format!("line {}: {}", lineno + 1, e))
            })
        })
        .collect()
}

/// Fit a count-vectorizer + logistic-regression pipeline on cleaned texts.
pub fn train_pipeline(
    cleaner: &TextCleaner,
    samples: &[TrainingSample],
    options: &TrainingOptions,
) -> AnalysisResult<PipelineArtifact> {
    if samples.iter().any(|s| s.label != 0 && s.label != 1) {
        return Err(AnalysisError::Training(
            "labels must be 0 (positive) or 1 (negative)".to_string(),
        ));
    }
    if !samples.iter().any(|s| s.label == 0) || !samples.iter().any(|s| s.label == 1) {
        return Err(AnalysisError::Training(
            "training data needs both positive and negative samples".to_string(),
        ));
    }

    let regex = token_regex()?;
    let documents: Vec<Vec<String>> = samples
        .iter()
        .map(|s| tokenize_with(&regex, &cleaner.clean(&s.text), true))
        .collect();

    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for tokens in &documents {
        let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
        for token in unique {
            *document_frequency.entry(token).or_insert(0) += 1;
        }
    }
    let kept: BTreeSet<&str> = document_frequency
        .into_iter()
        .filter(|(_, df)| *df >= options.min_document_frequency.max(1))
        .map(|(token, _)| token)
        .collect();
    if kept.is_empty() {
        return Err(AnalysisError::Training(
            "no tokens survived cleaning and frequency filtering".to_string(),
        ));
    }
    let vocabulary: HashMap<String, usize> = kept
        .into_iter()
        .enumerate()
        .map(|(idx, token)| (token.to_string(), idx))
        .collect();

    let rows: Vec<Vec<(usize, f64)>> = documents
        .iter()
        .map(|tokens| {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for token in tokens {
                if let Some(&idx) = vocabulary.get(token) {
                    *counts.entry(idx).or_insert(0.0) += 1.0;
                }
            }
            counts.into_iter().collect()
        })
        .collect();

    let n = samples.len() as f64;
    let mut weights = vec![0.0f64; vocabulary.len()];
    let mut bias = 0.0f64;
    for _ in 0..options.epochs {
        let mut grad = vec![0.0f64; weights.len()];
        let mut grad_bias = 0.0;
        for (row, sample) in rows.iter().zip(samples) {
            let z = row.iter().fold(bias, |acc, (idx, x)| acc + weights[*idx] * x);
            let err = sigmoid(z) - sample.label as f64;
            for (idx, x) in row {
                grad[*idx] += err * x;
            }
            grad_bias += err;
        }
        for (w, g) in weights.iter_mut().zip(&grad) {
            *w -= options.learning_rate * (g / n + options.l2 * *w);
        }
        bias -= options.learning_rate * grad_bias / n;
    }

    info!(
        "Trained pipeline on {} samples with {} features",
        samples.len(),
        vocabulary.len()
    );

    Ok(PipelineArtifact {
        format_version: PIPELINE_FORMAT_VERSION,
        model_type: PIPELINE_MODEL_TYPE.to_string(),
        vocabulary,
        coefficients: weights,
        intercept: bias,
        classes: vec![0, 1],
        lowercase: true,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_corpus() -> Vec<TrainingSample> {
        let positive = [
            "I love this video! Amazing content!",
            "Great tutorial, very helpful",
            "Excellent work, very informative",
            "Fantastic explanation, learned a lot",
            "Outstanding video, highly recommend",
            "Wonderful and inspiring, thank you",
        ];
        let negative = [
            "This is terrible, waste of time",
            "I hate this, it's awful",
            "Poor quality, not worth watching",
            "Disappointing content, expected more",
            "Bad tutorial, confusing explanations",
            "Boring and useless, do not watch",
        ];
        positive
            .iter()
            .map(|t| TrainingSample { text: t.to_string(), label: 0 })
            .chain(negative.iter().map(|t| TrainingSample { text: t.to_string(), label: 1 }))
            .collect()
    }

    pub(crate) fn trained_artifact() -> PipelineArtifact {
        let cleaner = TextCleaner::new().expect("cleaner");
        train_pipeline(&cleaner, &sample_corpus(), &TrainingOptions::default())
            .expect("training succeeds")
    }

    fn trained_analyzer() -> SentimentAnalyzer {
        let pipeline = LogisticPipeline::from_artifact(trained_artifact()).expect("valid artifact");
        SentimentAnalyzer::with_model(Arc::new(pipeline)).expect("analyzer")
    }

    #[test]
    fn vectorizer_counts_known_tokens_only() {
        let vocab: HashMap<String, usize> =
            [("good".to_string(), 0), ("bad".to_string(), 1)].into_iter().collect();
        let vectorizer = CountVectorizer::new(vocab, true).expect("vectorizer");
        assert_eq!(vectorizer.transform("Good good BAD ugly a"), vec![(0, 2.0), (1, 1.0)]);
        assert!(vectorizer.transform("nothing known").is_empty());
    }

    #[test]
    fn pipeline_uses_decision_sign() {
        let artifact = PipelineArtifact {
            format_version: PIPELINE_FORMAT_VERSION,
            model_type: PIPELINE_MODEL_TYPE.to_string(),
            vocabulary: [("awful".to_string(), 0), ("great".to_string(), 1)].into_iter().collect(),
            coefficients: vec![2.0, -2.0],
            intercept: 0.0,
            classes: vec![0, 1],
            lowercase: true,
        };
        let pipeline = LogisticPipeline::from_artifact(artifact).expect("valid");
        assert_eq!(pipeline.predict("awful"), 1);
        assert_eq!(pipeline.predict("great"), 0);
        // zero decision falls to the first class
        assert_eq!(pipeline.predict("neutral words"), 0);
        let proba = pipeline.predict_proba("awful");
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-9);
        assert!(proba[1] > 0.8);
    }

    #[test]
    fn artifact_validation_rejects_mismatched_sizes() {
        let mut artifact = trained_artifact();
        artifact.coefficients.pop();
        let err = artifact.validate().expect_err("size mismatch");
        assert!(err.to_string().contains("does not match vocabulary size"));

        let mut artifact = trained_artifact();
        artifact.classes = vec![0];
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn trained_pipeline_separates_sample_sentences() {
        let analyzer = trained_analyzer();
        assert_eq!(analyzer.analyze("Amazing video, I love it").unwrap(), Sentiment::Positive);
        assert_eq!(analyzer.analyze("Awful, a total waste of time").unwrap(), Sentiment::Negative);
    }

    #[test]
    fn empty_after_cleaning_is_positive() {
        let analyzer = trained_analyzer();
        assert_eq!(analyzer.analyze("!!! 123").unwrap(), Sentiment::Positive);
        let (sentiment, confidence) = analyzer.analyze_with_confidence("@someone").unwrap();
        assert_eq!(sentiment, Sentiment::Positive);
        assert_eq!(confidence, 0.5);
    }

    #[test]
    fn batch_preserves_order_and_handles_empty_entries() {
        let analyzer = trained_analyzer();
        let results = analyzer
            .analyze_batch(&["terrible waste", "", "great tutorial"])
            .unwrap();
        assert_eq!(
            results,
            vec![Sentiment::Negative, Sentiment::Positive, Sentiment::Positive]
        );
        let none: Vec<String> = Vec::new();
        assert!(analyzer.analyze_batch(&none).unwrap().is_empty());
    }

    #[test]
    fn confidence_is_probability_of_chosen_class() {
        let analyzer = trained_analyzer();
        let (sentiment, confidence) = analyzer
            .analyze_with_confidence("awful boring useless waste")
            .unwrap();
        assert_eq!(sentiment, Sentiment::Negative);
        assert!(confidence > 0.5 && confidence <= 1.0);
    }

    #[test]
    fn unloaded_analyzer_reports_model_not_loaded() {
        let analyzer = SentimentAnalyzer::unloaded().unwrap();
        assert!(matches!(analyzer.analyze("hi"), Err(AnalysisError::ModelNotLoaded)));
        let info = analyzer.model_info();
        assert!(!info.model_loaded);
        assert!(info.model_type.is_none());
    }

    #[test]
    fn load_from_config_reads_pipeline_and_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ModelConfig::default();
        config.artifact_dir = dir.path().to_path_buf();
        trained_artifact().save(&config.pipeline_path()).unwrap();
        std::fs::write(config.tokenizer_path(), r#"{"word_index": {"great": 1}}"#).unwrap();

        let analyzer = SentimentAnalyzer::load(&config).unwrap();
        let info = analyzer.model_info();
        assert!(info.model_loaded);
        assert!(info.tokenizer_loaded);
        assert_eq!(info.model_type.as_deref(), Some(PIPELINE_MODEL_TYPE));
    }

    #[test]
    fn load_from_config_without_pipeline_stays_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ModelConfig::default();
        config.artifact_dir = dir.path().to_path_buf();
        let analyzer = SentimentAnalyzer::load(&config).unwrap();
        assert!(!analyzer.is_loaded());
    }

    #[test]
    fn training_requires_both_classes() {
        let cleaner = TextCleaner::new().unwrap();
        let only_positive = vec![TrainingSample { text: "great".into(), label: 0 }];
        assert!(train_pipeline(&cleaner, &only_positive, &TrainingOptions::default()).is_err());
    }

    #[test]
    fn training_samples_load_from_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.jsonl");
        std::fs::write(&path, "{\"text\": \"good\", \"label\": 0}\n\n{\"text\": \"bad\", \"label\": 1}\n")
            .unwrap();
        let samples = load_training_samples(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].label, 1);

        std::fs::write(&path, "not json\n").unwrap();
        let err = load_training_samples(&path).expect_err("bad line");
        assert!(err.to_string().contains("line 1"));
    }
}
