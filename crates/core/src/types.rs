use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Binary sentiment as predicted by the pipeline: 0 is positive, 1 is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    /// Positive opinion (score 0).
    Positive,

    /// Negative opinion (score 1).
    Negative,
}

impl Sentiment {
    /// Numeric score used by the model and stored results.
    pub fn score(&self) -> i64 {
        match self {
            Sentiment::Positive => 0,
            Sentiment::Negative => 1,
        }
    }

    /// Map a numeric class back to a sentiment.
    pub fn from_score(score: i64) -> Option<Self> {
        match score {
            0 => Some(Sentiment::Positive),
            1 => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
        }
    }
}

/// Label for an arbitrary score, `Unknown` for anything outside 0/1.
pub fn label_for_score(score: i64) -> &'static str {
    Sentiment::from_score(score)
        .map(|s| s.label())
        .unwrap_or("Unknown")
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for Sentiment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.score())
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let score = i64::deserialize(deserializer)?;
        Sentiment::from_score(score)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid sentiment score {}", score)))
    }
}

/// Basic information about a YouTube video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub published_at: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub thumbnail: String,
    pub tags: Vec<String>,
}

/// A top-level YouTube comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: String,
    pub author_channel: String,
    pub likes: u64,
    pub published_at: String,
    pub updated_at: String,
    pub total_reply_count: u64,
    /// Only set for channel-wide comment listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

/// A video returned by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub published_at: String,
    pub thumbnail: String,
}

/// A comment together with its predicted sentiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredComment {
    pub text: String,
    pub author: String,
    pub likes: u64,
    pub sentiment: Sentiment,
    pub sentiment_label: String,
}

impl ScoredComment {
    /// Attach a sentiment to a fetched comment.
    pub fn new(comment: &Comment, sentiment: Sentiment) -> Self {
        Self {
            text: comment.text.clone(),
            author: comment.author.clone(),
            likes: comment.likes,
            sentiment,
            sentiment_label: sentiment.label().to_string(),
        }
    }
}

/// Aggregate counts of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub total_comments: u64,
    pub positive_count: u64,
    pub negative_count: u64,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
}

impl AnalysisStatistics {
    /// Count sentiments and compute percentages rounded to two decimals.
    pub fn from_sentiments<'a, I>(sentiments: I) -> Self
    where
        I: IntoIterator<Item = &'a Sentiment>,
    {
        let mut positive_count = 0u64;
        let mut negative_count = 0u64;
        for sentiment in sentiments {
            match sentiment {
                Sentiment::Positive => positive_count += 1,
                Sentiment::Negative => negative_count += 1,
            }
        }
        let total_comments = positive_count + negative_count;

        Self {
            total_comments,
            positive_count,
            negative_count,
            positive_percentage: percentage(positive_count, total_comments),
            negative_percentage: percentage(negative_count, total_comments),
        }
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = part as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Full result of analysing one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Set once the report has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<i64>,
    pub video_info: VideoInfo,
    pub statistics: AnalysisStatistics,
    pub comments: Vec<ScoredComment>,
    pub positive_comments: Vec<ScoredComment>,
    pub negative_comments: Vec<ScoredComment>,
}

impl AnalysisReport {
    /// Build the report from scored comments, keeping fetch order.
    pub fn build(video_info: VideoInfo, comments: Vec<ScoredComment>) -> Self {
        let statistics = AnalysisStatistics::from_sentiments(comments.iter().map(|c| &c.sentiment));
        let (positive_comments, negative_comments): (Vec<_>, Vec<_>) = comments
            .iter()
            .cloned()
            .partition(|c| c.sentiment == Sentiment::Positive);

        Self {
            analysis_id: None,
            video_info,
            statistics,
            comments,
            positive_comments,
            negative_comments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str) -> Comment {
        Comment {
            id: format!("c-{}", text.len()),
            text: text.to_string(),
            author: "viewer".to_string(),
            author_channel: String::new(),
            likes: 3,
            published_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            total_reply_count: 0,
            video_id: None,
        }
    }

    fn video() -> VideoInfo {
        VideoInfo {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            channel_title: "Channel".to_string(),
            published_at: "2009-10-25T06:57:33Z".to_string(),
            view_count: 10,
            like_count: 2,
            comment_count: 3,
            thumbnail: String::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn sentiment_serializes_as_score() {
        let json = serde_json::to_string(&Sentiment::Negative).expect("serialize");
        assert_eq!(json, "1");
        let parsed: Sentiment = serde_json::from_str("0").expect("deserialize");
        assert_eq!(parsed, Sentiment::Positive);
        assert!(serde_json::from_str::<Sentiment>("2").is_err());
    }

    #[test]
    fn unknown_scores_get_unknown_label() {
        assert_eq!(label_for_score(0), "Positive");
        assert_eq!(label_for_score(1), "Negative");
        assert_eq!(label_for_score(-1), "Unknown");
    }

    #[test]
    fn statistics_round_to_two_decimals() {
        let stats = AnalysisStatistics::from_sentiments(&[
            Sentiment::Positive,
            Sentiment::Negative,
            Sentiment::Negative,
        ]);
        assert_eq!(stats.total_comments, 3);
        assert_eq!(stats.positive_percentage, 33.33);
        assert_eq!(stats.negative_percentage, 66.67);
    }

    #[test]
    fn empty_statistics_are_zero() {
        let stats = AnalysisStatistics::from_sentiments(Vec::<Sentiment>::new().iter());
        assert_eq!(stats.total_comments, 0);
        assert_eq!(stats.positive_percentage, 0.0);
    }

    #[test]
    fn report_partitions_comments_in_order() {
        let scored = vec![
            ScoredComment::new(&comment("great"), Sentiment::Positive),
            ScoredComment::new(&comment("awful stuff"), Sentiment::Negative),
            ScoredComment::new(&comment("lovely video"), Sentiment::Positive),
        ];
        let report = AnalysisReport::build(video(), scored);

        assert_eq!(report.statistics.positive_count, 2);
        assert_eq!(report.positive_comments.len(), 2);
        assert_eq!(report.positive_comments[1].text, "lovely video");
        assert_eq!(report.negative_comments[0].sentiment_label, "Negative");
        assert_eq!(report.comments.len(), 3);
        assert!(report.analysis_id.is_none());
    }
}
