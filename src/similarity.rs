//! Image–question similarity scoring.
//!
//! Every image evidence referenced by an image-modality answer is paired
//! with its question and scored by a [`SimilarityScorer`]. Scores are
//! written as JSON lines:
//!
//! ```json
//! {"qid":"C_381_1","image_id":"a1b2","image_path":"./data/final_dataset_images/a1b2.jpg","score":0.27}
//! ```
//!
//! The bundled scorer (`--features clip-fastembed`) embeds the image and
//! the question with CLIP ViT-B/32 and returns their cosine similarity.

use anyhow::{bail, Context, Result};
use mmcoqa_core::dataset::{Dataset, ImageQuestionPair};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::{Config, ScoringConfig};
use crate::progress::{ProgressMode, ScoreProgressEvent, ScoreProgressReporter};

/// Scores how well an image matches a piece of text.
pub trait SimilarityScorer: Send {
    fn model_name(&self) -> &str;

    /// Similarity in `[-1, 1]`, or `None` when the image cannot be decoded.
    fn score(&mut self, image: &Path, text: &str) -> Result<Option<f32>>;
}

/// One scored pair, as emitted on the output stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub qid: String,
    pub image_id: String,
    pub image_path: PathBuf,
    pub score: f32,
}

/// Counts from one scoring run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTally {
    pub scored: u64,
    pub undefined: u64,
}

/// Score every pair, writing one [`ScoreRecord`] per defined score.
pub fn score_pairs<S, W>(
    scorer: &mut S,
    pairs: &[ImageQuestionPair],
    out: &mut W,
    reporter: &dyn ScoreProgressReporter,
) -> Result<ScoreTally>
where
    S: SimilarityScorer + ?Sized,
    W: Write,
{
    let total = pairs.len() as u64;
    let mut tally = ScoreTally::default();

    for (i, pair) in pairs.iter().enumerate() {
        match scorer.score(&pair.image_path, &pair.question)? {
            Some(score) if score.is_finite() => {
                let record = ScoreRecord {
                    qid: pair.qid.clone(),
                    image_id: pair.image_id.clone(),
                    image_path: pair.image_path.clone(),
                    score,
                };
                serde_json::to_writer(&mut *out, &record)?;
                out.write_all(b"\n")?;
                tally.scored += 1;
            }
            _ => {
                tracing::debug!(
                    qid = %pair.qid,
                    image = %pair.image_path.display(),
                    "similarity undefined"
                );
                tally.undefined += 1;
            }
        }

        let n = i as u64 + 1;
        if n % 100 == 0 || n == total {
            reporter.report(ScoreProgressEvent::Scoring { n, total });
        }
    }

    out.flush()?;
    Ok(tally)
}

/// CLI entry point for `mmqa score-images`.
pub async fn run_score_images(
    config: &Config,
    dataset: &Dataset,
    output: Option<PathBuf>,
    limit: Option<usize>,
    progress: Option<ProgressMode>,
) -> Result<()> {
    let collected = dataset.image_question_pairs(&config.data.image_dir);
    let mut pairs = collected.pairs;
    if let Some(lim) = limit {
        pairs.truncate(lim);
    }

    let reporter = ProgressMode::resolve(progress).reporter();
    reporter.report(ScoreProgressEvent::Collected {
        pairs: pairs.len() as u64,
        missing: collected.missing as u64,
    });
    if collected.pathless > 0 {
        tracing::warn!(count = collected.pathless, "image records without a path were skipped");
    }

    if pairs.is_empty() {
        eprintln!("No valid image-question pairs found; check the data paths in the config.");
        return Ok(());
    }

    let mut scorer = create_scorer(&config.scoring)?;
    tracing::info!(model = scorer.model_name(), pairs = pairs.len(), "scoring image-question pairs");

    let tally = tokio::task::spawn_blocking(move || -> Result<ScoreTally> {
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                score_pairs(scorer.as_mut(), &pairs, &mut writer, reporter.as_ref())
            }
            None => {
                let stdout = std::io::stdout();
                let mut writer = stdout.lock();
                score_pairs(scorer.as_mut(), &pairs, &mut writer, reporter.as_ref())
            }
        }
    })
    .await??;

    eprintln!(
        "Scored {} image-question pairs ({} undefined).",
        tally.scored, tally.undefined
    );
    Ok(())
}

/// Create the scorer named by `scoring.model`.
pub fn create_scorer(config: &ScoringConfig) -> Result<Box<dyn SimilarityScorer>> {
    #[cfg(feature = "clip-fastembed")]
    {
        Ok(Box::new(clip::ClipScorer::new(&config.model)?))
    }
    #[cfg(not(feature = "clip-fastembed"))]
    {
        bail!(
            "Scoring model '{}' requires building with --features clip-fastembed",
            config.model
        )
    }
}

/// Cosine similarity of an image and a text embedding, clamped to
/// `[-1, 1]`. `None` when the vectors differ in length, are empty, or
/// either has zero norm.
pub fn cosine_similarity(image: &[f32], text: &[f32]) -> Option<f32> {
    if image.is_empty() || image.len() != text.len() {
        return None;
    }

    let (dot, image_sq, text_sq) = image
        .iter()
        .zip(text)
        .fold((0.0f64, 0.0f64, 0.0f64), |(dot, a, b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, a + x * x, b + y * y)
        });

    let norm = (image_sq * text_sq).sqrt();
    if norm <= f64::EPSILON {
        return None;
    }
    Some((dot / norm).clamp(-1.0, 1.0) as f32)
}

#[cfg(feature = "clip-fastembed")]
mod clip {
    use super::{bail, cosine_similarity, Result, SimilarityScorer};
    use std::path::Path;

    /// CLIP image and text encoders from fastembed.
    pub struct ClipScorer {
        name: String,
        image_model: fastembed::ImageEmbedding,
        text_model: fastembed::TextEmbedding,
    }

    impl ClipScorer {
        pub fn new(name: &str) -> Result<Self> {
            let (image_kind, text_kind) = match name {
                "clip-vit-b-32" => (
                    fastembed::ImageEmbeddingModel::ClipVitB32,
                    fastembed::EmbeddingModel::ClipVitB32,
                ),
                other => bail!("Unknown CLIP model: '{}'", other),
            };

            let image_model = fastembed::ImageEmbedding::try_new(
                fastembed::ImageInitOptions::new(image_kind).with_show_download_progress(true),
            )
            .map_err(|e| anyhow::anyhow!("Failed to initialize CLIP image model: {}", e))?;
            let text_model = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(text_kind).with_show_download_progress(true),
            )
            .map_err(|e| anyhow::anyhow!("Failed to initialize CLIP text model: {}", e))?;

            Ok(Self {
                name: name.to_string(),
                image_model,
                text_model,
            })
        }
    }

    impl SimilarityScorer for ClipScorer {
        fn model_name(&self) -> &str {
            &self.name
        }

        fn score(&mut self, image: &Path, text: &str) -> Result<Option<f32>> {
            let image_vec = match self.image_model.embed(vec![image], None) {
                Ok(mut v) if !v.is_empty() => v.swap_remove(0),
                Ok(_) => return Ok(None),
                Err(e) => {
                    tracing::debug!(image = %image.display(), "image embedding failed: {}", e);
                    return Ok(None);
                }
            };
            let mut text_vecs = self
                .text_model
                .embed(vec![text], None)
                .map_err(|e| anyhow::anyhow!("CLIP text embedding failed: {}", e))?;
            if text_vecs.is_empty() {
                bail!("CLIP text model returned no embedding");
            }
            let text_vec = text_vecs.swap_remove(0);

            Ok(cosine_similarity(&image_vec, &text_vec))
        }
    }
}
