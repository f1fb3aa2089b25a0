// ============================================================
// Layer 4 — JSONL Sample Loader
// ============================================================
// Reads tokenised question/answer pairs, one JSON object per
// line (see domain::sample for the shape of a line).
//
// Tokenisation happens upstream, so this loader only checks
// what the batcher depends on:
//   - every sample passes PairSample::validate
//   - every sample in the file has the same number of segments
//   - samples that carry features all carry the same number,
//     and likewise for targets
//
// Blank lines are skipped. Any other bad line aborts the load
// and the error names the line.

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::sample::PairSample;
use crate::domain::traits::SampleSource;

/// Loads pair samples from a .jsonl file.
/// Implements the SampleSource trait from Layer 3.
pub struct JsonlLoader {
    path: PathBuf,
}

impl JsonlLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse JSONL text. Split out from load_all so it can be tested
    /// without touching the file system.
    pub fn parse(text: &str) -> Result<Vec<PairSample>> {
        let mut samples: Vec<PairSample> = Vec::new();
        // (width, line it was first seen on)
        let mut feature_width: Option<(usize, usize)> = None;
        let mut target_width:  Option<(usize, usize)> = None;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            let sample: PairSample = serde_json::from_str(line)
                .with_context(|| format!("Line {line_no}: not a valid pair sample"))?;
            sample.validate()
                .with_context(|| format!("Line {line_no}: invalid sample"))?;

            if let Some(first) = samples.first() {
                if first.segment_count() != sample.segment_count() {
                    bail!(
                        "Line {line_no}: sample '{}' has {} segments, expected {}",
                        sample.id,
                        sample.segment_count(),
                        first.segment_count()
                    );
                }
            }
            if let Some(f) = &sample.features {
                check_width("features", f.len(), line_no, &sample.id, &mut feature_width)?;
            }
            if let Some(t) = &sample.targets {
                check_width("targets", t.len(), line_no, &sample.id, &mut target_width)?;
            }
            samples.push(sample);
        }

        Ok(samples)
    }
}

fn check_width(
    what:    &str,
    width:   usize,
    line_no: usize,
    id:      &str,
    seen:    &mut Option<(usize, usize)>,
) -> Result<()> {
    match *seen {
        None => *seen = Some((width, line_no)),
        Some((expected, first_line)) if expected != width => bail!(
            "Line {line_no}: sample '{id}' has {width} {what}, \
             but line {first_line} has {expected}"
        ),
        Some(_) => {}
    }
    Ok(())
}

impl SampleSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<PairSample>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read samples from '{}'", self.path.display()))?;

        let samples = Self::parse(&text)
            .with_context(|| format!("While loading '{}'", self.path.display()))?;

        if samples.is_empty() {
            tracing::warn!("'{}' contains no samples", self.path.display());
        }
        tracing::info!(
            "Loaded {} samples ({} labelled) from '{}'",
            samples.len(),
            samples.iter().filter(|s| s.is_labelled()).count(),
            self.path.display()
        );
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TWO_SAMPLES: &str = r#"{"id":"a","segments":[{"tokens":[1,2],"token_types":[0,1]}],"targets":[0.5]}

{"id":"b","segments":[{"tokens":[3],"token_types":[0]}],"features":[2]}
"#;

    #[test]
    fn test_parse_skips_blank_lines() {
        let samples = JsonlLoader::parse(TWO_SAMPLES).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].targets, Some(vec![0.5]));
        assert_eq!(samples[1].features, Some(vec![2]));
    }

    #[test]
    fn test_bad_json_names_the_line() {
        let text = "{\"id\":\"a\",\"segments\":[{\"tokens\":[1],\"token_types\":[0]}]}\nnot json\n";
        let err  = JsonlLoader::parse(text).unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_invalid_sample_is_rejected() {
        let text = r#"{"id":"a","segments":[{"tokens":[1,2],"token_types":[0]}]}"#;
        assert!(JsonlLoader::parse(text).is_err());
    }

    #[test]
    fn test_segment_count_must_agree() {
        let text = concat!(
            r#"{"id":"a","segments":[{"tokens":[1],"token_types":[0]}]}"#, "\n",
            r#"{"id":"b","segments":[{"tokens":[1],"token_types":[0]},{"tokens":[2],"token_types":[0]}]}"#,
        );
        let err = JsonlLoader::parse(text).unwrap_err();
        assert!(err.to_string().contains("expected 1"));
    }

    #[test]
    fn test_target_width_must_agree() {
        let text = concat!(
            r#"{"id":"a","segments":[{"tokens":[1],"token_types":[0]}],"targets":[0.5]}"#, "\n",
            r#"{"id":"b","segments":[{"tokens":[2],"token_types":[0]}]}"#, "\n",
            r#"{"id":"c","segments":[{"tokens":[3],"token_types":[0]}],"targets":[0.1,0.2]}"#,
        );
        let err = JsonlLoader::parse(text).unwrap_err().to_string();
        assert!(err.contains("Line 3"));
        assert!(err.contains("2 targets"));
    }

    #[test]
    fn test_feature_width_must_agree() {
        let text = concat!(
            r#"{"id":"a","segments":[{"tokens":[1],"token_types":[0]}],"features":[1,2]}"#, "\n",
            r#"{"id":"b","segments":[{"tokens":[2],"token_types":[0]}],"features":[3]}"#,
        );
        let err = JsonlLoader::parse(text).unwrap_err().to_string();
        assert!(err.contains("Line 2"));
        assert!(err.contains("line 1 has 2"));
    }

    #[test]
    fn test_load_all_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TWO_SAMPLES.as_bytes()).unwrap();
        let samples = JsonlLoader::new(file.path()).load_all().unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        assert!(JsonlLoader::new("/definitely/not/here.jsonl").load_all().is_err());
    }
}
