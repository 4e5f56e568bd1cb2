//! Story and title generation.
//!
//! The title is generated from the finished story, so the two completion
//! calls are necessarily sequential. If either one fails, nothing is
//! returned: a story without a title is never published.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::textgen::TextGenerator;

pub const STORY_PROMPT_PREFIX: &str =
    "Create a short story without a title with the following face details: ";
pub const TITLE_PROMPT_PREFIX: &str = "create a title for this story: ";

/// The generated result. Field order here is the field order of the stored
/// JSON document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub article: String,
}

pub fn story_prompt(descriptor: &str) -> String {
    format!("{STORY_PROMPT_PREFIX}{descriptor}")
}

pub fn title_prompt(story: &str) -> String {
    format!("{TITLE_PROMPT_PREFIX}{story}")
}

/// Write a story about the described face, then give it a title.
pub async fn synthesize(
    generator: &dyn TextGenerator,
    descriptor: &str,
    story_max_tokens: u32,
    title_max_tokens: u32,
) -> Result<GeneratedArticle> {
    let article = generator
        .complete(&story_prompt(descriptor), story_max_tokens)
        .await
        .context("story generation failed")?;

    let title = generator
        .complete(&title_prompt(&article), title_max_tokens)
        .await
        .context("title generation failed")?;

    Ok(GeneratedArticle { title, article })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::FakeGenerator;

    #[tokio::test]
    async fn title_prompt_embeds_story() {
        let generator = FakeGenerator::new(vec![Ok("  The story.\n"), Ok("A Title")]);

        let result = synthesize(&generator, "25 years old", 500, 100).await.unwrap();
        assert_eq!(
            result,
            GeneratedArticle {
                title: "A Title".to_owned(),
                article: "  The story.\n".to_owned(),
            }
        );

        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (story_prompt("25 years old"), 500));
        assert!(calls[0].0.ends_with("25 years old"));
        assert_eq!(calls[1], (title_prompt("  The story.\n"), 100));
        assert!(calls[1].0.contains("  The story.\n"));
    }

    #[tokio::test]
    async fn story_failure_skips_title() {
        let generator = FakeGenerator::new(vec![Err("boom")]);
        assert!(synthesize(&generator, "x", 500, 100).await.is_err());
        assert_eq!(generator.calls().len(), 1);
    }

    #[tokio::test]
    async fn title_failure_discards_story() {
        let generator = FakeGenerator::new(vec![Ok("story"), Err("boom")]);
        let err = synthesize(&generator, "x", 500, 100).await.unwrap_err();
        assert!(format!("{err:#}").contains("title generation failed"));
    }

    #[test]
    fn document_key_order() {
        let doc = GeneratedArticle {
            title: "T".to_owned(),
            article: "A".to_owned(),
        };
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"{"title":"T","article":"A"}"#
        );
    }
}
