//! Markdown rendering of a `ProjectSummary`.

use crate::core::coordinator::ProjectSummary;

/// Run metadata that is not part of the summary itself
#[derive(Debug, Clone)]
pub struct ReportMeta
{
    /// Header title (root directory name)
    pub project_name: String,

    /// Preformatted generation timestamp
    pub generated_at: String,
}

impl ReportMeta
{
    /// Metadata stamped with the current local time
    pub fn now(project_name: impl Into<String>) -> Self
    {
        Self {
            project_name: project_name.into(),
            generated_at: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

/// Turns a summary into the output document
pub trait ReportRenderer
{
    fn render(
        &self,
        summary: &ProjectSummary,
        meta: &ReportMeta,
    ) -> String;
}

/// The default LLM-context Markdown layout
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl ReportRenderer for MarkdownRenderer
{
    fn render(
        &self,
        summary: &ProjectSummary,
        meta: &ReportMeta,
    ) -> String
    {
        let body_len: usize = summary
            .artifacts
            .iter()
            .map(|a| {
                a.content
                    .len()
                    + 128
            })
            .sum();
        let mut md = String::with_capacity(body_len + summary.tree.len() + 256);

        md.push_str(&format!("# 📦 Codebase Context: {}\n", meta.project_name));
        md.push_str(&format!(
            "> Generated on {} | Files: {} | Tokens: ~{}\n",
            meta.generated_at,
            summary.total_files,
            group_thousands(summary.total_tokens)
        ));

        md.push_str("\n## 🌲 Project Structure\n```text\n");
        md.push_str(&summary.tree);
        if !summary
            .tree
            .ends_with('\n')
        {
            md.push('\n');
        }
        md.push_str("```\n");

        md.push_str("\n## 📄 File Contents\n");

        for artifact in &summary.artifacts
        {
            md.push_str(&format!("\n### `{}`\n", artifact.relative_path));

            let mut info = format!(
                "Language: {} | Lines: {} | Tokens: ~{}",
                artifact.language, artifact.lines, artifact.token_estimate
            );
            if artifact.is_truncated
            {
                info.push_str(" | ⚠️ TRUNCATED");
            }
            md.push_str(&format!("_{info}_\n"));

            md.push_str(&format!("```{}\n", artifact.language));
            md.push_str(&artifact.content);
            if !artifact
                .content
                .ends_with('\n')
            {
                md.push('\n');
            }
            md.push_str("```\n---\n");
        }

        md
    }
}

/// `1234567` → `1,234,567`
pub fn group_thousands(n: usize) -> String
{
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits
        .chars()
        .enumerate()
    {
        if i > 0 && (digits.len() - i) % 3 == 0
        {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
