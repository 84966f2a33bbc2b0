/// Asks the text model to turn a codebase explanation into a Mermaid flowchart.
/// `{0}` is replaced with the explanation.
pub const MERMAID_DIAGRAM: &str = r#"You are an expert at creating valid Mermaid diagrams for software architecture.

Given the following codebase explanation, create a SIMPLE and VALID Mermaid flowchart.

CRITICAL RULES:
1. Start with: graph TB
2. Use SIMPLE node IDs (no spaces, no special chars): A, B, C, App, DB, API
3. Use square brackets for labels: A[Label Text]
4. For databases use: DB[(Database Name)]
5. Simple arrows only: A --> B
6. Keep labels SHORT (max 20 chars per line)
7. NO line breaks in labels
8. NO special characters in node IDs
9. Maximum 10-15 nodes
10. Test each line is valid Mermaid syntax

Codebase Explanation:
{0}

Generate ONLY valid Mermaid code. Start with 'graph TB' and keep it SIMPLE."#;

/// Short prompt for the small-context inference model.
/// `{0}` is replaced with the harvested code.
pub const CODE_ANALYSIS: &str = r#"Code analysis:

{0}

Explain: what does this code do?"#;

/// Fills the `{0}` placeholder of a prompt template
pub fn render(template: &str, value: &str) -> String {
    template.replacen("{0}", value, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mermaid_prompt() {
        let prompt = render(MERMAID_DIAGRAM, "A Flask API backed by PostgreSQL.");
        assert!(prompt.contains("Codebase Explanation:\nA Flask API backed by PostgreSQL.\n\nGenerate ONLY"));
        assert!(!prompt.contains("{0}"));
    }

    #[test]
    fn test_render_only_first_placeholder() {
        let prompt = render(CODE_ANALYSIS, "print('{0}')");
        assert_eq!(prompt, "Code analysis:\n\nprint('{0}')\n\nExplain: what does this code do?");
    }
}
