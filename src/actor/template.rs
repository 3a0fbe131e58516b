//! Markdown section scanning for role/beat templates
//!
//! Role and beat documents are opaque text owned by template authors.
//! This parser returns structured sections so the assembly logic never
//! has to know the document layout; template format changes stop here.

/// One markdown section: the heading line (without `#` markers) and the
/// lines under it, up to the next heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub lines: Vec<String>,
}

fn heading_of(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let stripped = trimmed.trim_start_matches('#');
    if stripped.len() < trimmed.len() {
        Some(stripped.trim())
    } else {
        None
    }
}

/// Split a document into sections. Content before the first heading
/// lands in a section with an empty heading.
pub fn sections(doc: &str) -> Vec<Section> {
    let mut out: Vec<Section> = Vec::new();
    let mut current = Section {
        heading: String::new(),
        lines: Vec::new(),
    };
    for line in doc.lines() {
        if let Some(heading) = heading_of(line) {
            if !current.heading.is_empty() || !current.lines.is_empty() {
                out.push(current);
            }
            current = Section {
                heading: heading.to_string(),
                lines: Vec::new(),
            };
        } else {
            current.lines.push(line.to_string());
        }
    }
    if !current.heading.is_empty() || !current.lines.is_empty() {
        out.push(current);
    }
    out
}

/// Extract a bounded role essence: the non-empty lines of the profile
/// section, or the first `max_lines` non-empty lines of the whole
/// document when no profile section exists.
pub fn role_essence(doc: &str, max_lines: usize) -> Vec<String> {
    let parsed = sections(doc);
    let profile = parsed
        .iter()
        .find(|s| s.heading.to_lowercase().contains("profile"));

    let lines: Box<dyn Iterator<Item = &String>> = match profile {
        Some(section) => Box::new(section.lines.iter()),
        None => Box::new(parsed.iter().flat_map(|s| s.lines.iter())),
    };
    lines
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .take(max_lines)
        .map(ToString::to_string)
        .collect()
}

/// Extract the fenced block inside the beat's prompt-template section,
/// if both exist.
pub fn prompt_block(doc: &str) -> Option<String> {
    let parsed = sections(doc);
    let section = parsed
        .iter()
        .find(|s| s.heading.to_lowercase().contains("prompt template"))?;

    let mut in_fence = false;
    let mut block: Vec<&str> = Vec::new();
    for line in &section.lines {
        if line.trim_start().starts_with("```") {
            if in_fence {
                return Some(block.join("\n"));
            }
            in_fence = true;
            continue;
        }
        if in_fence {
            block.push(line);
        }
    }
    // Unterminated fence: treat the collected tail as the block
    if in_fence && !block.is_empty() {
        return Some(block.join("\n"));
    }
    None
}

/// Substitute `{name}` placeholder tokens
pub fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE_DOC: &str = "\
# Host

## Profile
Warm, quick, allergic to jargon.

Keeps the learner talking.

## Voice
Never used by assembly.
";

    const BEAT_DOC: &str = "\
# Reveal

## Intent
Show the core mechanism.

## Prompt Template
Some prose before the block.
```
Unveil {concept} using the metaphor of {metaphor}.
Stop as soon as the learner nods along.
```
";

    #[test]
    fn sections_split_on_headings() {
        let parsed = sections(ROLE_DOC);
        let headings: Vec<_> = parsed.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Host", "Profile", "Voice"]);
    }

    #[test]
    fn role_essence_prefers_profile_section() {
        let essence = role_essence(ROLE_DOC, 4);
        assert_eq!(
            essence,
            vec![
                "Warm, quick, allergic to jargon.".to_string(),
                "Keeps the learner talking.".to_string(),
            ]
        );
    }

    #[test]
    fn role_essence_falls_back_to_leading_lines() {
        let doc = "A grizzled skeptic.\n\nQuestions everything.\nLoves counterexamples.\n";
        let essence = role_essence(doc, 2);
        assert_eq!(
            essence,
            vec![
                "A grizzled skeptic.".to_string(),
                "Questions everything.".to_string(),
            ]
        );
    }

    #[test]
    fn prompt_block_extracts_fenced_content() {
        let block = prompt_block(BEAT_DOC).unwrap();
        assert!(block.contains("{concept}"));
        assert!(block.contains("Stop as soon as"));
        assert!(!block.contains("Some prose"));
    }

    #[test]
    fn prompt_block_absent_when_no_template_section() {
        assert!(prompt_block("# Beat\n\nJust prose.\n").is_none());
        assert!(prompt_block("## Prompt Template\nNo fence here.\n").is_none());
    }

    #[test]
    fn substitute_replaces_placeholders() {
        let out = substitute(
            "Unveil {concept} via {metaphor}.",
            &[("concept", "entropy"), ("metaphor", "a shuffled deck")],
        );
        assert_eq!(out, "Unveil entropy via a shuffled deck.");
    }

    #[test]
    fn substitute_leaves_unknown_tokens_alone() {
        let out = substitute("Keep {unknown} as-is.", &[("concept", "x")]);
        assert_eq!(out, "Keep {unknown} as-is.");
    }
}
