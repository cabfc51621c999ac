//! Text parsing shared by the LLM nodes

/// A markdown heading and the text under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// Split markdown into the text before the first heading and the sections
///
/// Headings are lines starting with one to three `#` and a space. Bold
/// markers around a heading title are dropped; a heading with no title stays
/// body text.
pub fn sections(text: &str) -> (String, Vec<Section>) {
    let mut preamble = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(title) = heading(line) {
            if let Some((title, body)) = current.take() {
                sections.push(section(title, &body));
            }
            current = Some((title, Vec::new()));
            continue;
        }
        match &mut current {
            Some((_, body)) => body.push(line),
            None => preamble.push(line),
        }
    }
    if let Some((title, body)) = current {
        sections.push(section(title, &body));
    }

    (preamble.join("\n").trim().to_string(), sections)
}

fn section(title: String, body: &[&str]) -> Section {
    Section {
        title,
        body: body.join("\n").trim().to_string(),
    }
}

fn heading(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim().trim_matches('*').trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Value of a `LABEL: value` line, tolerant of bold and list markers
///
/// Returns the first match. The label comparison ignores case.
pub fn labelled<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let line = line.trim().trim_start_matches(['*', '-', '#', ' ']);
        let (key, value) = line.split_once(':')?;
        key.trim()
            .trim_matches('*')
            .eq_ignore_ascii_case(label)
            .then(|| value.trim().trim_matches('*').trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections() {
        let text = "Overview line.\n\n## Valuation\nP/E 20\n\n### **Risk Factors**\nCompetition\n#hashtag\n## \nkept";
        let (preamble, sections) = sections(text);

        assert_eq!(preamble, "Overview line.");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Valuation");
        assert_eq!(sections[0].body, "P/E 20");
        assert_eq!(sections[1].title, "Risk Factors");
        assert_eq!(sections[1].body, "Competition\n#hashtag\n## \nkept");
    }

    #[test]
    fn test_no_headings() {
        let (preamble, sections) = sections("just text");
        assert_eq!(preamble, "just text");
        assert!(sections.is_empty());
    }

    #[test]
    fn test_labelled() {
        let text = "**RECOMMENDATION:** BUY\n- Rationale: cheap: very\nSUMMARY:";
        assert_eq!(labelled(text, "recommendation"), Some("BUY"));
        assert_eq!(labelled(text, "RATIONALE"), Some("cheap: very"));
        assert_eq!(labelled(text, "SUMMARY"), Some(""));
        assert_eq!(labelled(text, "QUALITY_SCORE"), None);
    }
}
