//! Deterministic local stand-ins for the model tasks
//!
//! These run when the provider is unreachable or returns something unusable, and when
//! the CLI is started with `--offline`. They never fail.

use std::collections::HashSet;

use regex::Regex;

use super::tasks::Grade;
use crate::storage::{KnowledgePoint, NewKnowledgePoint};

/// Extraction never yields more points than this
pub const MAX_EXTRACTED_POINTS: usize = 8;

const MAX_TITLE_CHARS: usize = 60;
const MAX_DESCRIPTION_CHARS: usize = 300;

/// Missing keywords named in grader feedback
const MAX_MISSING_KEYWORDS: usize = 5;

/// Neutral coverage used when a point has no usable keywords
const NEUTRAL_COVERAGE: f32 = 0.6;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "him", "his", "how", "its", "may", "new", "now", "old", "see",
    "two", "way", "who", "did", "get", "let", "say", "she", "too", "use", "that", "with",
    "have", "this", "will", "your", "from", "they", "been", "were", "what", "when", "which",
    "their", "there", "than", "then", "them", "these", "those", "into", "also", "each",
    "such", "some", "more", "most", "only", "other", "about", "over", "very", "just",
    "does", "being", "because", "while", "where", "would", "should", "could", "must",
];

const QUESTION_TEMPLATES: &[&str] = &[
    "Explain \"{}\" in your own words.",
    "What is the key idea behind \"{}\"?",
    "Give an example that illustrates \"{}\".",
    "Why does \"{}\" matter, and where would you apply it?",
];

/// Split material into candidate knowledge points.
///
/// Markdown headings title the paragraph that follows them, `Title: body` lines become
/// one point each, and any other paragraph is titled by the first clause of its first
/// sentence.
pub fn extract_knowledge_points(title: &str, content: &str) -> Vec<NewKnowledgePoint> {
    let paragraph_re = Regex::new(r"\n\s*\n").unwrap();
    let heading_re = Regex::new(r"^#{1,6}\s+(.+?)\s*#*$").unwrap();
    let labeled_re =
        Regex::new(r"^(?:[-*+•]\s+|\d+[.)]\s+)?\**([^:：*]{2,40}?)\**\s*[:：]\s*(.+)$").unwrap();
    let marker_re = Regex::new(r"^(?:[-*+•]|\d+[.)])\s+").unwrap();

    let mut points = Vec::new();
    let mut seen = HashSet::new();
    let mut pending_heading: Option<String> = None;

    let mut push = |points: &mut Vec<NewKnowledgePoint>, title: &str, description: &str| {
        let title = truncate_chars(title.trim(), MAX_TITLE_CHARS);
        if title.is_empty() || !seen.insert(title.to_lowercase()) {
            return;
        }
        points.push(NewKnowledgePoint {
            title,
            description: truncate_chars(description.trim(), MAX_DESCRIPTION_CHARS),
        });
    };

    for paragraph in paragraph_re.split(content.trim()) {
        let mut lines: Vec<&str> = paragraph
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.is_empty() {
            continue;
        }

        if let Some(caps) = heading_re.captures(lines[0]) {
            if let Some(previous) = pending_heading.take() {
                push(&mut points, &previous, "");
            }
            pending_heading = Some(caps[1].to_string());
            lines.remove(0);
            if lines.is_empty() {
                continue;
            }
        }

        let mut prose = Vec::new();
        let mut labeled = false;
        for line in lines {
            match labeled_re.captures(line) {
                Some(caps) if !caps[1].contains("http") => {
                    labeled = true;
                    push(&mut points, &caps[1], &caps[2]);
                }
                _ => prose.push(marker_re.replace(line, "").into_owned()),
            }
        }
        if prose.is_empty() {
            // A heading over a definition list is only a section label
            if labeled {
                pending_heading = None;
            }
            continue;
        }

        let text = prose.join(" ");
        match pending_heading.take() {
            Some(heading) => push(&mut points, &heading, &text),
            None => push(&mut points, &first_clause(&text), &text),
        }
    }
    if let Some(heading) = pending_heading {
        push(&mut points, &heading, "");
    }

    if points.is_empty() && !content.trim().is_empty() {
        let fallback_title = if title.trim().is_empty() {
            "Key idea"
        } else {
            title
        };
        push(&mut points, fallback_title, content);
    }

    points.truncate(MAX_EXTRACTED_POINTS);
    points
}

/// A practice question from a fixed template, rotated by review count
pub fn generate_question(point: &KnowledgePoint) -> String {
    let template = QUESTION_TEMPLATES[point.review_count as usize % QUESTION_TEMPLATES.len()];
    template.replace("{}", &point.title)
}

/// Score an answer by how many of the point's keywords it mentions
pub fn grade_answer(point: &KnowledgePoint, answer: &str) -> Grade {
    let expected = keywords(&format!("{} {}", point.title, point.description));
    let answer_lower = answer.to_lowercase();
    let answer_stems: HashSet<String> = latin_words(&answer_lower).map(stem).collect();

    let mut missing = Vec::new();
    let mut hits = 0usize;
    for keyword in &expected {
        let found = if is_cjk_keyword(keyword) {
            answer_lower.contains(keyword.as_str())
        } else {
            answer_stems.contains(&stem(keyword))
        };
        if found {
            hits += 1;
        } else {
            missing.push(keyword.as_str());
        }
    }

    let coverage = if expected.is_empty() {
        NEUTRAL_COVERAGE
    } else {
        hits as f32 / expected.len() as f32
    };
    let length_bonus = (answer.trim().chars().count() / 20).min(10) as u32;
    let score = ((coverage * 90.0).round() as u32 + length_bonus).min(100) as u8;

    let mut feedback = if score >= 80 {
        format!("Good answer: it covers the key ideas of \"{}\".", point.title)
    } else if score >= 60 {
        format!("Partly there. Review the details of \"{}\".", point.title)
    } else {
        format!("The answer misses most of \"{}\".", point.title)
    };
    if !missing.is_empty() {
        let named: Vec<&str> = missing.into_iter().take(MAX_MISSING_KEYWORDS).collect();
        feedback.push_str(&format!(" Missing keywords: {}.", named.join(", ")));
    }
    feedback.push_str(" (Scored locally by keyword overlap.)");

    Grade { score, feedback }
}

/// Latin words of three or more letters minus stop-words, then CJK bigrams, deduplicated
pub fn keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let han_re = Regex::new(r"\p{Han}+").unwrap();

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for word in latin_words(&lower) {
        if !STOP_WORDS.contains(&word) && seen.insert(word.to_string()) {
            out.push(word.to_string());
        }
    }

    for run in han_re.find_iter(&lower) {
        let chars: Vec<char> = run.as_str().chars().collect();
        for pair in chars.windows(2) {
            let bigram: String = pair.iter().collect();
            if seen.insert(bigram.clone()) {
                out.push(bigram);
            }
        }
    }

    out
}

fn latin_words(text: &str) -> impl Iterator<Item = &str> {
    let word_re = Regex::new(r"\p{Latin}{3,}").unwrap();
    word_re
        .find_iter(text)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .into_iter()
}

/// Crude stem: the first six characters
fn stem(word: &str) -> String {
    word.chars().take(6).collect()
}

fn is_cjk_keyword(keyword: &str) -> bool {
    keyword.chars().any(|c| {
        matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}' | '\u{f900}'..='\u{faff}')
    })
}

/// First clause of the first sentence, or the whole sentence if that clause is too short
fn first_clause(text: &str) -> String {
    let sentence_re = Regex::new(r"^(.+?)(?:[.!?](?:\s|$)|[。！？])").unwrap();
    let sentence = sentence_re
        .captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| text.trim_end_matches(['.', '!', '?', '。', '！', '？']).to_string());

    let clause = sentence
        .split([',', ';', '，', '；', ':', '：'])
        .next()
        .unwrap_or("")
        .trim();
    if clause.chars().count() >= 4 {
        clause.to_string()
    } else {
        sentence.trim().to_string()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn point(title: &str, description: &str) -> KnowledgePoint {
        KnowledgePoint::new(Uuid::new_v4(), title.into(), description.into())
    }

    #[test]
    fn test_extract_from_headings_and_labels() {
        let content = "# Ownership\n\nEvery value has exactly one owner.\n\n\
                       - Borrowing: references that do not take ownership\n\
                       - Lifetimes: how long a reference stays valid\n\n\
                       Traits describe shared behaviour, much like interfaces.";
        let points = extract_knowledge_points("Rust", content);

        let titles: Vec<&str> = points.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Ownership", "Borrowing", "Lifetimes", "Traits describe shared behaviour"]);
        assert_eq!(points[0].description, "Every value has exactly one owner.");
        assert_eq!(points[1].description, "references that do not take ownership");
    }

    #[test]
    fn test_extract_caps_and_dedupes() {
        let content: String = (0..12)
            .map(|i| format!("Term {}: definition number {}", i % 10, i))
            .collect::<Vec<_>>()
            .join("\n");
        let points = extract_knowledge_points("Glossary", &content);
        assert_eq!(points.len(), MAX_EXTRACTED_POINTS);
        assert_eq!(points[0].title, "Term 0");
    }

    #[test]
    fn test_extract_short_material() {
        let points = extract_knowledge_points("Misc", "ok");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].title, "ok");

        assert!(extract_knowledge_points("Empty", "   ").is_empty());
    }

    #[test]
    fn test_extract_cjk_sentence() {
        let points = extract_knowledge_points("化学", "水由氢和氧组成，是生命之源。它在常温下是液体。");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].title, "水由氢和氧组成");
    }

    #[test]
    fn test_question_templates_rotate() {
        let mut kp = point("Ownership", "");
        let first = generate_question(&kp);
        kp.review_count = 1;
        let second = generate_question(&kp);
        assert_ne!(first, second);
        assert!(first.contains("Ownership"));

        kp.review_count = QUESTION_TEMPLATES.len() as u32;
        assert_eq!(generate_question(&kp), first);
    }

    #[test]
    fn test_keywords() {
        let words = keywords("The borrow checker enforces the borrow rules for references");
        assert_eq!(words, vec!["borrow", "checker", "enforces", "rules", "references"]);

        let cjk = keywords("光合作用");
        assert_eq!(cjk, vec!["光合", "合作", "作用"]);
    }

    #[test]
    fn test_grade_rewards_coverage() {
        let kp = point("Ownership", "each value has a single owner and is dropped when the owner goes out of scope");

        let good = grade_answer(
            &kp,
            "Ownership means each value has a single owner; the value is dropped once its owner goes out of scope.",
        );
        let poor = grade_answer(&kp, "It is about memory.");

        assert!(good.score >= 80, "score was {}", good.score);
        assert!(poor.score < 60, "score was {}", poor.score);
        assert!(poor.feedback.contains("Missing keywords"));
        assert!(good.score <= 100);
    }

    #[test]
    fn test_grade_names_at_most_five_missing() {
        let kp = point("alpha", "bravo charlie delta echo foxtrot golf hotel");
        let grade = grade_answer(&kp, "nothing relevant here");
        let missing = grade
            .feedback
            .split("Missing keywords: ")
            .nth(1)
            .unwrap()
            .split('.')
            .next()
            .unwrap();
        assert_eq!(missing.split(", ").count(), MAX_MISSING_KEYWORDS);
    }

    #[test]
    fn test_grade_cjk() {
        let kp = point("光合作用", "植物利用光能");
        let grade = grade_answer(&kp, "光合作用是植物利用光能制造养分的过程");
        assert!(grade.score >= 80, "score was {}", grade.score);
    }

    #[test]
    fn test_grade_without_keywords_is_neutral() {
        let kp = point("A", "");
        let grade = grade_answer(&kp, "abc");
        assert_eq!(grade.score, 54);
    }
}
