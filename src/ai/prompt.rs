use std::fmt::Write as _;

use crate::network::{Network, Node};
use crate::util::truncate_chars;

const SUMMARY_CHARS: usize = 600;
const FIELD_CHARS: usize = 80;

fn descriptor(node: &Node) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        node.id,
        truncate_chars(node.display_name(), FIELD_CHARS),
        truncate_chars(&node.role, FIELD_CHARS),
        truncate_chars(&node.company, FIELD_CHARS),
        node.year()
    )
}

/// Builds the relevance prompt: owner profile, one line per connection (at
/// most `node_limit`), then the answer contract.
pub fn build_prompt(network: &Network, query: &str, node_limit: usize) -> String {
    let profile = network.profile();
    let mut prompt = String::new();

    prompt.push_str(
        "You help someone search their professional network. Pick the connections that best answer the question.\n\n",
    );

    if !profile.is_empty() {
        prompt.push_str("About me:\n");
        if !profile.headline.is_empty() {
            let _ = writeln!(prompt, "Headline: {}", profile.headline);
        }
        if !profile.industry.is_empty() {
            let _ = writeln!(prompt, "Industry: {}", profile.industry);
        }
        if !profile.summary.is_empty() {
            let _ = writeln!(
                prompt,
                "Summary: {}",
                truncate_chars(&profile.summary, SUMMARY_CHARS)
            );
        }
        prompt.push('\n');
    }

    let connections = network.connections();
    let shown = connections.len().min(node_limit);
    let _ = writeln!(
        prompt,
        "Connections ({shown} of {}), one per line as `id | name | role | company | year connected`:",
        connections.len()
    );
    for node in connections.iter().take(node_limit) {
        prompt.push_str(&descriptor(node));
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        r#"
Question: {query}

Reply with JSON only, no prose and no code fences, in exactly this shape:
{{"explanation": "one or two sentences", "matches": [{{"id": "p_0", "name": "...", "score": 0-100, "reason": "...", "aspect": "role|company|industry|other"}}]}}
Use only ids from the list above. Return at most 25 matches, best first."#,
        query = query.trim()
    );

    prompt
}
