use eframe::egui::{self, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::engine::ListEntry;

use super::super::Workspace;

const ROW_HEIGHT: f32 = 22.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Narrows `entries` to those whose name or headline fuzzy-matches `query`.
/// The graph is never filtered by this.
fn search_entries<'a>(entries: &'a [ListEntry], query: &str) -> Vec<&'a ListEntry> {
    let query = query.trim();
    if query.is_empty() {
        return entries.iter().collect();
    }

    let matcher = SkimMatcherV2::default();
    entries
        .iter()
        .filter(|entry| {
            fuzzy_match_score(&matcher, &entry.name, query).is_some()
                || fuzzy_match_score(&matcher, &entry.detail, query).is_some()
        })
        .collect()
}

impl Workspace {
    pub(in crate::app) fn draw_connection_list(&mut self, ui: &mut Ui) {
        ui.heading("Connections");
        ui.add(egui::TextEdit::singleline(&mut self.search).hint_text("Search name or company"));

        let rows = search_entries(&self.list.entries, &self.search);
        ui.small(format!("{} of {}", rows.len(), self.list.entries.len()));
        ui.add_space(4.0);

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("connection_list_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, ROW_HEIGHT, rows.len(), |ui, row_range| {
                for entry in &rows[row_range] {
                    let text = match entry.score {
                        Some(score) => format!("{}  ({})  {score:.0}", entry.name, entry.year),
                        None => format!("{}  ({})", entry.name, entry.year),
                    };
                    let text = if entry.score.is_some() {
                        RichText::new(text).strong()
                    } else {
                        RichText::new(text)
                    };
                    let response = ui.selectable_label(entry.selected, text);
                    let response = if entry.detail.is_empty() {
                        response
                    } else {
                        response.on_hover_text(entry.detail.as_str())
                    };
                    if response.clicked() {
                        clicked = Some(entry.id.clone());
                    }
                }
            });

        if let Some(id) = clicked {
            self.session.select(Some(&id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str, detail: &str) -> ListEntry {
        ListEntry {
            id: id.to_owned(),
            name: name.to_owned(),
            detail: detail.to_owned(),
            year: 2021,
            score: None,
            selected: false,
        }
    }

    #[test]
    fn test_search_matches_name_or_headline() {
        let entries = vec![
            entry("p_0", "Ada Lovelace", "Engineer at Analytical"),
            entry("p_1", "Grace Hopper", "Admiral at Navy"),
        ];

        let ids = |query: &str| {
            search_entries(&entries, query)
                .iter()
                .map(|entry| entry.id.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(""), vec!["p_0", "p_1"]);
        assert_eq!(ids("grace"), vec!["p_1"]);
        assert_eq!(ids("Analytical"), vec!["p_0"]);
        assert!(ids("zzzz").is_empty());
    }
}
