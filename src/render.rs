// src/render.rs
// Plain-text cards for the terminal client.

use std::fmt::Write as _;

use crate::config::ai::Locale;
use crate::news::NewsItem;

const SOURCE_TITLE_CHARS: usize = 18;

pub fn stars(item: &NewsItem) -> String {
    let n = item.stars() as usize;
    format!("{}{}", "★".repeat(n), "☆".repeat(5 - n))
}

/// Citation label: first 18 chars of the title plus `...`.
pub fn source_label(title: &str, locale: Locale) -> String {
    let t = title.trim();
    if t.is_empty() {
        let fallback = match locale {
            Locale::Ja => "ソースを表示",
            Locale::En => "View source",
        };
        return format!("{fallback}...");
    }
    let cut: String = t.chars().take(SOURCE_TITLE_CHARS).collect();
    format!("{cut}...")
}

/// Known categories show their canonical label; anything else is shown as given.
pub fn category_label(item: &NewsItem) -> Option<String> {
    if let Some(c) = item.tech_category() {
        return Some(c.label().to_string());
    }
    let raw = item.category.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

struct Headings {
    briefing: &'static str,
    simple: &'static str,
    watch: &'static str,
    risks: &'static str,
    regions: &'static str,
}

fn headings(locale: Locale) -> Headings {
    match locale {
        Locale::Ja => Headings {
            briefing: "Tech Briefing",
            simple: "やさしい解説",
            watch: "注目",
            risks: "リスク",
            regions: "影響",
        },
        Locale::En => Headings {
            briefing: "Tech Briefing",
            simple: "In plain words",
            watch: "Why watch",
            risks: "Risks",
            regions: "Affected",
        },
    }
}

pub fn card(item: &NewsItem, locale: Locale) -> String {
    let h = headings(locale);
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}  {}", item.index, item.topic, stars(item));
    let _ = writeln!(out, "{}", item.title);
    if let Some(label) = category_label(item) {
        let _ = writeln!(out, "  #{label}");
    }
    let _ = writeln!(out, "  {}: {}", h.briefing, item.technical_summary);
    let _ = writeln!(out, "  {}: {}", h.simple, item.simple_summary);
    let _ = writeln!(out, "  {}: {}", h.watch, item.why_watch);
    let _ = writeln!(out, "  {}: {}", h.risks, item.risks);
    for group in &item.affected_entities {
        let _ = writeln!(out, "  {}: {} / {}", h.regions, group.region, group.entities.join(", "));
    }
    for src in &item.source_urls {
        let _ = writeln!(out, "  -> {} {}", source_label(&src.title, locale), src.uri);
    }
    out
}

pub fn cards(items: &[NewsItem], locale: Locale) -> String {
    items
        .iter()
        .map(|it| card(it, locale))
        .collect::<Vec<_>>()
        .join("\n")
}
