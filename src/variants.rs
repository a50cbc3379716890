//! The slide content variant registry: nine closed layout shapes.
//!
//! Downstream layout assignment picks one of nine fixed slide shapes per
//! slide; this module owns those shapes and the transform into the
//! generation-ready form consumed by the renderer-facing model calls.
//!
//! The transform's one shared rule is the **arity placeholder**: whenever a
//! variant carries a per-item auxiliary list (icon queries or image prompts)
//! that is shorter than its heading list, or an entry is empty or whitespace,
//! the missing entry becomes [`AUX_PLACEHOLDER`]. Every item of a transformed
//! variant therefore has the same shape — downstream code never has to
//! distinguish "no auxiliary data" from "auxiliary data misaligned by index".

use serde::{Deserialize, Serialize};

/// Sentinel substituted for a missing or blank per-item auxiliary entry.
pub const AUX_PLACEHOLDER: &str = "default";

/// Chart/graph rendering kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Table,
    Bar,
    Line,
    Pie,
}

/// A chart/graph payload, consumed unchanged by variants 5 and 9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub name: String,
    pub kind: GraphKind,
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

/// One heading/description pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingItem {
    pub heading: String,
    pub description: String,
}

/// The nine closed slide-layout variants, numbered 1–9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlideContent {
    /// 1 — markdown body plus image prompts.
    Body {
        title: String,
        body: String,
        image_prompts: Vec<String>,
    },
    /// 2 — list of heading pairs.
    Headings {
        title: String,
        items: Vec<HeadingItem>,
    },
    /// 3 — heading pairs plus a slide-level image prompt list.
    HeadingsWithImage {
        title: String,
        items: Vec<HeadingItem>,
        image_prompts: Vec<String>,
    },
    /// 4 — heading pairs with one image prompt per item.
    HeadingsWithItemImages {
        title: String,
        items: Vec<HeadingItem>,
        image_prompts: Vec<String>,
    },
    /// 5 — markdown body plus a chart/graph spec.
    BodyWithGraph {
        title: String,
        body: String,
        graph: GraphSpec,
    },
    /// 6 — description plus heading pairs.
    DescribedHeadings {
        title: String,
        description: String,
        items: Vec<HeadingItem>,
    },
    /// 7 — heading pairs with one icon query per item.
    HeadingsWithIcons {
        title: String,
        items: Vec<HeadingItem>,
        icon_queries: Vec<String>,
    },
    /// 8 — description plus heading pairs with one icon query per item.
    DescribedHeadingsWithIcons {
        title: String,
        description: String,
        items: Vec<HeadingItem>,
        icon_queries: Vec<String>,
    },
    /// 9 — heading pairs plus a chart/graph spec.
    HeadingsWithGraph {
        title: String,
        items: Vec<HeadingItem>,
        graph: GraphSpec,
    },
}

/// A heading item in generation-ready form.
///
/// All items produced for one variant share a single alternative, so the
/// downstream consumer sees consistent arity and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadyItem {
    Plain {
        heading: String,
        description: String,
    },
    WithImagePrompt {
        heading: String,
        description: String,
        image_prompt: String,
    },
    WithIconQuery {
        heading: String,
        description: String,
        icon_query: String,
    },
}

/// Generation-ready form of a [`SlideContent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadySlideContent {
    Body {
        title: String,
        body: String,
        image_prompt: String,
    },
    Headings {
        title: String,
        items: Vec<ReadyItem>,
    },
    HeadingsWithImage {
        title: String,
        items: Vec<ReadyItem>,
        image_prompt: String,
    },
    HeadingsWithItemImages {
        title: String,
        items: Vec<ReadyItem>,
    },
    BodyWithGraph {
        title: String,
        body: String,
        graph: GraphSpec,
    },
    DescribedHeadings {
        title: String,
        description: String,
        items: Vec<ReadyItem>,
    },
    HeadingsWithIcons {
        title: String,
        items: Vec<ReadyItem>,
    },
    DescribedHeadingsWithIcons {
        title: String,
        description: String,
        items: Vec<ReadyItem>,
    },
    HeadingsWithGraph {
        title: String,
        items: Vec<ReadyItem>,
        graph: GraphSpec,
    },
}

/// Per-item auxiliary entry, with the arity placeholder rule applied.
///
/// Entries beyond the heading list are ignored; missing and blank entries
/// become [`AUX_PLACEHOLDER`].
fn aux_or_placeholder(aux: &[String], i: usize) -> String {
    match aux.get(i) {
        Some(s) if !s.trim().is_empty() => s.clone(),
        _ => AUX_PLACEHOLDER.to_string(),
    }
}

/// Slide-level image prompt: first entry, or empty when none were supplied.
fn first_prompt(prompts: &[String]) -> String {
    prompts.first().cloned().unwrap_or_default()
}

fn plain_items(items: &[HeadingItem]) -> Vec<ReadyItem> {
    items
        .iter()
        .map(|item| ReadyItem::Plain {
            heading: item.heading.clone(),
            description: item.description.clone(),
        })
        .collect()
}

fn items_with_image_prompts(items: &[HeadingItem], prompts: &[String]) -> Vec<ReadyItem> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| ReadyItem::WithImagePrompt {
            heading: item.heading.clone(),
            description: item.description.clone(),
            image_prompt: aux_or_placeholder(prompts, i),
        })
        .collect()
}

fn items_with_icon_queries(items: &[HeadingItem], queries: &[String]) -> Vec<ReadyItem> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| ReadyItem::WithIconQuery {
            heading: item.heading.clone(),
            description: item.description.clone(),
            icon_query: aux_or_placeholder(queries, i),
        })
        .collect()
}

impl SlideContent {
    /// The variant's registry number, 1–9.
    pub fn variant_number(&self) -> u8 {
        match self {
            SlideContent::Body { .. } => 1,
            SlideContent::Headings { .. } => 2,
            SlideContent::HeadingsWithImage { .. } => 3,
            SlideContent::HeadingsWithItemImages { .. } => 4,
            SlideContent::BodyWithGraph { .. } => 5,
            SlideContent::DescribedHeadings { .. } => 6,
            SlideContent::HeadingsWithIcons { .. } => 7,
            SlideContent::DescribedHeadingsWithIcons { .. } => 8,
            SlideContent::HeadingsWithGraph { .. } => 9,
        }
    }

    /// Transform into the generation-ready form.
    ///
    /// Pure per-variant mapping; the only shared behaviour is the arity
    /// placeholder rule for per-item auxiliary lists.
    pub fn to_generation_ready(&self) -> ReadySlideContent {
        match self {
            SlideContent::Body {
                title,
                body,
                image_prompts,
            } => ReadySlideContent::Body {
                title: title.clone(),
                body: body.clone(),
                image_prompt: first_prompt(image_prompts),
            },
            SlideContent::Headings { title, items } => ReadySlideContent::Headings {
                title: title.clone(),
                items: plain_items(items),
            },
            SlideContent::HeadingsWithImage {
                title,
                items,
                image_prompts,
            } => ReadySlideContent::HeadingsWithImage {
                title: title.clone(),
                items: plain_items(items),
                image_prompt: first_prompt(image_prompts),
            },
            SlideContent::HeadingsWithItemImages {
                title,
                items,
                image_prompts,
            } => ReadySlideContent::HeadingsWithItemImages {
                title: title.clone(),
                items: items_with_image_prompts(items, image_prompts),
            },
            SlideContent::BodyWithGraph { title, body, graph } => {
                ReadySlideContent::BodyWithGraph {
                    title: title.clone(),
                    body: body.clone(),
                    graph: graph.clone(),
                }
            }
            SlideContent::DescribedHeadings {
                title,
                description,
                items,
            } => ReadySlideContent::DescribedHeadings {
                title: title.clone(),
                description: description.clone(),
                items: plain_items(items),
            },
            SlideContent::HeadingsWithIcons {
                title,
                items,
                icon_queries,
            } => ReadySlideContent::HeadingsWithIcons {
                title: title.clone(),
                items: items_with_icon_queries(items, icon_queries),
            },
            SlideContent::DescribedHeadingsWithIcons {
                title,
                description,
                items,
                icon_queries,
            } => ReadySlideContent::DescribedHeadingsWithIcons {
                title: title.clone(),
                description: description.clone(),
                items: items_with_icon_queries(items, icon_queries),
            },
            SlideContent::HeadingsWithGraph { title, items, graph } => {
                ReadySlideContent::HeadingsWithGraph {
                    title: title.clone(),
                    items: plain_items(items),
                    graph: graph.clone(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<HeadingItem> {
        (0..n)
            .map(|i| HeadingItem {
                heading: format!("Heading {i}"),
                description: format!("Description {i}"),
            })
            .collect()
    }

    fn icon_queries_of(ready: &ReadySlideContent) -> Vec<String> {
        let items = match ready {
            ReadySlideContent::HeadingsWithIcons { items, .. } => items,
            ReadySlideContent::DescribedHeadingsWithIcons { items, .. } => items,
            other => panic!("unexpected variant: {other:?}"),
        };
        items
            .iter()
            .map(|item| match item {
                ReadyItem::WithIconQuery { icon_query, .. } => icon_query.clone(),
                other => panic!("unexpected item shape: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn variant_numbers_are_stable() {
        let graph = GraphSpec {
            name: "g".into(),
            kind: GraphKind::Bar,
            x_labels: vec![],
            y_labels: vec![],
            data: vec![],
        };
        let all = [
            SlideContent::Body {
                title: "t".into(),
                body: "b".into(),
                image_prompts: vec![],
            },
            SlideContent::Headings {
                title: "t".into(),
                items: items(1),
            },
            SlideContent::HeadingsWithImage {
                title: "t".into(),
                items: items(1),
                image_prompts: vec![],
            },
            SlideContent::HeadingsWithItemImages {
                title: "t".into(),
                items: items(1),
                image_prompts: vec![],
            },
            SlideContent::BodyWithGraph {
                title: "t".into(),
                body: "b".into(),
                graph: graph.clone(),
            },
            SlideContent::DescribedHeadings {
                title: "t".into(),
                description: "d".into(),
                items: items(1),
            },
            SlideContent::HeadingsWithIcons {
                title: "t".into(),
                items: items(1),
                icon_queries: vec![],
            },
            SlideContent::DescribedHeadingsWithIcons {
                title: "t".into(),
                description: "d".into(),
                items: items(1),
                icon_queries: vec![],
            },
            SlideContent::HeadingsWithGraph {
                title: "t".into(),
                items: items(1),
                graph,
            },
        ];
        let numbers: Vec<u8> = all.iter().map(SlideContent::variant_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn short_icon_query_list_is_padded_with_placeholder() {
        let content = SlideContent::HeadingsWithIcons {
            title: "t".into(),
            items: items(3),
            icon_queries: vec!["rocket".into()],
        };
        let queries = icon_queries_of(&content.to_generation_ready());
        assert_eq!(queries, vec!["rocket", AUX_PLACEHOLDER, AUX_PLACEHOLDER]);
    }

    #[test]
    fn blank_icon_query_normalises_to_placeholder() {
        let content = SlideContent::DescribedHeadingsWithIcons {
            title: "t".into(),
            description: "d".into(),
            items: items(3),
            icon_queries: vec!["rocket".into(), "   ".into(), "".into()],
        };
        let queries = icon_queries_of(&content.to_generation_ready());
        assert_eq!(queries, vec!["rocket", AUX_PLACEHOLDER, AUX_PLACEHOLDER]);
    }

    #[test]
    fn excess_auxiliary_entries_are_ignored() {
        let content = SlideContent::HeadingsWithIcons {
            title: "t".into(),
            items: items(2),
            icon_queries: vec!["a".into(), "b".into(), "c".into()],
        };
        let queries = icon_queries_of(&content.to_generation_ready());
        assert_eq!(queries, vec!["a", "b"]);
    }

    #[test]
    fn per_item_image_prompts_follow_the_same_rule() {
        let content = SlideContent::HeadingsWithItemImages {
            title: "t".into(),
            items: items(2),
            image_prompts: vec!["".into()],
        };
        match content.to_generation_ready() {
            ReadySlideContent::HeadingsWithItemImages { items, .. } => {
                for item in &items {
                    match item {
                        ReadyItem::WithImagePrompt { image_prompt, .. } => {
                            assert_eq!(image_prompt, AUX_PLACEHOLDER);
                        }
                        other => panic!("unexpected item shape: {other:?}"),
                    }
                }
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn slide_level_image_prompt_takes_first_entry() {
        let content = SlideContent::Body {
            title: "t".into(),
            body: "b".into(),
            image_prompts: vec!["skyline at dusk".into(), "unused".into()],
        };
        match content.to_generation_ready() {
            ReadySlideContent::Body { image_prompt, .. } => {
                assert_eq!(image_prompt, "skyline at dusk");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn graph_spec_passes_through_unchanged() {
        let graph = GraphSpec {
            name: "Revenue by quarter".into(),
            kind: GraphKind::Line,
            x_labels: vec!["Q1".into(), "Q2".into()],
            y_labels: vec!["EUR".into()],
            data: vec![vec![1.0, 2.0]],
        };
        let content = SlideContent::BodyWithGraph {
            title: "t".into(),
            body: "b".into(),
            graph: graph.clone(),
        };
        match content.to_generation_ready() {
            ReadySlideContent::BodyWithGraph { graph: g, .. } => assert_eq!(g, graph),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
