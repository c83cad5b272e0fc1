//! Conversion from raw `api/v3` record maps into typed domain values.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::build::context::{PageMetadata, SiteContext};
use crate::build::tree::{ContentNode, Mark, NodeKind, RichTextSegment, plain_text};
use crate::util::to_bare_id;

/// A record map entry's value.
///
/// Newer `api/v3` responses nest entries one level deeper than they used to:
/// `{ spaceId, value: { value: {...}, role } }` instead of
/// `{ value: {...}, role }`. Both shapes are accepted; double nesting is
/// detected by `value` carrying both a `value` and a `role` key.
pub(super) fn record_value(record: &Value) -> &Value {
    let value = &record["value"];
    if value.get("role").is_some()
        && let Some(inner) = value.get("value")
    {
        return inner;
    }
    value
}

/// Build the site context from a `queryCollection` response.
pub(super) fn parse_table(
    response: &Value,
    collection_id: &str,
) -> Result<SiteContext, super::NotionError> {
    let endpoint = "queryCollection";

    let collection = record_value(&response["recordMap"]["collection"][collection_id]);
    let schema = collection["schema"]
        .as_object()
        .ok_or_else(|| super::NotionError::shape(endpoint, "collection has no schema"))?;

    // Schema maps opaque property ids to named columns; invert it.
    let mut prop_ids: HashMap<&str, &str> = HashMap::new();
    for (prop_id, prop) in schema {
        if let Some(name) = prop["name"].as_str() {
            prop_ids.insert(name, prop_id);
        }
    }

    let block_ids = response["result"]["reducerResults"]["collection_group_results"]["blockIds"]
        .as_array()
        .or_else(|| response["result"]["blockIds"].as_array())
        .ok_or_else(|| super::NotionError::shape(endpoint, "result has no block ids"))?;

    let blocks = &response["recordMap"]["block"];
    let mut pages = Vec::new();

    for block_id in block_ids {
        let Some(block_id) = block_id.as_str() else {
            continue;
        };
        let value = record_value(&blocks[block_id]);
        if value["type"].as_str() != Some("page") {
            continue;
        }

        let prop_text = |name: &str| -> String {
            prop_ids
                .get(name)
                .map(|prop_id| property_text(value, prop_id))
                .unwrap_or_default()
        };

        let bare_id = to_bare_id(block_id);
        let url = match prop_text("url") {
            url if url.is_empty() => format!("{bare_id}.html"),
            url => url,
        };
        let template = match prop_text("template") {
            template if template.is_empty() => "post".to_string(),
            template => template,
        };
        let description = match prop_text("description") {
            description if description.is_empty() => None,
            description => Some(description),
        };

        pages.push(PageMetadata {
            id: bare_id,
            title: property_text(value, "title"),
            url,
            tags: prop_text("tags")
                .split(',')
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            publish: prop_text("publish") == "Yes",
            last_edited_time: value["last_edited_time"].as_i64().unwrap_or(0),
            template,
            description,
        });
    }

    Ok(SiteContext::new(pages))
}

/// Assemble a page's content tree from the blocks of its record map.
pub(super) fn parse_tree(
    root_id: &str,
    blocks: &HashMap<String, Value>,
) -> Result<ContentNode, super::NotionError> {
    build_node(root_id, blocks, true).ok_or_else(|| {
        super::NotionError::shape("loadPageChunk", format!("root block {root_id} missing"))
    })
}

fn build_node(id: &str, blocks: &HashMap<String, Value>, is_root: bool) -> Option<ContentNode> {
    let value = blocks.get(id)?;
    let block_type = value["type"].as_str().unwrap_or("");
    let bare_id = to_bare_id(id);
    let uri = format!("https://www.notion.so/{bare_id}");

    let kind = match block_type {
        // A nested page block is an embed of another page; the root page is
        // just the document being parsed.
        "page" if !is_root => NodeKind::PageReference {
            target: uri.clone(),
        },
        "image" => NodeKind::Image {
            source: image_source(value),
        },
        _ => match value["properties"]["title"].as_array() {
            Some(_) => NodeKind::Text {
                title: parse_rich_text(&value["properties"]["title"]),
            },
            None => NodeKind::Container,
        },
    };

    let mut properties = BTreeMap::new();
    if let Some(props) = value["properties"].as_object() {
        for (prop_id, prop_value) in props {
            // title and source are lifted into the node kind.
            if prop_id == "title" || prop_id == "source" {
                continue;
            }
            properties.insert(prop_id.clone(), parse_rich_text(prop_value));
        }
    }

    let children = value["content"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|child_id| child_id.as_str())
                // Blocks the token cannot read are absent from the map.
                .filter_map(|child_id| build_node(child_id, blocks, false))
                .collect()
        })
        .unwrap_or_default();

    Some(ContentNode {
        id: id.to_string(),
        uri,
        kind,
        properties,
        children,
    })
}

/// Image source: the `source` property, falling back to the display source.
fn image_source(value: &Value) -> String {
    let from_property = property_text(value, "source");
    if !from_property.is_empty() {
        return from_property;
    }
    value["format"]["display_source"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

/// Plain text of a rich-text property.
fn property_text(value: &Value, prop_id: &str) -> String {
    plain_text(&parse_rich_text(&value["properties"][prop_id]))
}

/// Parse Notion's array-encoded rich text into typed segments.
///
/// The wire shape is `[[text, [[mark, arg?], ...]?], ...]`, e.g.
/// `[["bold link", [["b"], ["a", "/65166b73..."]]]]`.
fn parse_rich_text(value: &Value) -> Vec<RichTextSegment> {
    let Some(segments) = value.as_array() else {
        return Vec::new();
    };

    segments
        .iter()
        .filter_map(|segment| {
            let text = segment.get(0)?.as_str()?.to_string();
            let marks = segment
                .get(1)
                .and_then(Value::as_array)
                .map(|marks| marks.iter().filter_map(parse_mark).collect())
                .unwrap_or_default();
            Some(RichTextSegment { text, marks })
        })
        .collect()
}

fn parse_mark(mark: &Value) -> Option<Mark> {
    match mark.get(0)?.as_str()? {
        "b" => Some(Mark::Bold),
        "i" => Some(Mark::Italic),
        "s" => Some(Mark::Strikethrough),
        "c" => Some(Mark::Code),
        "a" => Some(Mark::Link {
            target: mark.get(1)?.as_str()?.to_string(),
        }),
        "p" => Some(Mark::PageMention {
            uri: format!(
                "https://www.notion.so/{}",
                to_bare_id(mark.get(1)?.as_str()?)
            ),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_rich_text() {
        let value = json!([
            ["plain "],
            ["bold link", [["b"], ["a", "/65166b7333374374b13b040ca1599593"]]],
            ["‣", [["p", "0297b381-142d-4bdf-b534-cbbc043353ac"]]]
        ]);

        let segments = parse_rich_text(&value);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], RichTextSegment::plain("plain "));
        assert_eq!(
            segments[1].marks,
            vec![
                Mark::Bold,
                Mark::Link {
                    target: "/65166b7333374374b13b040ca1599593".to_string()
                }
            ]
        );
        assert_eq!(
            segments[2].marks,
            vec![Mark::PageMention {
                uri: "https://www.notion.so/0297b381142d4bdfb534cbbc043353ac".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_rich_text_ignores_unknown_marks() {
        let value = json!([["highlighted", [["h", "yellow"], ["i"]]]]);
        let segments = parse_rich_text(&value);
        assert_eq!(segments[0].marks, vec![Mark::Italic]);
    }

    #[test]
    fn test_parse_tree() {
        let root_id = "0297b381-142d-4bdf-b534-cbbc043353ac";
        let image_id = "aa3f7c1b-e80d-4854-9991-0685dee87ba9";
        let embed_id = "65166b73-3337-4374-b13b-040ca1599593";

        let mut blocks = HashMap::new();
        blocks.insert(
            root_id.to_string(),
            json!({
                "id": root_id,
                "type": "page",
                "properties": { "title": [["My Post"]] },
                "content": [image_id, embed_id, "missing-block"]
            }),
        );
        blocks.insert(
            image_id.to_string(),
            json!({
                "id": image_id,
                "type": "image",
                "properties": { "source": [["attachment:5e0c:photo.png?width=800"]] }
            }),
        );
        blocks.insert(
            embed_id.to_string(),
            json!({
                "id": embed_id,
                "type": "page",
                "properties": { "title": [["Another Page"]] }
            }),
        );

        let tree = parse_tree(root_id, &blocks).unwrap();
        // The root page is the document itself, not a reference.
        assert_eq!(
            tree.kind,
            NodeKind::Text {
                title: vec![RichTextSegment::plain("My Post")]
            }
        );
        // Unreadable children are dropped, not errors.
        assert_eq!(tree.children.len(), 2);
        assert_eq!(
            tree.children[0].kind,
            NodeKind::Image {
                source: "attachment:5e0c:photo.png?width=800".to_string()
            }
        );
        assert_eq!(
            tree.children[1].kind,
            NodeKind::PageReference {
                target: "https://www.notion.so/65166b7333374374b13b040ca1599593".to_string()
            }
        );
    }

    #[test]
    fn test_parse_tree_missing_root() {
        assert!(parse_tree("nope", &HashMap::new()).is_err());
    }

    fn table_response() -> Value {
        json!({
            "result": {
                "reducerResults": {
                    "collection_group_results": {
                        "blockIds": ["row-1", "row-2"]
                    }
                }
            },
            "recordMap": {
                "collection": {
                    "col-1": {
                        "value": {
                            "schema": {
                                "title": { "name": "title", "type": "title" },
                                "Xa<b": { "name": "tags", "type": "multi_select" },
                                "fPr;": { "name": "publish", "type": "checkbox" },
                                "u_rl": { "name": "url", "type": "text" },
                                "tmpl": { "name": "template", "type": "text" }
                            }
                        }
                    }
                },
                "block": {
                    "row-1": {
                        "value": {
                            "id": "row-1",
                            "type": "page",
                            "last_edited_time": 1700000000000i64,
                            "properties": {
                                "title": [["First Post"]],
                                "Xa<b": [["rust,notes"]],
                                "fPr;": [["Yes"]],
                                "u_rl": [["first-post.html"]],
                                "tmpl": [["post"]]
                            }
                        }
                    },
                    "row-2": {
                        "value": {
                            "id": "row-2",
                            "type": "page",
                            "last_edited_time": 1700000001000i64,
                            "properties": {
                                "title": [["Draft"]]
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_table() {
        let site = parse_table(&table_response(), "col-1").unwrap();
        assert_eq!(site.pages.len(), 2);

        let first = &site.pages[0];
        assert_eq!(first.title, "First Post");
        assert_eq!(first.url, "first-post.html");
        assert_eq!(first.tags, vec!["rust", "notes"]);
        assert!(first.publish);
        assert_eq!(first.last_edited_time, 1_700_000_000_000);

        // Missing properties fall back to defaults.
        let second = &site.pages[1];
        assert_eq!(second.url, "row2.html");
        assert_eq!(second.template, "post");
        assert!(!second.publish);
        assert!(second.tags.is_empty());

        // Only published pages reach the tag map.
        assert_eq!(site.tag_map.len(), 2);
        assert_eq!(site.tag_map["rust"].len(), 1);
    }

    #[test]
    fn test_parse_table_bad_shape() {
        assert!(parse_table(&json!({}), "col-1").is_err());
    }

    #[test]
    fn test_record_value_unwraps_double_nesting() {
        let flat = json!({ "value": { "type": "page" }, "role": "reader" });
        assert_eq!(record_value(&flat)["type"], "page");

        let nested = json!({
            "spaceId": "space-1",
            "value": { "value": { "type": "page" }, "role": "reader" }
        });
        assert_eq!(record_value(&nested)["type"], "page");

        // An inner "value" key without a sibling "role" is block data, not
        // nesting.
        let plain = json!({ "value": { "value": [["x"]] } });
        assert_eq!(*record_value(&plain), plain["value"]);
    }

    #[test]
    fn test_parse_table_double_nested_records() {
        let mut response = table_response();
        for table in ["collection", "block"] {
            let entries = response["recordMap"][table].as_object_mut().unwrap();
            for record in entries.values_mut() {
                let inner = record["value"].take();
                *record = json!({
                    "spaceId": "space-1",
                    "value": { "value": inner, "role": "reader" }
                });
            }
        }

        let site = parse_table(&response, "col-1").unwrap();
        assert_eq!(site.pages.len(), 2);
        assert_eq!(site.pages[0].title, "First Post");
        assert_eq!(site.pages[0].url, "first-post.html");
    }
}
