//! `$` directives
//!
//! Properties whose name starts with `$` are not rendered as-is. `$on<event>`
//! becomes an `on<event>` property naming the component event to run when the
//! host reports `<event>` on that node (see
//! [`Component::handle_host_event`](crate::Component::handle_host_event)).
//! Any other directive is stripped from the node and broadcast on the shared
//! bus after the patch, so external code can attach custom behavior.

use pulse_core::Value;
use pulse_vdom::{Props, VNode};
use serde_json::json;

/// First character of a directive property
pub const DIRECTIVE_MARKER: char = '$';

/// Directive binding a host event to a component event
pub const EVENT_DIRECTIVE: &str = "$on";

/// Prefix of the property an event directive is rewritten into
pub const EVENT_PROP_PREFIX: &str = "on";

/// An unrecognized directive found on a structured node
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// Directive property name, marker included
    pub key: String,
    pub tag: String,
    /// All properties of the node, directives included
    pub properties: Props,
}

impl Directive {
    /// Broadcast payload: `{ key, tag, properties }`
    pub fn to_value(&self) -> Value {
        json!({
            "key": self.key,
            "tag": self.tag,
            "properties": serde_json::to_value(&self.properties).unwrap_or_default(),
        })
    }
}

/// Rewrite event directives in place and strip and collect the rest
pub fn extract(nodes: &mut [VNode]) -> Vec<Directive> {
    let mut directives = Vec::new();
    for node in nodes {
        walk(node, &mut directives);
    }
    directives
}

fn walk(node: &mut VNode, directives: &mut Vec<Directive>) {
    let VNode::Element(element) = node else {
        return;
    };

    let names: Vec<String> = element
        .props
        .keys()
        .filter(|name| name.starts_with(DIRECTIVE_MARKER))
        .cloned()
        .collect();
    if !names.is_empty() {
        let snapshot = element.props.clone();
        for name in names {
            let Some(value) = element.props.shift_remove(&name) else {
                continue;
            };
            match name.strip_prefix(EVENT_DIRECTIVE).filter(|event| !event.is_empty()) {
                Some(event) => {
                    element
                        .props
                        .insert(format!("{EVENT_PROP_PREFIX}{event}"), value);
                }
                None => directives.push(Directive {
                    key: name,
                    tag: element.tag.clone(),
                    properties: snapshot.clone(),
                }),
            }
        }
    }

    for child in &mut element.children {
        walk(child, directives);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pulse_vdom::{el, Prop};

    #[test]
    fn test_event_directive_is_rewritten() {
        let mut nodes = vec![el("button").prop("$onclick", "save").child("Save").into()];
        let directives = extract(&mut nodes);

        assert!(directives.is_empty());
        let button = nodes[0].as_element().unwrap();
        assert_eq!(button.props.get("onclick"), Some(&Prop::from("save")));
        assert!(!button.props.contains_key("$onclick"));
    }

    #[test]
    fn test_unknown_directives_are_collected_from_nested_nodes() {
        let mut nodes = vec![el("div")
            .child(el("input").prop("$focus", true).prop("name", "q"))
            .into()];
        let directives = extract(&mut nodes);

        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].key, "$focus");
        assert_eq!(
            directives[0].to_value(),
            json!({
                "key": "$focus",
                "tag": "input",
                "properties": {"$focus": true, "name": "q"}
            })
        );

        let input = nodes[0].as_element().unwrap().children[0].as_element().unwrap();
        assert_eq!(input.props.len(), 1);
    }
}
