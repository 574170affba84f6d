use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use serde_json::{Map, Value};

use xerror::gateway::GatewayError;

struct Node {
    name: String,
    children: Map<String, Value>,
    text: String,
}

/// Parses a gateway XML document into a JSON value: elements become
/// objects, leaf text becomes strings, repeated siblings collapse into
/// arrays. This is the shape stored in `payments.data`, so status lookups
/// work the same against fresh and persisted documents.
pub fn parse_document(xml: &str) -> Result<Value, GatewayError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Node> = vec![Node {
        name: String::new(),
        children: Map::new(),
        text: String::new(),
    }];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                stack.push(Node {
                    name,
                    children: Map::new(),
                    text: String::new(),
                });
            }
            Ok(Event::Empty(empty)) => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).to_string();
                let parent = stack.last_mut().expect("document root frame");
                insert_child(&mut parent.children, name, Value::Null);
            }
            Ok(Event::Text(text)) => {
                let unescaped = text
                    .unescape()
                    .map_err(|err| GatewayError::Parse(err.to_string()))?;
                stack
                    .last_mut()
                    .expect("document root frame")
                    .text
                    .push_str(&unescaped);
            }
            Ok(Event::CData(cdata)) => {
                let raw = String::from_utf8_lossy(cdata.as_ref()).to_string();
                stack.last_mut().expect("document root frame").text.push_str(&raw);
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| GatewayError::Parse("unbalanced document".to_string()))?;
                let value = if node.children.is_empty() {
                    if node.text.is_empty() {
                        Value::Null
                    } else {
                        Value::String(node.text)
                    }
                } else {
                    Value::Object(node.children)
                };
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| GatewayError::Parse("unbalanced document".to_string()))?;
                insert_child(&mut parent.children, node.name, value);
            }
            Ok(Event::Eof) => break,
            Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
            Err(err) => return Err(GatewayError::Parse(err.to_string())),
        }
    }

    if stack.len() != 1 {
        return Err(GatewayError::Parse("unterminated element".to_string()));
    }
    let root = stack.pop().expect("document root frame");
    if root.children.is_empty() {
        return Err(GatewayError::Parse("document without a root element".to_string()));
    }
    Ok(Value::Object(root.children))
}

fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(list)) => list.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Leaf text lookup, e.g. `text_at(&doc, &["transaction", "status"])`.
pub fn text_at<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = doc;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str()
}

/// Serializes a value as an XML document under the given root tag.
pub fn to_xml<T: Serialize>(root: &str, value: &T) -> Result<String, GatewayError> {
    let mut buffer = String::new();
    let serializer = quick_xml::se::Serializer::with_root(&mut buffer, Some(root))
        .map_err(|err| GatewayError::Parse(err.to_string()))?;
    value
        .serialize(serializer)
        .map_err(|err| GatewayError::Parse(err.to_string()))?;
    Ok(buffer)
}
