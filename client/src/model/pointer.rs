//! RFC 6901 JSON Pointer, implemented directly against [`serde_json::Value`]
//! since this crate has no use for a generic JSON-Patch library beyond the
//! single "set at pointer" operation the layout-update protocol needs.

use derive_more::Display;
use serde_json::Value as Json;

/// Errors that can occur while applying a pointer-addressed patch.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum PointerError {
    /// A reference token indexed into a JSON value that was neither an
    /// object nor an array.
    #[display(fmt = "Cannot index {:?} with token `{}`", _0, _1)]
    NotIndexable(Json, String),

    /// An array reference token was not a valid index (and not the
    /// append-marker `-`).
    #[display(fmt = "Invalid array index token `{}`", _0)]
    InvalidArrayIndex(String),

    /// An array reference token addressed past the end of the array.
    #[display(fmt = "Array index {} out of bounds (len {})", _0, _1)]
    ArrayIndexOutOfBounds(usize, usize),

    /// The pointer's parent path does not exist; this store does not
    /// auto-vivify missing intermediate objects/arrays.
    #[display(fmt = "Parent of pointer `{}` does not exist", _0)]
    MissingParent(String),
}

/// Splits a JSON Pointer into its reference tokens, unescaping `~1` to `/`
/// and `~0` to `~` (RFC 6901 §4).
fn tokens(pointer: &str) -> impl Iterator<Item = String> + '_ {
    pointer
        .split('/')
        .skip(1)
        .map(|tok| tok.replace("~1", "/").replace("~0", "~"))
}

/// Sets the value at `pointer` within `document` to `value`.
///
/// `pointer == ""` deep-merges `value` into the document root: an object
/// `value` is merged key-by-key (recursively, for nested objects), so
/// sibling fields the patch doesn't mention survive; anything else (a
/// non-object `value`, or a document root that isn't itself an object)
/// replaces the root outright, matching [`deep_merge`]'s base case.
/// Otherwise, every reference token but the last is walked as a lookup; the
/// last token is where `value` is written. Missing intermediate
/// objects/arrays are **not** created: a pointer into an absent parent is an
/// error, matching the "discard patch" policy around bad pointers.
///
/// # Errors
///
/// Returns [`PointerError`] if any but the last reference token fails to
/// resolve, or if the last token cannot address a location in its parent
/// (e.g. a non-integer, out-of-bounds array index).
pub fn set(
    document: &mut Json,
    pointer: &str,
    value: Json,
) -> Result<(), PointerError> {
    if pointer.is_empty() {
        deep_merge(document, value);
        return Ok(());
    }

    let tokens: Vec<String> = tokens(pointer).collect();
    let (last, parents) = tokens.split_last().expect("pointer is non-empty");

    let mut current = document;
    for token in parents {
        current = step(current, token, pointer)?;
    }

    set_token(current, last, value, pointer)
}

/// Merges `source` into `target` in place: when both are objects, each key
/// of `source` is merged into `target`'s value at that key (recursing for
/// nested objects, inserting keys `target` doesn't have yet); every other
/// combination of shapes just replaces `target` with `source` wholesale,
/// since there's no sensible field-by-field merge of e.g. two arrays or two
/// strings.
fn deep_merge(target: &mut Json, source: Json) {
    match source {
        Json::Object(source_map) => match target {
            Json::Object(target_map) => {
                for (key, value) in source_map {
                    match target_map.get_mut(&key) {
                        Some(existing) => deep_merge(existing, value),
                        None => {
                            target_map.insert(key, value);
                        }
                    }
                }
            }
            _ => *target = Json::Object(source_map),
        },
        other => *target = other,
    }
}

/// Walks one reference `token` into `value`, returning the child location.
fn step<'v>(
    value: &'v mut Json,
    token: &str,
    pointer: &str,
) -> Result<&'v mut Json, PointerError> {
    match value {
        Json::Object(map) => map
            .get_mut(token)
            .ok_or_else(|| PointerError::MissingParent(pointer.to_owned())),
        Json::Array(arr) => {
            let index = parse_index(token, arr.len())?;
            arr.get_mut(index)
                .ok_or_else(|| PointerError::MissingParent(pointer.to_owned()))
        }
        other => Err(PointerError::NotIndexable(other.clone(), token.to_owned())),
    }
}

/// Writes `value` at the final reference `token` of `parent`.
fn set_token(
    parent: &mut Json,
    token: &str,
    value: Json,
    pointer: &str,
) -> Result<(), PointerError> {
    match parent {
        Json::Object(map) => {
            map.insert(token.to_owned(), value);
            Ok(())
        }
        Json::Array(arr) => {
            if token == "-" {
                arr.push(value);
                return Ok(());
            }
            let index = parse_index(token, arr.len())?;
            if index == arr.len() {
                arr.push(value);
            } else if index < arr.len() {
                arr[index] = value;
            } else {
                return Err(PointerError::ArrayIndexOutOfBounds(
                    index,
                    arr.len(),
                ));
            }
            Ok(())
        }
        other => Err(PointerError::NotIndexable(
            std::mem::replace(other, Json::Null),
            pointer.to_owned(),
        )),
    }
}

fn parse_index(token: &str, len: usize) -> Result<usize, PointerError> {
    if token == "-" {
        return Ok(len);
    }
    token
        .parse()
        .map_err(|_| PointerError::InvalidArrayIndex(token.to_owned()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn replaces_whole_document_at_root_pointer() {
        let mut doc = json!({"tagName": "div"});
        set(&mut doc, "", json!({"tagName": "span"})).unwrap();
        assert_eq!(doc, json!({"tagName": "span"}));
    }

    #[test]
    fn deep_merges_object_at_root_preserving_untouched_siblings() {
        let mut doc = json!({"tagName": "div", "attributes": {"id": "x"}});
        set(&mut doc, "", json!({"tagName": "span"})).unwrap();
        assert_eq!(
            doc,
            json!({"tagName": "span", "attributes": {"id": "x"}})
        );
    }

    #[test]
    fn deep_merge_at_root_recurses_into_nested_objects() {
        let mut doc =
            json!({"attributes": {"id": "x", "class": "a"}, "tagName": "div"});
        set(&mut doc, "", json!({"attributes": {"class": "b"}})).unwrap();
        assert_eq!(
            doc,
            json!({"attributes": {"id": "x", "class": "b"}, "tagName": "div"})
        );
    }

    #[test]
    fn non_object_value_replaces_root_wholesale() {
        let mut doc = json!({"tagName": "div"});
        set(&mut doc, "", json!("unmounted")).unwrap();
        assert_eq!(doc, json!("unmounted"));
    }

    #[test]
    fn sets_nested_object_field() {
        let mut doc = json!({"attributes": {"value": "a"}});
        set(&mut doc, "/attributes/value", json!("b")).unwrap();
        assert_eq!(doc, json!({"attributes": {"value": "b"}}));
    }

    #[test]
    fn sets_array_element_by_index() {
        let mut doc = json!({"children": ["a", "b", "c"]});
        set(&mut doc, "/children/1", json!("z")).unwrap();
        assert_eq!(doc, json!({"children": ["a", "z", "c"]}));
    }

    #[test]
    fn appends_with_dash_token() {
        let mut doc = json!({"children": ["a"]});
        set(&mut doc, "/children/-", json!("b")).unwrap();
        assert_eq!(doc, json!({"children": ["a", "b"]}));
    }

    #[test]
    fn unescapes_tilde_and_slash_tokens() {
        let mut doc = json!({"a/b": {"c~d": 1}});
        set(&mut doc, "/a~1b/c~0d", json!(2)).unwrap();
        assert_eq!(doc, json!({"a/b": {"c~d": 2}}));
    }

    #[test]
    fn errors_on_missing_intermediate_parent() {
        let mut doc = json!({});
        let err = set(&mut doc, "/attributes/value", json!("x")).unwrap_err();
        assert!(matches!(err, PointerError::MissingParent(_)));
    }

    #[test]
    fn errors_on_out_of_bounds_array_index() {
        let mut doc = json!({"children": ["a"]});
        let err = set(&mut doc, "/children/5", json!("x")).unwrap_err();
        assert!(matches!(err, PointerError::ArrayIndexOutOfBounds(5, 1)));
    }
}
