//! Single alignment class per node.

const ALIGN_PREFIX: &str = "align";

fn normalized(name: &str) -> String {
    name.chars().filter(|c| *c != '_' && *c != '-').collect()
}

/// Class list for a node after an `align*` format was toggled on it.
///
/// Keeps exactly one `align*` class: the one matching `applied` (compared
/// without `_` and `-`, so format `alignright` matches class `align_right`)
/// or, when none matches, the last one. Other classes keep their order.
/// Returns `None` when the list already has at most one alignment class.
pub fn enforce_single_align(class_name: &str, applied: &str) -> Option<String> {
    let aligns: Vec<&str> = class_name
        .split_whitespace()
        .filter(|class| class.starts_with(ALIGN_PREFIX))
        .collect();
    if aligns.len() <= 1 {
        return None;
    }

    let applied = normalized(applied);
    let keep = aligns
        .iter()
        .rev()
        .find(|class| normalized(class) == applied)
        .or_else(|| aligns.last())
        .copied()?;

    let mut kept = false;
    let classes: Vec<&str> = class_name
        .split_whitespace()
        .filter(|class| {
            if !class.starts_with(ALIGN_PREFIX) {
                return true;
            }
            if *class == keep && !kept {
                kept = true;
                return true;
            }
            false
        })
        .collect();
    Some(classes.join(" "))
}
