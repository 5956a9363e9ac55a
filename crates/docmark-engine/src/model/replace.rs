//! The structural replace algorithm behind [`Node::replace`].
//!
//! Replacing `from..to` with an open slice stitches the slice's open
//! sides onto the nodes at either end of the range, level by level. Every
//! rebuilt node is checked against its content expression; nothing is
//! fitted or repaired, so content that does not fit is an error.

use crate::error::{EditorError, Result};

use super::fragment::Fragment;
use super::node::Node;
use super::resolve::ResolvedPos;
use super::slice::Slice;

pub(crate) fn replace(from: &ResolvedPos<'_>, to: &ResolvedPos<'_>, slice: &Slice) -> Result<Node> {
    if slice.open_start > from.depth() {
        return Err(EditorError::invalid_edit(
            "inserted content deeper than insertion position",
        ));
    }
    if slice.open_end > to.depth()
        || from.depth() - slice.open_start != to.depth() - slice.open_end
    {
        return Err(EditorError::invalid_edit("inconsistent open depths"));
    }
    replace_outer(from, to, slice, 0)
}

fn replace_outer(
    from: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    slice: &Slice,
    depth: usize,
) -> Result<Node> {
    let index = from.index(depth);
    let node = from.node(depth);
    if index == to.index(depth) && depth < from.depth() - slice.open_start {
        let inner = replace_outer(from, to, slice, depth + 1)?;
        return Ok(node.copy(node.content().replace_child(index, inner)));
    }
    if slice.content.size() == 0 {
        return close(node, replace_two_way(from, to, depth)?);
    }
    if slice.open_start == 0 && slice.open_end == 0 && from.depth() == depth && to.depth() == depth
    {
        let content = node.content();
        let joined = content
            .cut(0, from.parent_offset())
            .append(&slice.content)
            .append(&content.cut(to.parent_offset(), content.size()));
        return close(node, joined);
    }
    let (wrapped, start, end) = prepare_slice_for_replace(slice, from);
    let rstart = wrapped.resolve(start)?;
    let rend = wrapped.resolve(end)?;
    close(node, replace_three_way(from, &rstart, &rend, to, depth)?)
}

fn check_join(main: &Node, sub: &Node) -> Result<()> {
    if !sub.node_type().compatible_content(main.node_type()) {
        return Err(EditorError::invalid_edit(format!(
            "cannot join {} onto {}",
            sub.type_name(),
            main.type_name()
        )));
    }
    Ok(())
}

fn joinable<'a>(before: &ResolvedPos<'a>, after: &ResolvedPos<'_>, depth: usize) -> Result<&'a Node> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    if let Some(last) = target.last_mut()
        && let (Some(a), Some(b)) = (last.text(), child.text())
        && last.same_markup(&child)
    {
        let merged = format!("{a}{b}");
        *last = last.with_text(merged);
        return;
    }
    target.push(child);
}

fn add_range(
    start: Option<&ResolvedPos<'_>>,
    end: Option<&ResolvedPos<'_>>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let node = match (start, end) {
        (_, Some(e)) => e.node(depth),
        (Some(s), None) => s.node(depth),
        (None, None) => return,
    };
    let end_index = end.map_or(node.child_count(), |e| e.index(depth));
    let mut start_index = 0;
    if let Some(s) = start {
        start_index = s.index(depth);
        if s.depth() > depth {
            start_index += 1;
        } else if s.text_offset() > 0 {
            if let Some(after) = s.node_after() {
                add_node(after, target);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i).clone(), target);
    }
    if let Some(e) = end
        && e.depth() == depth
        && e.text_offset() > 0
        && let Some(before) = e.node_before()
    {
        add_node(before, target);
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node> {
    node.node_type().check_content(&content)?;
    Ok(node.copy(content))
}

fn replace_three_way(
    from: &ResolvedPos<'_>,
    start: &ResolvedPos<'_>,
    end: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    depth: usize,
) -> Result<Fragment> {
    let open_start = if from.depth() > depth {
        Some(joinable(from, start, depth + 1)?)
    } else {
        None
    };
    let open_end = if to.depth() > depth {
        Some(joinable(end, to, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    match (open_start, open_end) {
        (Some(os), Some(oe)) if start.index(depth) == end.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(from, start, end, to, depth + 1)?;
            add_node(close(os, inner)?, &mut content);
        }
        (os, oe) => {
            if let Some(os) = os {
                add_node(close(os, replace_two_way(from, start, depth + 1)?)?, &mut content);
            }
            add_range(Some(start), Some(end), depth, &mut content);
            if let Some(oe) = oe {
                add_node(close(oe, replace_two_way(end, to, depth + 1)?)?, &mut content);
            }
        }
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

fn replace_two_way(from: &ResolvedPos<'_>, to: &ResolvedPos<'_>, depth: usize) -> Result<Fragment> {
    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    if from.depth() > depth {
        let node = joinable(from, to, depth + 1)?;
        add_node(close(node, replace_two_way(from, to, depth + 1)?)?, &mut content);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

/// Wraps the slice content in copies of the ancestors of `along` so that
/// it can be resolved at the same depths as the replaced range.
fn prepare_slice_for_replace(slice: &Slice, along: &ResolvedPos<'_>) -> (Node, usize, usize) {
    let extra = along.depth() - slice.open_start;
    let parent = along.node(extra);
    let mut node = parent.copy(slice.content.clone());
    for i in (0..extra).rev() {
        node = along.node(i).copy(Fragment::from_node(node));
    }
    let start = slice.open_start + extra;
    let end = node.content_size().saturating_sub(slice.open_end + extra);
    (node, start, end)
}
