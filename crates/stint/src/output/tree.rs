//! Issue hierarchy rendering for `stint issue list --tree`.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use serde::Serialize;

use super::color::{colored_status_icon, colored_type_icon, colorize_id, dimmed};
use super::OutputConfig;
use crate::domain::{Issue, IssueId};

/// An issue with its children, in position order.
#[derive(Debug, Clone, Serialize)]
pub struct IssueNode<'a> {
    /// The issue itself.
    #[serde(flatten)]
    pub issue: &'a Issue,
    /// Children of this issue.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<IssueNode<'a>>,
}

/// Arrange a project's issues into a forest.
///
/// Siblings keep their relative order from `issues`. Issues whose parent is
/// not in the list, or whose parent chain loops, are shown at the top level.
pub fn build_forest(issues: &[Issue]) -> Vec<IssueNode<'_>> {
    let known: HashSet<&IssueId> = issues.iter().map(|i| &i.id).collect();
    let mut by_parent: HashMap<&IssueId, Vec<&Issue>> = HashMap::new();
    let mut tops = Vec::new();
    for issue in issues {
        match &issue.parent_id {
            Some(parent) if known.contains(parent) => {
                by_parent.entry(parent).or_default().push(issue);
            }
            _ => tops.push(issue),
        }
    }

    let mut seen = HashSet::new();
    let mut forest: Vec<_> = tops
        .into_iter()
        .filter_map(|issue| node(issue, &by_parent, &mut seen))
        .collect();
    // Parent chains that loop never reach the top level.
    for issue in issues {
        if !seen.contains(&issue.id) {
            forest.extend(node(issue, &by_parent, &mut seen));
        }
    }
    forest
}

fn node<'a>(
    issue: &'a Issue,
    by_parent: &HashMap<&IssueId, Vec<&'a Issue>>,
    seen: &mut HashSet<&'a IssueId>,
) -> Option<IssueNode<'a>> {
    if !seen.insert(&issue.id) {
        return None;
    }
    let children = by_parent
        .get(&issue.id)
        .map(|kids| {
            kids.iter()
                .filter_map(|&kid| node(kid, by_parent, seen))
                .collect()
        })
        .unwrap_or_default();
    Some(IssueNode { issue, children })
}

/// Render a forest with ASCII/Unicode connectors.
///
/// ```text
/// ◇ 1b0e… #0 ○ Ship the release
/// ├── · 77a2… #0 ✓ Tag the build
/// └── · 0c9d… #1 ○ Write notes
/// ◆ 5e31… #1 ▶ Migrate storage
/// ```
pub fn write_forest<W: Write>(
    w: &mut W,
    forest: &[IssueNode<'_>],
    config: &OutputConfig,
) -> io::Result<()> {
    for root in forest {
        writeln!(w, "{}", node_line(root.issue, config))?;
        write_children(w, &root.children, &[], config)?;
    }
    Ok(())
}

fn node_line(issue: &Issue, config: &OutputConfig) -> String {
    format!(
        "{} {} {} {} {}",
        colored_type_icon(issue.issue_type, config),
        colorize_id(issue.id.as_str(), config),
        dimmed(&format!("#{}", issue.order), config),
        colored_status_icon(issue.status, config),
        issue.title
    )
}

/// `prefix_segments` tracks which ancestor levels still have siblings below,
/// used to draw the vertical continuation lines.
fn write_children<W: Write>(
    w: &mut W,
    children: &[IssueNode<'_>],
    prefix_segments: &[bool],
    config: &OutputConfig,
) -> io::Result<()> {
    let (branch, corner, pipe, space) = if config.use_ascii {
        ("|-- ", "`-- ", "|   ", "    ")
    } else {
        ("├── ", "└── ", "│   ", "    ")
    };

    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();

        let mut prefix = String::new();
        for &has_more in prefix_segments {
            prefix.push_str(&dimmed(if has_more { pipe } else { space }, config));
        }
        let connector = dimmed(if is_last { corner } else { branch }, config);

        writeln!(w, "{prefix}{connector}{}", node_line(child.issue, config))?;

        if !child.children.is_empty() {
            let mut next_segments = prefix_segments.to_vec();
            next_segments.push(!is_last);
            write_children(w, &child.children, &next_segments, config)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::issue;

    fn render(issues: &[Issue], use_ascii: bool) -> String {
        let forest = build_forest(issues);
        let mut out = Vec::new();
        write_forest(&mut out, &forest, &OutputConfig::new(use_ascii, false)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn children_hang_under_their_parent_in_order() {
        let issues = [
            issue("a", "p1", None, 0),
            issue("b", "p1", None, 1),
            issue("a1", "p1", Some("a"), 0),
            issue("a2", "p1", Some("a"), 1),
        ];

        let text = render(&issues, true);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("- a #0"));
        assert!(lines[1].starts_with("|-- _ a1 #0"));
        assert!(lines[2].starts_with("`-- _ a2 #1"));
        assert!(lines[3].starts_with("- b #1"));
    }

    #[test]
    fn nested_levels_draw_continuation_lines() {
        let issues = [
            issue("a", "p1", None, 0),
            issue("a1", "p1", Some("a"), 0),
            issue("a2", "p1", Some("a"), 1),
            issue("a1x", "p1", Some("a1"), 0),
        ];

        let text = render(&issues, false);
        assert!(text.contains("│   └── · a1x"));
    }

    #[test]
    fn orphans_and_cycles_are_still_shown_once() {
        let issues = [
            issue("x", "p1", Some("y"), 0),
            issue("y", "p1", Some("x"), 0),
            issue("lost", "p1", Some("gone"), 0),
        ];

        let forest = build_forest(&issues);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].issue.id.as_str(), "lost");
        assert_eq!(forest[1].issue.id.as_str(), "x");
        assert_eq!(forest[1].children[0].issue.id.as_str(), "y");
        assert!(forest[1].children[0].children.is_empty());
    }

    #[test]
    fn json_nests_children() {
        let issues = [issue("a", "p1", None, 0), issue("a1", "p1", Some("a"), 0)];
        let forest = build_forest(&issues);

        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(json[0]["id"], "a");
        assert_eq!(json[0]["children"][0]["id"], "a1");
        assert!(json[0]["children"][0].get("children").is_none());
    }
}
