//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use termtree::Tree;

use crate::domain::{Document, NodeId};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print marked node (red cross, indented)
pub fn marked(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

fn node_label(document: &Document, node: NodeId, mark_tag: &str) -> String {
    let Some(entry) = document.get_node(node) else {
        return format!("{node} (gone)");
    };
    let mut label = entry.data.to_string();
    if let Some(text) = &entry.data.text {
        label.push_str(&format!(" {:?}", text));
    }
    if entry.data.tags.contains(mark_tag) {
        label.red().strikethrough().to_string()
    } else {
        label
    }
}

/// Render the document as a `termtree`, nodes carrying `mark_tag` highlighted.
pub fn tree_view(document: &Document, mark_tag: &str) -> Tree<String> {
    let Some(root) = document.root() else {
        return Tree::new("Empty tree".to_string());
    };

    fn build(document: &Document, node: NodeId, mark_tag: &str, parent: &mut Tree<String>) {
        if let Some(entry) = document.get_node(node) {
            for &child in &entry.children {
                let mut child_tree = Tree::new(node_label(document, child, mark_tag));
                build(document, child, mark_tag, &mut child_tree);
                parent.push(child_tree);
            }
        }
    }

    let mut tree = Tree::new(node_label(document, root, mark_tag));
    build(document, root, mark_tag, &mut tree);
    tree
}
